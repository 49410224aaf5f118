// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Randomized property checks for Bernstein polynomials

use approx::assert_relative_eq;
use metaform::{BezierClipping, LineProfile};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_curve(rng: &mut StdRng) -> LineProfile {
    LineProfile::new(std::array::from_fn(|_| rng.gen_range(-2.0..2.0)))
}

#[test]
fn test_endpoints_match_control_values() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..200 {
        let curve = random_curve(&mut rng);
        let control = curve.control();
        assert_eq!(curve.eval(0.0), control[0]);
        assert_eq!(curve.eval(1.0), control[6]);
    }
}

#[test]
fn test_divide_is_continuous_and_exact() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..200 {
        let curve = random_curve(&mut rng);
        let r = rng.gen_range(0.05..0.95);
        let (front, back) = curve.divide(r);

        assert_relative_eq!(front.eval(1.0), back.eval(0.0), epsilon = 1e-12);
        assert_relative_eq!(front.eval(1.0), curve.eval(r), epsilon = 1e-12);

        let u: f64 = rng.gen_range(0.0..1.0);
        assert_relative_eq!(front.eval(u), curve.eval(u * r), epsilon = 1e-10);
        assert_relative_eq!(back.eval(u), curve.eval(r + u * (1.0 - r)), epsilon = 1e-10);
    }
}

#[test]
fn test_compound_is_linear() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..200 {
        let a = random_curve(&mut rng);
        let b = random_curve(&mut rng);
        let sum = a.compound(&b);
        let t = rng.gen_range(0.0..1.0);
        assert_relative_eq!(sum.eval(t), a.eval(t) + b.eval(t), epsilon = 1e-12);
        assert_eq!(sum, a + b);
    }
}

#[test]
fn test_first_root_is_a_root_and_first() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut solved = 0;
    for _ in 0..300 {
        let curve = random_curve(&mut rng);
        let Some(root) = curve.solve_first_root(0.0, 1e-12) else {
            continue;
        };
        solved += 1;
        assert!((0.0..=1.0).contains(&root));
        assert!(curve.eval(root).abs() < 1e-6, "residual {}", curve.eval(root));

        // No sign change strictly before the root on a fine sampling
        let start = curve.eval(0.0);
        let steps = 400;
        for i in 0..steps {
            let t = root * i as f64 / steps as f64;
            let v = curve.eval(t);
            if start.abs() > 1e-6 && v.abs() > 1e-6 && t < root - 1e-6 {
                assert_eq!(v > 0.0, start > 0.0, "earlier crossing near {t} (root {root})");
            }
        }
    }
    assert!(solved > 50);
}

#[test]
fn test_positive_curve_has_no_root() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let control: [f64; 5] = std::array::from_fn(|_| rng.gen_range(0.1..2.0));
        let curve = BezierClipping::new(control);
        assert_eq!(curve.solve_first_root(0.0, 1e-12), None);
        assert!(!curve.if_have_root(0.0, 1e-12));
        assert!(curve.min_value(1e-9) > 0.0);
    }
}

#[test]
fn test_min_value_bounds_samples() {
    let mut rng = StdRng::seed_from_u64(6);
    for _ in 0..100 {
        let curve = random_curve(&mut rng);
        let min = curve.min_value(1e-9);
        let sampled = (0..=1000)
            .map(|i| curve.eval(i as f64 / 1000.0))
            .fold(f64::INFINITY, f64::min);
        assert!(min <= sampled + 1e-9);
        assert!(min >= sampled - 1e-3, "min {min}, sampled {sampled}");
    }
}
