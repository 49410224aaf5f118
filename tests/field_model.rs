// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end checks of field queries

use approx::assert_relative_eq;
use metaform::{FieldConfig, FieldModel, PolynomialField, SurfaceSearch};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn ball(x: f64, y: f64, z: f64, r: f64) -> PolynomialField {
    PolynomialField::new(Point3::new(x, y, z), r).unwrap()
}

fn random_model(rng: &mut StdRng, n: usize, side: f64) -> FieldModel {
    let balls = (0..n)
        .map(|_| {
            ball(
                rng.gen_range(0.0..side),
                rng.gen_range(0.0..side),
                rng.gen_range(0.0..side),
                rng.gen_range(0.5..1.5),
            )
        })
        .collect();
    FieldModel::from_balls(balls, FieldConfig::default()).unwrap()
}

#[test]
fn test_single_ball_scenario() {
    let model = FieldModel::from_balls(vec![ball(0.0, 0.0, 0.0, 1.0)], FieldConfig::default())
        .unwrap();
    let k = model.effective_radius_ratio();
    assert_relative_eq!(k, 0.5_f64.sqrt(), epsilon = 1e-9);

    let hit = model
        .ray_intersection(&Point3::new(5.0, 0.0, 0.0), &Vector3::new(-1.0, 0.0, 0.0), 1e-9)
        .unwrap()
        .expect("ray toward the ball must hit");
    assert_relative_eq!(hit.x, k, epsilon = 1e-9);
    assert_relative_eq!(hit.y, 0.0);
    assert_relative_eq!(hit.z, 0.0);
}

#[test]
fn test_connectivity_scenario() {
    let near = FieldModel::from_balls(
        vec![ball(0.0, 0.0, 0.0, 1.0), ball(1.5, 0.0, 0.0, 1.0)],
        FieldConfig::default(),
    )
    .unwrap();
    assert!(near.connected_pair(0, 1).unwrap());
    assert_eq!(near.islands().len(), 1);

    let far = FieldModel::from_balls(
        vec![ball(0.0, 0.0, 0.0, 1.0), ball(3.0, 0.0, 0.0, 1.0)],
        FieldConfig::default(),
    )
    .unwrap();
    assert!(!far.connected_pair(0, 1).unwrap());
    assert_eq!(far.islands().len(), 2);
}

#[test]
fn test_ray_hits_are_on_the_surface() {
    let mut rng = StdRng::seed_from_u64(21);
    let model = random_model(&mut rng, 40, 6.0);
    let tol = 1e-7;
    let center = Point3::new(3.0, 3.0, 3.0);

    let mut hits = 0;
    for _ in 0..300 {
        let dir = Vector3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if dir.norm() < 1e-3 {
            continue;
        }
        let origin = center - dir.normalize() * 10.0;
        if let Some(hit) = model.ray_intersection(&origin, &dir, tol).unwrap() {
            hits += 1;
            assert!(model.eval(&hit).abs() < tol, "residual {}", model.eval(&hit));
            // Everything before the hit is outside
            let before = hit - dir.normalize() * 1e-3;
            assert!(model.eval(&before) < 1e-6);
        }
    }
    assert!(hits > 100, "only {hits} hits");
}

#[test]
fn test_ray_hit_is_first_crossing() {
    let mut rng = StdRng::seed_from_u64(22);
    let model = random_model(&mut rng, 25, 5.0);

    for _ in 0..100 {
        let origin = Point3::new(-4.0, rng.gen_range(0.0..5.0), rng.gen_range(0.0..5.0));
        let dir = Vector3::new(1.0, rng.gen_range(-0.2..0.2), rng.gen_range(-0.2..0.2));
        let unit = dir.normalize();
        let hit = model.ray_intersection(&origin, &dir, 1e-8).unwrap();
        let limit = hit.map_or(20.0, |h| (h - origin).norm());

        // Sampling up to the hit never finds the inside
        let steps = 2000;
        for i in 0..steps {
            let t = limit * i as f64 / steps as f64;
            if t > limit - 1e-4 {
                break;
            }
            assert!(model.eval(&(origin + unit * t)) <= 1e-9, "inside before hit at {t}");
        }
    }
}

/// Transitive closure of the pairwise relation by repeated relaxation
fn brute_force_closure(model: &FieldModel, seed: usize) -> Vec<bool> {
    let n = model.len();
    let mut marked = vec![false; n];
    marked[seed] = true;
    let mut changed = true;
    while changed {
        changed = false;
        for a in 0..n {
            if !marked[a] {
                continue;
            }
            for b in 0..n {
                if !marked[b] && model.connected_pair(a, b).unwrap() {
                    marked[b] = true;
                    changed = true;
                }
            }
        }
    }
    marked
}

#[test]
fn test_flood_fill_equals_transitive_closure() {
    let mut rng = StdRng::seed_from_u64(23);
    for round in 0..10 {
        let model = random_model(&mut rng, 30, 8.0);
        let seed = rng.gen_range(0..model.len());
        assert_eq!(
            model.flood_fill(seed, &[]).unwrap(),
            brute_force_closure(&model, seed),
            "round {round}"
        );
    }
}

#[test]
fn test_islands_partition_primitives() {
    let mut rng = StdRng::seed_from_u64(24);
    let model = random_model(&mut rng, 50, 10.0);
    let islands = model.islands();

    let mut seen: Vec<usize> = islands.iter().flatten().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..model.len()).collect::<Vec<_>>());

    for island in &islands {
        let marked = model.flood_fill(island[0], &[]).unwrap();
        for (i, &m) in marked.iter().enumerate() {
            assert_eq!(m, island.contains(&i));
        }
    }
}

#[test]
fn test_optimize_then_rebuild() {
    let mut rng = StdRng::seed_from_u64(25);
    let mut model = random_model(&mut rng, 40, 10.0);
    let expected = model.flood_fill(0, &[]).unwrap().iter().filter(|&&m| m).count();

    model.optimize_connection(0).unwrap();
    assert_eq!(model.len(), expected);
    assert!(model.is_stale());
    model.rebuild();
    assert_eq!(model.islands().len(), 1);
}

#[test]
fn test_rebuild_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(26);
    let mut model = random_model(&mut rng, 64, 8.0);
    let before = model.index().clone();
    let probe = Point3::new(4.0, 4.0, 4.0);
    let value = model.eval(&probe);

    model.rebuild();
    assert_eq!(model.index(), &before);
    assert_eq!(model.eval(&probe), value);
}

#[test]
fn test_closest_point_heuristics_land_on_the_blob() {
    let model = FieldModel::from_balls(
        vec![ball(0.0, 0.0, 0.0, 1.0), ball(0.8, 0.0, 0.0, 1.0)],
        FieldConfig::default(),
    )
    .unwrap();
    let p = Point3::new(0.4, 2.0, 0.0);

    for search in [
        model.find_closest_surface_point(&p).unwrap(),
        model.find_closest_surface_point_v2(&p).unwrap(),
    ] {
        let SurfaceSearch::Found { point, distance, .. } = search else {
            panic!("no surface found: {search:?}");
        };
        assert!(model.eval(&point).abs() < 1e-6);
        assert_relative_eq!(distance, (point - p).norm(), epsilon = 1e-12);
        // The top of the blob lies about 1.28 below p
        assert!(distance > 1.2 && distance < 1.45, "distance {distance}");
    }
}
