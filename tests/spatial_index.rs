// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Spatial index queries against brute force

use metaform::{BoundingBox, Bvh, SpatialIndex};
use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_point(rng: &mut StdRng, extent: f64) -> Point3<f64> {
    Point3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

fn random_spheres(rng: &mut StdRng, n: usize) -> Vec<(Point3<f64>, f64)> {
    (0..n)
        .map(|_| (random_point(rng, 10.0), rng.gen_range(0.1..2.0)))
        .collect()
}

fn sphere_box(s: &(Point3<f64>, f64)) -> BoundingBox {
    BoundingBox::from_sphere(&s.0, s.1)
}

#[test]
fn test_point_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(11);
    for n in [0, 1, 2, 3, 17, 200] {
        let spheres = random_spheres(&mut rng, n);
        let tree = SpatialIndex::build(spheres.clone(), sphere_box);
        assert_eq!(tree.len(), n);

        for _ in 0..50 {
            let p = random_point(&mut rng, 11.0);
            let inside = |s: &(Point3<f64>, f64)| (p - s.0).norm() < s.1;

            let mut found: Vec<_> = tree
                .find_all_if(|v| v.contains_point(&p), |s| inside(s))
                .map(|s| (s.0.x, s.0.y, s.0.z))
                .collect();
            let mut expected: Vec<_> = spheres
                .iter()
                .filter(|s| inside(s))
                .map(|s| (s.0.x, s.0.y, s.0.z))
                .collect();
            found.sort_by(|a, b| a.partial_cmp(b).unwrap());
            expected.sort_by(|a, b| a.partial_cmp(b).unwrap());
            assert_eq!(found, expected, "n = {n}, p = {p:?}");
        }
    }
}

#[test]
fn test_box_queries_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(12);
    let spheres = random_spheres(&mut rng, 300);
    let tree = SpatialIndex::build(spheres.clone(), sphere_box);

    for _ in 0..100 {
        let a = random_point(&mut rng, 12.0);
        let b = a + Vector3::new(
            rng.gen_range(0.0..6.0),
            rng.gen_range(0.0..6.0),
            rng.gen_range(0.0..6.0),
        );
        let query = BoundingBox::new(a, b);

        let found = tree
            .find_all_if(|v| v.intersects(&query), |s| sphere_box(s).intersects(&query))
            .count();
        let expected = spheres
            .iter()
            .filter(|s| sphere_box(s).intersects(&query))
            .count();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_ray_queries_never_miss() {
    let mut rng = StdRng::seed_from_u64(13);
    let spheres = random_spheres(&mut rng, 150);
    let tree = SpatialIndex::build(spheres.clone(), sphere_box);

    for _ in 0..100 {
        let origin = random_point(&mut rng, 15.0);
        let dir = random_point(&mut rng, 1.0).coords;
        if dir.norm() < 1e-3 {
            continue;
        }
        let hits_box = |s: &(Point3<f64>, f64)| sphere_box(s).intersects_ray(&origin, &dir);

        let found = tree
            .find_all_if(|v| v.intersects_ray(&origin, &dir), |s| hits_box(s))
            .count();
        let expected = spheres.iter().filter(|s| hits_box(s)).count();
        assert_eq!(found, expected);
    }
}

#[test]
fn test_structure_invariants() {
    let mut rng = StdRng::seed_from_u64(14);
    for n in 1..64 {
        let spheres = random_spheres(&mut rng, n);
        let tree = SpatialIndex::build(spheres, sphere_box);
        assert_eq!(tree.node_count(), 2 * n - 1);
        assert_eq!(tree.root_index(), Some(2 * n - 2));

        let log2 = usize::BITS - (n - 1).leading_zeros();
        assert!(tree.depth() <= log2 as usize + 1, "n = {n}, depth {}", tree.depth());

        // Every object reachable exactly once
        assert_eq!(tree.find_all_if(|_| true, |_| true).count(), n);
        for i in 0..n {
            assert!(tree.is_object(i));
            let s = tree.object(i);
            assert_eq!(*tree.volume(i), sphere_box(s));
        }
    }
}
