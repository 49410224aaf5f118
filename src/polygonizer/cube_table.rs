// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Polygon table for all 256 corner sign configurations of a cube
//!
//! Corner `c` has lattice offset `(c >> 2 & 1, c >> 1 & 1, c & 1)`. Each entry
//! lists the polygons of one configuration as loops of edge indices, found by
//! walking clockwise around the faces between sign-changing edges.

use std::sync::OnceLock;

// Faces
pub(crate) const LEFT: usize = 0;
pub(crate) const RIGHT: usize = 1;
pub(crate) const BOTTOM: usize = 2;
pub(crate) const TOP: usize = 3;
pub(crate) const NEAR: usize = 4;
pub(crate) const FAR: usize = 5;

// Edges, named by the two faces they lie on
const LB: usize = 0;
const LT: usize = 1;
const LN: usize = 2;
const LF: usize = 3;
const RB: usize = 4;
const RT: usize = 5;
const RN: usize = 6;
const RF: usize = 7;
const BN: usize = 8;
const BF: usize = 9;
const TN: usize = 10;
const TF: usize = 11;

/// Corner endpoints of each edge
pub(crate) const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [0, 2],
    [1, 3],
    [4, 5],
    [6, 7],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

const LEFT_FACE: [usize; 12] = [
    BOTTOM, LEFT, LEFT, FAR, RIGHT, TOP, NEAR, RIGHT, NEAR, BOTTOM, TOP, FAR,
];

const RIGHT_FACE: [usize; 12] = [
    LEFT, TOP, NEAR, LEFT, BOTTOM, RIGHT, RIGHT, FAR, BOTTOM, FAR, NEAR, TOP,
];

/// Corners of each face, and the lattice step to the neighbour across it
pub(crate) const FACES: [([usize; 4], [i32; 3]); 6] = [
    ([0, 1, 2, 3], [-1, 0, 0]),
    ([4, 5, 6, 7], [1, 0, 0]),
    ([0, 1, 4, 5], [0, -1, 0]),
    ([2, 3, 6, 7], [0, 1, 0]),
    ([0, 2, 4, 6], [0, 0, -1]),
    ([1, 3, 5, 7], [0, 0, 1]),
];

/// Polygons of one sign configuration
pub(crate) type Polygons = Vec<Vec<usize>>;

/// Table indexed by the bitmask of positive corners
pub(crate) fn cube_table() -> &'static [Polygons; 256] {
    static TABLE: OnceLock<[Polygons; 256]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(polygons_for))
}

/// Corner lattice offset
pub(crate) fn corner_offset(corner: usize) -> [i32; 3] {
    [
        (corner >> 2 & 1) as i32,
        (corner >> 1 & 1) as i32,
        (corner & 1) as i32,
    ]
}

fn next_clockwise_edge(edge: usize, face: usize) -> usize {
    match edge {
        LB => if face == LEFT { LF } else { BN },
        LT => if face == LEFT { LN } else { TF },
        LN => if face == LEFT { LB } else { TN },
        LF => if face == LEFT { LT } else { BF },
        RB => if face == RIGHT { RN } else { BF },
        RT => if face == RIGHT { RF } else { TN },
        RN => if face == RIGHT { RT } else { BN },
        RF => if face == RIGHT { RB } else { TF },
        BN => if face == BOTTOM { RB } else { LN },
        BF => if face == BOTTOM { LB } else { RF },
        TN => if face == TOP { LT } else { RN },
        _ => if face == TOP { RT } else { LF },
    }
}

fn other_face(edge: usize, face: usize) -> usize {
    if face == LEFT_FACE[edge] {
        RIGHT_FACE[edge]
    } else {
        LEFT_FACE[edge]
    }
}

fn polygons_for(config: usize) -> Polygons {
    let positive: [bool; 8] = std::array::from_fn(|c| config >> c & 1 == 1);
    let crosses = |e: usize| {
        let [a, b] = EDGE_CORNERS[e];
        positive[a] != positive[b]
    };

    let mut done = [false; 12];
    let mut polygons = Vec::new();
    for start in 0..12 {
        if done[start] || !crosses(start) {
            continue;
        }

        let mut polygon = Vec::new();
        let mut edge = start;
        let mut face = if positive[EDGE_CORNERS[start][0]] {
            RIGHT_FACE[start]
        } else {
            LEFT_FACE[start]
        };
        // A face holds four edges, so a loop closes within 4 steps per edge
        for _ in 0..48 {
            edge = next_clockwise_edge(edge, face);
            done[edge] = true;
            if crosses(edge) {
                polygon.insert(0, edge);
                if edge == start {
                    break;
                }
                face = other_face(edge, face);
            }
        }
        polygons.push(polygon);
    }
    polygons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_configurations_are_empty() {
        let table = cube_table();
        assert!(table[0].is_empty());
        assert!(table[255].is_empty());
    }

    #[test]
    fn test_single_corner_is_a_triangle() {
        let table = cube_table();
        for corner in 0..8 {
            let polygons = &table[1 << corner];
            assert_eq!(polygons.len(), 1);
            let mut edges = polygons[0].clone();
            edges.sort_unstable();
            let mut expected: Vec<usize> = (0..12)
                .filter(|&e| EDGE_CORNERS[e].contains(&corner))
                .collect();
            expected.sort_unstable();
            assert_eq!(edges, expected);
        }
    }

    #[test]
    fn test_every_crossing_edge_used_once() {
        let table = cube_table();
        for (config, polygons) in table.iter().enumerate() {
            let mut used = [0usize; 12];
            for polygon in polygons {
                assert!(polygon.len() >= 3, "config {config}: {polygon:?}");
                for &e in polygon {
                    used[e] += 1;
                }
            }
            for (e, &count) in used.iter().enumerate() {
                let [a, b] = EDGE_CORNERS[e];
                let crosses = (config >> a & 1) != (config >> b & 1);
                assert_eq!(count, usize::from(crosses), "config {config} edge {e}");
            }
        }
    }

    #[test]
    fn test_complement_has_same_edges() {
        let table = cube_table();
        for config in 0..256 {
            let count = |c: usize| table[c].iter().map(Vec::len).sum::<usize>();
            assert_eq!(count(config), count(255 - config));
        }
    }

    #[test]
    fn test_face_tables_agree_with_edges() {
        for (face, (corners, step)) in FACES.iter().enumerate() {
            let axis = face / 2;
            let value = (face % 2) as i32;
            for &c in corners {
                assert_eq!(corner_offset(c)[axis], value);
            }
            assert_eq!(step[axis], if value == 0 { -1 } else { 1 });
        }
    }
}
