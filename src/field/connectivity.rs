// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Connectivity between primitives and pruning of disconnected islands

use super::{FieldModel, PolynomialField};
use crate::error::{FieldError, Result};
use tracing::debug;

impl FieldModel {
    /// Whether primitives `a` and `b` belong to one blob along the segment
    /// joining their centers
    pub fn connected_pair(&self, a: usize, b: usize) -> Result<bool> {
        let (ball_a, ball_b) = (self.ball_at(a)?, self.ball_at(b)?);
        Ok(PolynomialField::connected(ball_a, ball_b, self.config.iso))
    }

    /// Mark every primitive reachable from `seed` through pairwise
    /// connections. Primitives flagged in `excluded` are never visited and
    /// never traversed through; a shorter mask excludes nothing beyond its
    /// length.
    ///
    /// Adjacency is recomputed on demand and only tested for primitives whose
    /// supports overlap, which the index narrows down.
    pub fn flood_fill(&self, seed: usize, excluded: &[bool]) -> Result<Vec<bool>> {
        self.ball_at(seed)?;
        let is_excluded = |i: usize| excluded.get(i).copied().unwrap_or(false);

        let mut marked = vec![false; self.balls.len()];
        if is_excluded(seed) {
            return Ok(marked);
        }

        let iso = self.config.iso;
        let mut stack = vec![seed];
        marked[seed] = true;
        while let Some(current) = stack.pop() {
            let ball = &self.balls[current];
            for neighbor in self.overlapping(&ball.bounding_box()) {
                if marked[neighbor] || is_excluded(neighbor) {
                    continue;
                }
                if PolynomialField::connected(ball, &self.balls[neighbor], iso) {
                    marked[neighbor] = true;
                    stack.push(neighbor);
                }
            }
        }
        Ok(marked)
    }

    /// Keep only the primitives connected to `seed`, returning how many were
    /// removed. The index is left stale.
    pub fn optimize_connection(&mut self, seed: usize) -> Result<usize> {
        let keep = self.flood_fill(seed, &[])?;
        let mut flags = keep.into_iter();
        let removed = self.remove_if(|_| !flags.next().unwrap_or(false));
        debug!(seed, removed, kept = self.balls.len(), "pruned disconnected primitives");
        Ok(removed)
    }

    /// Partition the primitives into connected components, each sorted, in
    /// order of their smallest member
    pub fn islands(&self) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; self.balls.len()];
        let mut islands = Vec::new();

        for seed in 0..self.balls.len() {
            if assigned[seed] {
                continue;
            }
            let Ok(marked) = self.flood_fill(seed, &assigned) else {
                continue;
            };
            let island: Vec<usize> = marked
                .iter()
                .enumerate()
                .filter_map(|(i, &m)| m.then_some(i))
                .collect();
            for &i in &island {
                assigned[i] = true;
            }
            islands.push(island);
        }

        debug!(
            primitives = self.balls.len(),
            islands = islands.len(),
            "computed connected components"
        );
        islands
    }

    fn ball_at(&self, index: usize) -> Result<&PolynomialField> {
        self.balls.get(index).ok_or_else(|| {
            FieldError::invalid(format!(
                "primitive index {index} out of range for {} primitives",
                self.balls.len()
            ))
        })
    }
}
