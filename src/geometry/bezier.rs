// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! One-dimensional Bernstein polynomials with Bezier-clipping root isolation
//!
//! A `BezierClipping<N>` holds `N` control values, i.e. a polynomial of degree
//! `N - 1` over the parameter domain `[0, 1]`. Control values double as a
//! convex hull for the graph `(t, p(t))`, which is what the root isolation
//! clips against.

use std::ops::Add;

/// Clip iterations allowed on one piece before it is force-bisected
pub const MAX_CLIP_ITERATIONS: usize = 32;

/// Bisection depth after which a piece is resolved by interpolation
pub const MAX_SUBDIVISION_DEPTH: usize = 60;

/// Degree-6 profile of a primitive restricted to a line
pub type LineProfile = BezierClipping<7>;

/// Polynomial in Bernstein form with `N` control values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierClipping<const N: usize> {
    control: [f64; N],
}

impl<const N: usize> BezierClipping<N> {
    pub fn new(control: [f64; N]) -> Self {
        Self { control }
    }

    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    pub fn constant(value: f64) -> Self {
        Self {
            control: [value; N],
        }
    }

    /// Convert power-basis coefficients `a_0 + a_1 t + ...` to Bernstein form
    pub fn from_monomial(coeffs: [f64; N]) -> Self {
        let n = N.saturating_sub(1);
        let mut control = [0.0; N];
        for (i, c) in control.iter_mut().enumerate() {
            *c = (0..=i)
                .map(|j| binomial(i, j) / binomial(n, j) * coeffs[j])
                .sum();
        }
        Self { control }
    }

    pub fn control(&self) -> &[f64; N] {
        &self.control
    }

    pub fn degree(&self) -> usize {
        N.saturating_sub(1)
    }

    pub fn min_control(&self) -> f64 {
        self.control.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max_control(&self) -> f64 {
        self.control.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// De Casteljau evaluation
    pub fn eval(&self, t: f64) -> f64 {
        de_casteljau(self.control, N, t)
    }

    /// Derivative with respect to `t`
    pub fn tangent(&self, t: f64) -> f64 {
        if N < 2 {
            return 0.0;
        }
        let n = N - 1;
        let mut hodograph = [0.0; N];
        for i in 0..n {
            hodograph[i] = self.control[i + 1] - self.control[i];
        }
        n as f64 * de_casteljau(hodograph, n, t)
    }

    /// Split at `r` into the pieces over `[0, r]` and `[r, 1]`, each
    /// reparameterized to `[0, 1]`
    pub fn divide(&self, r: f64) -> (Self, Self) {
        let mut work = self.control;
        let mut front = [0.0; N];
        let mut back = [0.0; N];
        if N == 0 {
            return (Self::new(front), Self::new(back));
        }

        front[0] = work[0];
        back[N - 1] = work[N - 1];
        for level in 1..N {
            for i in 0..N - level {
                work[i] = work[i] * (1.0 - r) + work[i + 1] * r;
            }
            front[level] = work[0];
            back[N - 1 - level] = work[N - 1 - level];
        }

        (Self::new(front), Self::new(back))
    }

    /// Discard `[0, r)`, keeping the piece over `[r, 1]`
    pub fn crop_front(&self, r: f64) -> Self {
        self.divide(r).1
    }

    /// Discard `(r, 1]`, keeping the piece over `[0, r]`
    pub fn crop_back(&self, r: f64) -> Self {
        self.divide(r).0
    }

    /// Piece over `[s, t]` reparameterized to `[0, 1]`
    pub fn crop(&self, s: f64, t: f64) -> Self {
        if t <= s {
            return Self::constant(self.eval(s));
        }
        if s <= 0.0 {
            return self.crop_back(t);
        }
        if s >= 1.0 {
            return Self::constant(self.eval(1.0));
        }
        self.crop_front(s).crop_back((t - s) / (1.0 - s))
    }

    /// Pointwise sum of two polynomials of the same degree
    pub fn compound(&self, other: &Self) -> Self {
        let mut control = self.control;
        for (c, o) in control.iter_mut().zip(other.control.iter()) {
            *c += o;
        }
        Self { control }
    }

    /// Add a constant to the polynomial
    pub fn offset(&self, delta: f64) -> Self {
        Self {
            control: self.control.map(|c| c + delta),
        }
    }

    /// Sign changes along the control polygon, ignoring exact zeros
    pub fn sign_changes(&self) -> usize {
        let mut changes = 0;
        let mut last = 0.0;
        for &c in &self.control {
            if c == 0.0 {
                continue;
            }
            if last != 0.0 && (c > 0.0) != (last > 0.0) {
                changes += 1;
            }
            last = c;
        }
        changes
    }

    /// Parameter interval where the control polygon's convex hull meets the
    /// t-axis. Every root of the polynomial lies inside it.
    pub fn convex_hull_intersection(&self) -> Option<(f64, f64)> {
        if N == 0 {
            return None;
        }
        let n = (N - 1).max(1) as f64;
        let x = |i: usize| i as f64 / n;

        let mut tmin = f64::INFINITY;
        let mut tmax = f64::NEG_INFINITY;
        for i in 0..N {
            let bi = self.control[i];
            if bi == 0.0 {
                tmin = tmin.min(x(i));
                tmax = tmax.max(x(i));
                continue;
            }
            for j in i + 1..N {
                let bj = self.control[j];
                if bi * bj < 0.0 {
                    let crossing = x(i) + (x(j) - x(i)) * bi / (bi - bj);
                    tmin = tmin.min(crossing);
                    tmax = tmax.max(crossing);
                }
            }
        }

        if tmin > tmax {
            None
        } else {
            Some((tmin.clamp(0.0, 1.0), tmax.clamp(0.0, 1.0)))
        }
    }

    /// Smallest `t` in `[0, 1]` with `p(t) = target`, resolved to a parameter
    /// width of `tol`
    pub fn solve_first_root(&self, target: f64, tol: f64) -> Option<f64> {
        let tol = tol.max(f64::EPSILON);
        let mut pieces = vec![Piece::root(self.offset(-target))];

        while let Some(mut piece) = pieces.pop() {
            let mut clips = 0;
            loop {
                let first = piece.curve.control[0];
                let last = piece.curve.control[N - 1];
                if first == 0.0 {
                    return Some(piece.lo);
                }
                let changes = piece.curve.sign_changes();
                if changes == 0 {
                    if last == 0.0 {
                        return Some(piece.hi);
                    }
                    break;
                }
                if piece.width() <= tol {
                    match piece.settle(changes) {
                        Some(root) => return Some(root),
                        None => break,
                    }
                }
                let Some((tmin, tmax)) = piece.curve.convex_hull_intersection() else {
                    break;
                };
                if (tmax - tmin) * piece.width() <= tol {
                    let centre = 0.5 * (tmin + tmax);
                    if changes % 2 == 1 || piece.curve.eval(centre) * first <= 0.0 {
                        return Some(piece.lo + piece.width() * centre);
                    }
                    break;
                }

                if changes > 1 || tmax - tmin > 0.5 || clips >= MAX_CLIP_ITERATIONS {
                    if piece.depth >= MAX_SUBDIVISION_DEPTH {
                        match piece.settle(changes) {
                            Some(root) => return Some(root),
                            None => break,
                        }
                    }
                    let (front, back) = piece.bisect();
                    pieces.push(back);
                    pieces.push(front);
                    break;
                }

                piece = piece.clip(tmin, tmax);
                clips += 1;
            }
        }

        None
    }

    /// Whether `p(t) = target` somewhere in `[0, 1]`. Agrees with
    /// [`solve_first_root`](Self::solve_first_root), touching roots included.
    pub fn if_have_root(&self, target: f64, tol: f64) -> bool {
        let first = self.control[0] - target;
        let last = self.control[N - 1] - target;
        if first == 0.0 || last == 0.0 || first * last < 0.0 {
            return true;
        }
        self.solve_first_root(target, tol).is_some()
    }

    /// Minimum of `p` over `[0, 1]`, to within `tol`, by branch and bound on
    /// the control-value lower bound
    pub fn min_value(&self, tol: f64) -> f64 {
        let tol = tol.max(f64::EPSILON);
        let mut best = self.control[0].min(self.control[N - 1]);
        let mut pieces = vec![(*self, 0usize)];

        while let Some((curve, depth)) = pieces.pop() {
            if curve.min_control() >= best - tol {
                continue;
            }
            best = best.min(curve.eval(0.5));
            if depth < MAX_SUBDIVISION_DEPTH {
                let (front, back) = curve.divide(0.5);
                pieces.push((back, depth + 1));
                pieces.push((front, depth + 1));
            }
        }

        best
    }
}

impl<const N: usize> Add for BezierClipping<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.compound(&rhs)
    }
}

/// Piece of the parameter domain under investigation
#[derive(Clone, Copy)]
struct Piece<const N: usize> {
    curve: BezierClipping<N>,
    lo: f64,
    hi: f64,
    depth: usize,
}

impl<const N: usize> Piece<N> {
    fn root(curve: BezierClipping<N>) -> Self {
        Self {
            curve,
            lo: 0.0,
            hi: 1.0,
            depth: 0,
        }
    }

    fn width(&self) -> f64 {
        self.hi - self.lo
    }

    fn clip(&self, tmin: f64, tmax: f64) -> Self {
        let w = self.width();
        Self {
            curve: self.curve.crop(tmin, tmax),
            lo: self.lo + w * tmin,
            hi: self.lo + w * tmax,
            depth: self.depth,
        }
    }

    fn bisect(&self) -> (Self, Self) {
        let mid = self.lo + self.width() * 0.5;
        let (front, back) = self.curve.divide(0.5);
        (
            Self {
                curve: front,
                lo: self.lo,
                hi: mid,
                depth: self.depth + 1,
            },
            Self {
                curve: back,
                lo: mid,
                hi: self.hi,
                depth: self.depth + 1,
            },
        )
    }

    /// Resolve a piece that can no longer be refined. An odd number of sign
    /// changes guarantees a crossing; otherwise the midpoint has to confirm one.
    fn settle(&self, changes: usize) -> Option<f64> {
        if changes % 2 == 1 {
            return Some(self.interpolate());
        }
        let first = self.curve.control[0];
        if self.curve.eval(0.5) * first <= 0.0 {
            Some(self.lo + self.width() * 0.5)
        } else {
            None
        }
    }

    /// Secant through the end values
    fn interpolate(&self) -> f64 {
        let a = self.curve.control[0];
        let b = self.curve.control[N - 1];
        if a == b || a * b > 0.0 {
            return self.lo + self.width() * 0.5;
        }
        let s = (a / (a - b)).clamp(0.0, 1.0);
        self.lo + self.width() * s
    }
}

fn de_casteljau<const N: usize>(mut work: [f64; N], len: usize, t: f64) -> f64 {
    if len == 0 {
        return 0.0;
    }
    for level in 1..len {
        for i in 0..len - level {
            work[i] = work[i] * (1.0 - t) + work[i + 1] * t;
        }
    }
    work[0]
}

fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}
