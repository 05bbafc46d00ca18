//! Weighted kernel density estimation, mean shift and mode clustering
//!
//! Orientation voting and cell clustering both reduce to the same job:
//! given weighted votes, find the modes of the underlying density. Votes
//! live either on the real line (angles, with wrap-around) or in the image
//! plane, so the estimators are generic over the vote location.

use crate::matrix::PointF;

/// A weighted observation at some location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vote<L> {
    pub loc: L,
    pub weight: f64,
}

impl<L> Vote<L> {
    pub fn new(loc: L, weight: f64) -> Self {
        Vote { loc, weight }
    }
}

/// Vote location: the minimal vector arithmetic the estimators need.
pub trait Location: Copy {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    fn scale(self, k: f64) -> Self;
    fn norm(self) -> f64;
    fn distance(self, other: Self) -> f64 {
        self.sub(other).norm()
    }
}

impl Location for f64 {
    fn zero() -> Self {
        0.0
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn sub(self, other: Self) -> Self {
        self - other
    }
    fn scale(self, k: f64) -> Self {
        self * k
    }
    fn norm(self) -> f64 {
        self.abs()
    }
}

impl Location for PointF {
    fn zero() -> Self {
        PointF::new(0.0, 0.0)
    }
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn sub(self, other: Self) -> Self {
        self - other
    }
    fn scale(self, k: f64) -> Self {
        self * k
    }
    fn norm(self) -> f64 {
        PointF::norm(self)
    }
}

/// Evaluation kernel over vote-location differences.
pub trait Kernel<L> {
    fn value(&self, delta: L) -> f64;
}

/// Gaussian kernel on the real line with variance `var`.
pub struct GaussianKernel {
    z: f64,
    c: f64,
}

impl GaussianKernel {
    pub fn new(var: f64) -> Self {
        GaussianKernel {
            z: 1.0 / (2.0 * std::f64::consts::PI * var).sqrt(),
            c: -0.5 / var,
        }
    }
}

impl Kernel<f64> for GaussianKernel {
    fn value(&self, d: f64) -> f64 {
        (self.c * d * d).exp() / self.z
    }
}

/// Gaussian kernel over planar points. The exponent uses the Euclidean
/// norm of the offset, not its square; the heavier tail is intentional and
/// keeps distant cells contributing to the shift.
pub struct PointGaussianKernel {
    z: f64,
    c: f64,
}

impl PointGaussianKernel {
    pub fn new(var: f64) -> Self {
        PointGaussianKernel {
            z: 1.0 / (2.0 * std::f64::consts::PI * var).sqrt(),
            c: -0.5 / var,
        }
    }
}

impl Kernel<PointF> for PointGaussianKernel {
    fn value(&self, d: PointF) -> f64 {
        (self.c * d.norm()).exp() / self.z
    }
}

/// Gaussian kernel on a circle of period `2 * lim`. Offsets beyond half the
/// period are folded back, so the kernel is valid on the wrapped domain.
pub struct WrappedGaussianKernel {
    z: f64,
    c: f64,
    lim: f64,
}

impl WrappedGaussianKernel {
    /// `lim` is half the period of the circular domain.
    pub fn new(var: f64, lim: f64) -> Self {
        WrappedGaussianKernel {
            z: 1.0 / (2.0 * std::f64::consts::PI * var).sqrt(),
            c: -0.5 / var,
            lim,
        }
    }
}

impl Kernel<f64> for WrappedGaussianKernel {
    fn value(&self, d: f64) -> f64 {
        let mut d = d.abs();
        if d > self.lim {
            d = 2.0 * self.lim - d;
        }
        (self.c * d * d).exp() / self.z
    }
}

/// Weighted kernel density of `votes` evaluated at `x`.
pub fn kde<L: Location>(votes: &[Vote<L>], x: L, kernel: &impl Kernel<L>) -> f64 {
    votes
        .iter()
        .map(|v| v.weight * kernel.value(v.loc.sub(x)))
        .sum()
}

const MEAN_SHIFT_MAX_ITER: usize = 100;
const MEAN_SHIFT_MIN_MOVEMENT: f64 = 0.01;

/// Iteratively move a copy of the votes to the weight-normalized first
/// moment of the input density, until the cumulative movement per sweep
/// drops below 0.01 or 100 sweeps have run. Each output vote ends up
/// carrying the density at its final location as its weight.
pub fn mean_shift<L: Location>(input: &[Vote<L>], kernel: &impl Kernel<L>) -> Vec<Vote<L>> {
    let mut out = input.to_vec();
    if input.len() < 2 {
        return out;
    }
    for _ in 0..MEAN_SHIFT_MAX_ITER {
        let mut moved = 0.0;
        for v in &mut out {
            let density = kde(input, v.loc, kernel);
            let mut moment = L::zero();
            for p in input {
                moment = moment.add(p.loc.scale(p.weight * kernel.value(p.loc.sub(v.loc))));
            }
            let new_loc = moment.scale(1.0 / density);
            moved += v.loc.distance(new_loc);
            v.loc = new_loc;
            v.weight = density;
        }
        if moved < MEAN_SHIFT_MIN_MOVEMENT {
            break;
        }
    }
    out
}

/// Online single-pass agglomeration: each vote joins the first existing
/// center within `radius` (weighted barycenter update) or founds a new one.
/// Order-sensitive by design; feed it mean-shift output.
pub fn find_cluster_centers<L: Location>(data: &[Vote<L>], radius: f64) -> Vec<Vote<L>> {
    let mut centers: Vec<Vote<L>> = Vec::new();
    for v in data {
        match centers.iter().position(|c| c.loc.distance(v.loc) < radius) {
            Some(k) => {
                let center = &mut centers[k];
                let total = v.weight + center.weight;
                center.loc = center
                    .loc
                    .scale(center.weight / total)
                    .add(v.loc.scale(v.weight / total));
                center.weight = total;
            }
            None => centers.push(*v),
        }
    }
    centers
}

const ASCENT_TOLERANCE: f64 = 1e-4;
const ASCENT_ALPHA: f64 = 0.1;
const ASCENT_BETA: f64 = 0.5;
const ASCENT_VAR: f64 = 4.0;
const ASCENT_MAX_ITER: usize = 100;
const ASCENT_MAX_BACKTRACKS: usize = 50;

/// Mode seeking on a circular domain of the given period by gradient
/// ascent on the kernel density, with a backtracking (Armijo) line search.
/// Every vote ascends from its own location; converged locations are folded
/// into `[0, period)` and weighted by the density at the mode.
pub fn ascend_circular_modes(votes: &[Vote<f64>], period: f64) -> Vec<Vote<f64>> {
    let mut modes = votes.to_vec();
    if votes.is_empty() {
        return modes;
    }
    let kernel = GaussianKernel::new(ASCENT_VAR);
    let wrapped = WrappedGaussianKernel::new(ASCENT_VAR, 0.5 * period);
    let mut offsets: Vec<Vote<f64>> = votes.to_vec();
    for v in &mut modes {
        for _ in 0..ASCENT_MAX_ITER {
            v.weight = kde(votes, v.loc, &wrapped);
            // Density gradient from the wrapped offsets of every vote.
            for (offset, vote) in offsets.iter_mut().zip(votes) {
                let mut dist = vote.loc - v.loc;
                if dist > period / 2.0 {
                    dist -= period;
                } else if dist < -period / 2.0 {
                    dist += period;
                }
                offset.loc = dist;
                offset.weight = vote.weight * dist / ASCENT_VAR;
            }
            let grad = kde(&offsets, 0.0, &kernel);
            let mut step = grad.min(1.0);
            for _ in 0..ASCENT_MAX_BACKTRACKS {
                if kde(votes, v.loc + step, &wrapped) >= v.weight + ASCENT_ALPHA * step * grad {
                    break;
                }
                step *= ASCENT_BETA;
            }
            v.loc += step;
            if v.loc < 0.0 {
                v.loc += period;
            } else if v.loc >= period {
                v.loc -= period;
            }
            if step.abs() <= ASCENT_TOLERANCE {
                break;
            }
        }
    }
    modes
}
