//! K-best minimum-energy path search over a layered graph
//!
//! The solver runs a forward dynamic program over `T` layers. Layer `t` has
//! `n_t` states with prior energies `priors[t][i]`, and moving from state
//! `i` of layer `t` to state `j` of layer `t+1` costs
//! `conditionals[t][i, j]`. Each state keeps the `K` cheapest partial paths
//! reaching it, so backtracking can produce the `K` globally cheapest
//! sequences, optionally restricted to a chosen final state.
//!
//! Tie-breaking is part of the contract: among equal-energy candidates the
//! lower source-state index wins, then the lower path slot. Callers rank
//! near-degenerate decodes by margin, which only makes sense if the
//! ordering is stable.

use crate::matrix::Matrix;
use crate::{Error, Result};
use std::cmp::Ordering;

/// One recovered path, cheapest first in [`Viterbi::solutions`].
///
/// `sequence[t]` is the chosen state index of layer `t`. When fewer than K
/// distinct paths exist, the surplus solutions carry infinite energy and a
/// sequence filled with `-1`.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub energy: f64,
    pub sequence: Vec<i32>,
}

#[derive(Debug, Clone, Copy)]
struct SubState {
    energy: f64,
    /// State index in the previous layer, -1 at the first layer.
    prev_state: i32,
    /// Path slot within the previous state.
    prev_path: i32,
}

impl SubState {
    const UNREACHED: SubState = SubState {
        energy: f64::INFINITY,
        prev_state: -1,
        prev_path: -1,
    };
}

/// K-best layered path solver. The number of paths is fixed at
/// construction; the energy tables are supplied per solve so the solver can
/// be kept as a long-lived field and fed refreshed matrices.
pub struct Viterbi {
    n_paths: usize,
    /// layers[t][state][path]
    layers: Vec<Vec<Vec<SubState>>>,
    /// Scratch for the cross product at one state.
    expansion: Vec<(f64, i32, i32)>,
    pub solutions: Vec<Solution>,
}

impl Viterbi {
    pub fn new(n_paths: usize) -> Self {
        assert!(n_paths > 0);
        Viterbi {
            n_paths,
            layers: Vec::new(),
            expansion: Vec::new(),
            solutions: vec![Solution::default(); n_paths],
        }
    }

    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Run the forward pass and backtrack. With `final_state` given, only
    /// paths ending at that state of the last layer are returned.
    pub fn solve(
        &mut self,
        priors: &[Vec<f64>],
        conditionals: &[Matrix<f64>],
        final_state: Option<usize>,
    ) -> Result<&[Solution]> {
        self.check_shapes(priors, conditionals)?;
        if let Some(f) = final_state {
            if f >= priors[priors.len() - 1].len() {
                return Err(Error::InvalidFinalState);
            }
        }
        self.run(priors, conditionals);
        self.backtrack(priors.len(), final_state);
        Ok(&self.solutions)
    }

    fn check_shapes(&self, priors: &[Vec<f64>], conditionals: &[Matrix<f64>]) -> Result<()> {
        if priors.is_empty() || conditionals.len() + 1 != priors.len() {
            return Err(Error::Inconsistent);
        }
        for (t, cond) in conditionals.iter().enumerate() {
            if cond.rows() != priors[t].len() || cond.cols() != priors[t + 1].len() {
                return Err(Error::Inconsistent);
            }
        }
        if priors.iter().any(|p| p.is_empty()) {
            return Err(Error::Inconsistent);
        }
        Ok(())
    }

    fn run(&mut self, priors: &[Vec<f64>], conditionals: &[Matrix<f64>]) {
        let k = self.n_paths;
        self.layers.resize(priors.len(), Vec::new());

        // First layer: one real path per state, surplus slots unreachable.
        let first = &mut self.layers[0];
        first.clear();
        for &prior in &priors[0] {
            let mut subs = vec![SubState::UNREACHED; k];
            subs[0] = SubState {
                energy: prior,
                prev_state: -1,
                prev_path: -1,
            };
            first.push(subs);
        }

        for t in 1..priors.len() {
            let (prev_layers, rest) = self.layers.split_at_mut(t);
            let prev = &prev_layers[t - 1];
            let cur = &mut rest[0];
            let cond = &conditionals[t - 1];
            cur.clear();
            for (n, &prior) in priors[t].iter().enumerate() {
                // Cross product of incoming sub-paths with this transition.
                self.expansion.clear();
                for (pn, subs) in prev.iter().enumerate() {
                    let step = prior + *cond.at(pn, n);
                    for (path, sub) in subs.iter().enumerate() {
                        self.expansion
                            .push((sub.energy + step, pn as i32, path as i32));
                    }
                }
                self.expansion.sort_unstable_by(rank_candidates);
                let mut subs = Vec::with_capacity(k);
                for i in 0..k {
                    subs.push(match self.expansion.get(i) {
                        Some(&(energy, pn, path)) => SubState {
                            energy,
                            prev_state: pn,
                            prev_path: path,
                        },
                        None => SubState::UNREACHED,
                    });
                }
                cur.push(subs);
            }
        }
    }

    fn backtrack(&mut self, n_layers: usize, final_state: Option<usize>) {
        let last = &self.layers[n_layers - 1];
        // Rank the terminal sub-states eligible for backtracking.
        let mut terminals: Vec<(f64, i32, i32)> = Vec::new();
        match final_state {
            Some(f) => {
                for (path, sub) in last[f].iter().enumerate() {
                    terminals.push((sub.energy, f as i32, path as i32));
                }
            }
            None => {
                for (state, subs) in last.iter().enumerate() {
                    for (path, sub) in subs.iter().enumerate() {
                        terminals.push((sub.energy, state as i32, path as i32));
                    }
                }
            }
        }
        terminals.sort_unstable_by(rank_candidates);

        for (n, solution) in self.solutions.iter_mut().enumerate() {
            solution.sequence.clear();
            solution.sequence.resize(n_layers, -1);
            match terminals.get(n) {
                Some(&(energy, state, path)) if energy.is_finite() => {
                    solution.energy = energy;
                    let (mut state, mut path) = (state, path);
                    for t in (0..n_layers).rev() {
                        solution.sequence[t] = state;
                        let sub = &self.layers[t][state as usize][path as usize];
                        (state, path) = (sub.prev_state, sub.prev_path);
                    }
                }
                _ => solution.energy = f64::INFINITY,
            }
        }
    }
}

fn rank_candidates(a: &(f64, i32, i32), b: &(f64, i32, i32)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then(a.1.cmp(&b.1))
        .then(a.2.cmp(&b.2))
}
