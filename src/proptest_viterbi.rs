//! Property tests for the layered path solver
//!
//! Random small problems are solved both by the DP and by brute-force
//! enumeration of every sequence, which pins down the contract: energies
//! are exact sums, solutions come back sorted, and the best solution
//! matches the true minimum.

use crate::matrix::Matrix;
use crate::viterbi::Viterbi;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Problem {
    priors: Vec<Vec<f64>>,
    conditionals: Vec<Matrix<f64>>,
}

fn problem_strategy() -> impl Strategy<Value = Problem> {
    // Integer-valued energies keep float comparisons exact.
    (2usize..5, 1usize..4).prop_flat_map(|(layers, states)| {
        let priors = proptest::collection::vec(
            proptest::collection::vec((0u8..16).prop_map(f64::from), states),
            layers,
        );
        let conditionals = proptest::collection::vec(
            proptest::collection::vec((0u8..16).prop_map(f64::from), states * states),
            layers - 1,
        );
        (priors, conditionals).prop_map(move |(priors, conds)| Problem {
            priors,
            conditionals: conds
                .into_iter()
                .map(|c| Matrix::from_vec(states, states, c))
                .collect(),
        })
    })
}

fn enumerate_energies(p: &Problem) -> Vec<f64> {
    let layers = p.priors.len();
    let states = p.priors[0].len();
    let mut energies = Vec::new();
    let total = states.pow(layers as u32);
    for code in 0..total {
        let mut seq = Vec::with_capacity(layers);
        let mut c = code;
        for _ in 0..layers {
            seq.push(c % states);
            c /= states;
        }
        let mut e = 0.0;
        for (t, &s) in seq.iter().enumerate() {
            e += p.priors[t][s];
            if t + 1 < layers {
                e += *p.conditionals[t].at(s, seq[t + 1]);
            }
        }
        energies.push(e);
    }
    energies.sort_by(|a, b| a.partial_cmp(b).unwrap());
    energies
}

fn sequence_energy(p: &Problem, seq: &[i32]) -> f64 {
    let mut e = 0.0;
    for (t, &s) in seq.iter().enumerate() {
        e += p.priors[t][s as usize];
        if t + 1 < seq.len() {
            e += *p.conditionals[t].at(s as usize, seq[t + 1] as usize);
        }
    }
    e
}

proptest! {
    #[test]
    fn k_best_energies_match_brute_force(p in problem_strategy()) {
        let mut solver = Viterbi::new(3);
        let solutions = solver.solve(&p.priors, &p.conditionals, None).unwrap().to_vec();
        let all = enumerate_energies(&p);
        for (n, solution) in solutions.iter().enumerate() {
            if n < all.len() {
                // Returned energy is both the claimed sum and the n-th
                // smallest over all sequences.
                prop_assert_eq!(solution.energy, all[n]);
                prop_assert_eq!(solution.energy, sequence_energy(&p, &solution.sequence));
            } else {
                prop_assert!(solution.energy.is_infinite());
                prop_assert!(solution.sequence.iter().all(|&s| s == -1));
            }
        }
        for pair in solutions.windows(2) {
            prop_assert!(pair[0].energy <= pair[1].energy);
        }
    }

    #[test]
    fn restricted_solve_ends_at_final_state(p in problem_strategy()) {
        let final_state = 0usize;
        let mut solver = Viterbi::new(2);
        let solutions = solver.solve(&p.priors, &p.conditionals, Some(final_state)).unwrap().to_vec();
        for solution in &solutions {
            if solution.energy.is_finite() {
                prop_assert_eq!(*solution.sequence.last().unwrap() as usize, final_state);
                prop_assert_eq!(solution.energy, sequence_energy(&p, &solution.sequence));
            }
        }
    }
}
