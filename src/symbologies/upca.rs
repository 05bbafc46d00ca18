//! UPC-A symbology
//!
//! Twelve digits framed by three guards: `(1,1,1)` end guards of width 3
//! and a `(1,1,1,1,1)` mid guard of width 5, with six data symbols of
//! width 7 (four bars each) on either side of the middle. Every data
//! symbol ends on a fixed edge, so the decoder always has 24 anchors.
//!
//! Joint decoding runs over an auxiliary state: the running check sum of
//! the digits, weighted 3 on even symbol indices and 1 on odd ones, taken
//! modulo 10. Constraining the last state to 0 makes the path search admit
//! only strings satisfying the UPC-A check digit, which is what lets a
//! single smudged symbol be overridden by the joint estimate.

use crate::matrix::Matrix;
use crate::symbology::{digits_to_string, EnergyMatrix, Symbology, SymbologyGraph};
use crate::viterbi::Viterbi;
use log::debug;

const SYMBOL_LENGTH: usize = 4;
const N_DIGITS: usize = 10;

/// Run lengths of each digit, in modules; every row sums to 7.
static DIGIT_PATTERNS: [[u32; SYMBOL_LENGTH]; N_DIGITS] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// UPC-A acceptance options.
#[derive(Debug, Clone, Copy)]
pub struct UpcaOptions {
    /// Minimum relative energy gap between the best and second-best joint
    /// estimates.
    pub min_margin: f64,
    /// Maximum energy of an accepted estimate. Reserved.
    pub max_energy: f64,
}

impl Default for UpcaOptions {
    fn default() -> Self {
        UpcaOptions {
            min_margin: 0.02,
            max_energy: 20.0,
        }
    }
}

pub struct Upca {
    opts: UpcaOptions,
    graph: SymbologyGraph,
    /// `(prev_state, cur_state) -> digit` where the digit is weighted 3.
    map_weight3: Matrix<u8>,
    /// Same for weight-1 (odd index) symbols.
    map_weight1: Matrix<u8>,
    solver: Viterbi,
    priors: Vec<Vec<f64>>,
    conditionals: Vec<Matrix<f64>>,
}

impl Upca {
    pub fn new(opts: UpcaOptions) -> Self {
        let mut graph = SymbologyGraph::new();
        let end_guard: [u32; 3] = [1, 1, 1];
        let mid_guard: [u32; 5] = [1, 1, 1, 1, 1];
        graph.add_symbol(3, 3, Some(&end_guard));
        for _ in 0..6 {
            graph.add_symbol(7, 4, None);
        }
        graph.add_symbol(5, 5, Some(&mid_guard));
        for _ in 0..6 {
            graph.add_symbol(7, 4, None);
        }
        graph.add_symbol(3, 3, Some(&end_guard));

        let mut map_weight3 = Matrix::<u8>::new(N_DIGITS, N_DIGITS);
        let mut map_weight1 = Matrix::<u8>::new(N_DIGITS, N_DIGITS);
        for prev in 0..N_DIGITS {
            for digit in 0..N_DIGITS {
                *map_weight3.at_mut(prev, (3 * digit + prev) % 10) = digit as u8;
                *map_weight1.at_mut(prev, (digit + prev) % 10) = digit as u8;
            }
        }

        Upca {
            opts,
            graph,
            map_weight3,
            map_weight1,
            solver: Viterbi::new(2),
            priors: Vec::new(),
            conditionals: Vec::new(),
        }
    }

    #[inline]
    fn digit_from_states(&self, prev: usize, cur: usize, symbol: usize) -> usize {
        if symbol % 2 == 0 {
            *self.map_weight3.at(prev, cur) as usize
        } else {
            *self.map_weight1.at(prev, cur) as usize
        }
    }
}

impl Default for Upca {
    fn default() -> Self {
        Self::new(UpcaOptions::default())
    }
}

impl Symbology for Upca {
    fn name(&self) -> &str {
        "UPC-A"
    }

    fn graph(&self) -> &SymbologyGraph {
        &self.graph
    }

    fn convolution_pattern(
        &self,
        digit: usize,
        module_width: f64,
        flipped: bool,
        pattern: &mut Vec<u32>,
    ) {
        pattern.clear();
        pattern.reserve(SYMBOL_LENGTH + 2);
        let runs = &DIGIT_PATTERNS[digit];
        // One module of lead-in, the digit's cumulative bar boundaries,
        // one module of lead-out.
        let mut width = module_width;
        pattern.push(module_width as u32);
        for k in 0..SYMBOL_LENGTH {
            let run = if flipped {
                runs[SYMBOL_LENGTH - 1 - k]
            } else {
                runs[k]
            };
            width += run as f64 * module_width;
            pattern.push(width as u32);
        }
        pattern.push((width + module_width) as u32);
    }

    fn estimate(&mut self, energies: &EnergyMatrix) -> Option<String> {
        let n_symbols = self.graph.n_data_symbols();
        debug_assert_eq!(energies.cols(), n_symbols);
        if self.priors.is_empty() {
            self.priors = vec![vec![0.0; N_DIGITS]; n_symbols];
            self.conditionals = vec![Matrix::new(N_DIGITS, N_DIGITS); n_symbols - 1];
        }
        // The chain starts in state 0, so layer-0 priors come straight from
        // the digits reachable out of state 0.
        for cur in 0..N_DIGITS {
            self.priors[0][cur] = *energies.at(self.digit_from_states(0, cur, 0), 0);
        }
        for t in 1..n_symbols {
            for prev in 0..N_DIGITS {
                for cur in 0..N_DIGITS {
                    *self.conditionals[t - 1].at_mut(prev, cur) =
                        *energies.at(self.digit_from_states(prev, cur, t), t);
                }
            }
        }

        // Final state 0 is the check-digit constraint.
        let (best_energy, second_energy, sequence) =
            match self.solver.solve(&self.priors, &self.conditionals, Some(0)) {
                Ok(s) => (s[0].energy, s[1].energy, s[0].sequence.clone()),
                Err(err) => {
                    debug!("joint decode aborted: {err}");
                    return None;
                }
            };
        let margin = (second_energy - best_energy) / best_energy;

        let mut digits = vec![0usize; n_symbols];
        let mut prev = 0usize;
        for (t, digit) in digits.iter_mut().enumerate() {
            let cur = sequence[t] as usize;
            *digit = self.digit_from_states(prev, cur, t);
            prev = cur;
        }

        if margin < self.opts.min_margin {
            debug!(
                "estimate {} failed margin test ({margin:.4} < {})",
                digits_to_string(&digits),
                self.opts.min_margin
            );
            return None;
        }
        // The joint estimate may override at most one symbol whose
        // individually cheapest digit disagrees.
        let mut n_overridden = 0;
        for (symbol, &estimated) in digits.iter().enumerate() {
            let winning = *energies.at(estimated, symbol);
            if (0..N_DIGITS).any(|d| d != estimated && *energies.at(d, symbol) < winning) {
                n_overridden += 1;
                if n_overridden > 1 {
                    debug!(
                        "estimate {} rejected: more than one overridden symbol",
                        digits_to_string(&digits)
                    );
                    return None;
                }
            }
        }
        let estimate = digits_to_string(&digits);
        debug!("estimated {estimate} with energy {best_energy:.3}, margin {margin:.3}");
        Some(estimate)
    }
}
