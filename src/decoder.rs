//! Barcode decoding against a registered symbology
//!
//! Decoding turns a located candidate segment into a digit string. The
//! stages: a resolution gate that refuses hopeless candidates, extraction
//! of an integrated 1-D luminance slice across the stripe, edge detection
//! on that slice, alignment of the symbology's fixed edges to the detected
//! edges with an iterated path search, and finally matched-filter digit
//! energies handed to the symbology's joint estimator, once per sweep
//! direction.
//!
//! The slice is kept integrated on purpose: the matched filter consumes it
//! through telescoping differences, so integration and convolution cancel.
//! Changing one side requires changing the other.

use crate::barcode::Barcode;
use crate::matrix::{Matrix, Point, PointF};
use crate::symbology::{EnergyMatrix, Symbology};
use crate::viterbi::Viterbi;
use log::debug;

/// Tuning knobs of the decoding stage.
#[derive(Debug, Clone, Copy)]
pub struct DecoderOptions {
    /// Minimum second-difference magnitude for a slice edge.
    pub edge_thresh: i32,
    /// Module width the slice is resampled to, in slice pixels.
    pub fundamental_width: usize,
    /// Weight of the edge-magnitude term in fixed-edge priors.
    pub edge_power_coefficient: f64,
    /// Magnitude at which an edge stops being penalized as weak.
    pub max_edge_magnitude: i32,
    /// Variance of a fixed edge's absolute location, in modules squared.
    pub edge_fixed_location_var: f64,
    /// Variance of the spacing between consecutive fixed edges.
    pub edge_relative_location_var: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            edge_thresh: 40,
            fundamental_width: 10,
            edge_power_coefficient: 1.0,
            max_edge_magnitude: 200,
            edge_fixed_location_var: 10_000.0,
            edge_relative_location_var: 1.0,
        }
    }
}

/// Outcome of one decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The candidate is too small, too large, or too close to the image
    /// border to be worth attempting.
    CannotDecode,
    /// Decoding was attempted and did not produce a verified string.
    Failed,
    /// The barcode was decoded; the candidate has been filled in.
    Success,
}

/// An edge found in the integrated slice.
#[derive(Debug, Clone, Copy)]
struct DetectedEdge {
    /// +1 for dark-to-light, -1 for light-to-dark.
    polarity: i32,
    /// Index into the slice.
    location: i32,
    magnitude: i32,
    /// Prefix counts of each polarity before this edge; they make
    /// polarity-respecting index arithmetic O(1).
    n_prev_pos: i32,
    n_prev_neg: i32,
}

/// Slice interval covering one data symbol after fixed-edge alignment.
#[derive(Debug, Clone, Copy)]
struct SymbolBoundary {
    left: i32,
    right: i32,
    /// Symbol width in modules.
    width: u32,
}

/// Expected structure of one fixed edge, precomputed from the symbology.
#[derive(Debug, Clone, Copy)]
struct FixedEdgeInfo {
    location: i32,
    polarity: i32,
    n_prev_pos: i32,
    n_prev_neg: i32,
}

/// Decoder for a single symbology. Owns the symbology and all per-call
/// scratch; buffers are sized once and recycled across reads.
pub struct Decoder {
    opts: DecoderOptions,
    symbology: Box<dyn Symbology>,
    n_symbols: usize,
    alphabet: usize,
    total_width: u32,
    fixed_info: Vec<FixedEdgeInfo>,
    /// Per data symbol: indices into the fixed-edge list bracketing it,
    /// plus its width in modules.
    symbol_anchors: Vec<(usize, usize, u32)>,
    slice: Vec<i32>,
    edges: Vec<DetectedEdge>,
    candidates: Vec<Vec<usize>>,
    priors: Vec<Vec<f64>>,
    conditionals: Vec<Matrix<f64>>,
    solver: Viterbi,
    pattern: Vec<u32>,
    convolutions: Matrix<i32>,
    energies: EnergyMatrix,
}

impl Decoder {
    pub fn new(symbology: Box<dyn Symbology>, opts: DecoderOptions) -> Self {
        let graph = symbology.graph();
        let n_symbols = graph.n_data_symbols();
        let alphabet = symbology.alphabet_size();
        let total_width = graph.total_width();
        let n_fixed = graph.n_fixed_edges();
        let fixed_info: Vec<FixedEdgeInfo> = (0..n_fixed)
            .map(|i| {
                let e = graph.fixed_edge(i);
                FixedEdgeInfo {
                    location: e.location,
                    polarity: e.polarity(),
                    n_prev_pos: e.n_previous_positive() as i32,
                    n_prev_neg: e.n_previous_negative() as i32,
                }
            })
            .collect();
        // Walk the fixed-edge list once to anchor every data symbol.
        let mut symbol_anchors = Vec::with_capacity(n_symbols);
        let mut e = 0;
        for s in 0..n_symbols {
            let symbol = graph.data_symbol(s);
            let left_id = graph.symbol_left_edge(symbol).index;
            while graph.fixed_edge(e).index != left_id {
                e += 1;
            }
            let left = e;
            let right_id = graph.symbol_right_edge(symbol).index;
            let mut r = left;
            while graph.fixed_edge(r).index != right_id {
                r += 1;
            }
            symbol_anchors.push((left, r, symbol.width));
        }
        let slice_len = (total_width as usize + 4) * opts.fundamental_width;
        debug!(
            "decoder created for {} ({} symbols, width {}, {} edges)",
            symbology.name(),
            n_symbols,
            total_width,
            graph.n_edges()
        );
        Decoder {
            opts,
            n_symbols,
            alphabet,
            total_width,
            fixed_info,
            symbol_anchors,
            slice: vec![0; slice_len],
            edges: Vec::with_capacity(100),
            candidates: vec![Vec::new(); n_fixed],
            priors: vec![Vec::new(); n_fixed],
            conditionals: vec![Matrix::new(0, 0); n_fixed - 1],
            solver: Viterbi::new(1),
            pattern: Vec::new(),
            convolutions: Matrix::new(alphabet, n_symbols),
            energies: Matrix::new(alphabet, n_symbols),
            symbology,
        }
    }

    pub fn symbology_name(&self) -> &str {
        self.symbology.name()
    }

    /// Attempt to decode a located candidate. On success the candidate's
    /// `estimate` and `symbology` are filled in.
    pub fn read(&mut self, image: &Matrix<u8>, bc: &mut Barcode) -> ReadOutcome {
        if !self.should_attempt(image, bc) {
            return ReadOutcome::CannotDecode;
        }
        self.extract_integral_slice(image, bc.first_edge, bc.last_edge);
        let Some(boundaries) = self.localize_fixed_edges() else {
            return ReadOutcome::Failed;
        };
        for backwards in [false, true] {
            self.digit_energies(backwards, &boundaries);
            debug!(
                "estimating {} in the {} direction",
                self.symbology.name(),
                if backwards { "backward" } else { "forward" }
            );
            if let Some(estimate) = self.symbology.estimate(&self.energies) {
                bc.estimate = estimate;
                bc.symbology = self.symbology.name().to_string();
                return ReadOutcome::Success;
            }
        }
        ReadOutcome::Failed
    }

    /// Resolution gate. A candidate is refused when both axes are small,
    /// when either axis is outsized, or when an endpoint hugs the border.
    fn should_attempt(&self, image: &Matrix<u8>, bc: &Barcode) -> bool {
        let (m, n) = (image.rows() as i32, image.cols() as i32);
        let d = bc.last_edge - bc.first_edge;
        let (w, h) = (d.x.abs(), d.y.abs());
        let too_small = (w as f64) < 0.4 * n as f64 && (h as f64) < 0.4 * m as f64;
        let too_big = (w as f64) > 0.8 * n as f64 || (h as f64) > 0.8 * m as f64;
        let min_dist = m.min(n) / 20;
        let left = bc.first_edge.x.min(bc.last_edge.x);
        let right = n - bc.first_edge.x.max(bc.last_edge.x);
        let top = bc.first_edge.y.min(bc.last_edge.y);
        let bottom = m - bc.first_edge.y.max(bc.last_edge.y);
        let too_close = left < min_dist || right < min_dist || top < min_dist || bottom < min_dist;
        if too_small {
            debug!("candidate too small ({w}x{h})");
            false
        } else if too_big {
            debug!("candidate too big ({w}x{h})");
            false
        } else if too_close {
            debug!("candidate too close to the image border");
            false
        } else {
            true
        }
    }

    /// Resample the stripe onto the slice, integrating as we go. The slice
    /// spans the candidate extended by two modules on each side, stretched
    /// so one module is `fundamental_width` slice pixels.
    fn extract_integral_slice(&mut self, image: &Matrix<u8>, first: Point, last: Point) {
        let module = (last - first).norm() / self.total_width as f64;
        let d = last - first;
        let theta = (d.y as f64).atan2(d.x as f64);
        let offset = Point::new(
            (2.0 * theta.cos() * module) as i32,
            (2.0 * theta.sin() * module) as i32,
        );
        let first = first - offset;
        let last = last + offset;
        let d = last - first;
        let theta = (d.y as f64).atan2(d.x as f64);
        let scaling = self.slice.len() as f64 / d.norm();
        let step = PointF::new(theta.cos() / scaling, theta.sin() / scaling);

        let sample = |p: Point| -> i32 {
            let y = p.y.clamp(0, image.rows() as i32 - 1) as usize;
            let x = p.x.clamp(0, image.cols() as i32 - 1) as usize;
            *image.at(y, x) as i32
        };
        let len = self.slice.len();
        self.slice[0] = sample(first);
        let mut pt = PointF::from(first);
        for k in 1..len - 1 {
            pt += step;
            let qx = (pt.x.floor() as i32).clamp(0, image.cols() as i32 - 2);
            let qy = (pt.y.floor() as i32).clamp(0, image.rows() as i32 - 2);
            let dx = (pt.x - qx as f64).clamp(0.0, 1.0);
            let dy = (pt.y - qy as f64).clamp(0.0, 1.0);
            let (qx, qy) = (qx as usize, qy as usize);
            let top = (1.0 - dx) * *image.at(qy, qx) as f64 + dx * *image.at(qy, qx + 1) as f64;
            let bottom =
                (1.0 - dx) * *image.at(qy + 1, qx) as f64 + dx * *image.at(qy + 1, qx + 1) as f64;
            let value = (1.0 - dy) * top + dy * bottom;
            self.slice[k] = (value + self.slice[k - 1] as f64) as i32;
        }
        self.slice[len - 1] = sample(last) + self.slice[len - 2];
    }

    /// Detect strict local extrema of the second difference of the
    /// integrated slice (a boxcar differentiator on the raw samples).
    fn extract_edges(&mut self) {
        self.edges.clear();
        let w = self.opts.fundamental_width / 2;
        let thresh = self.opts.edge_thresh;
        let len = self.slice.len();
        let second_diff = |s: &[i32], i: usize| -> i32 { s[i + w] + s[i - w] - 2 * s[i] };
        let (mut n_pos, mut n_neg) = (0, 0);
        let mut e_prev = 0;
        let mut e = second_diff(&self.slice, w);
        for i in w + 1..len - w - 1 {
            let e_next = second_diff(&self.slice, i);
            if e > thresh && e > e_prev && e >= e_next {
                self.edges.push(DetectedEdge {
                    polarity: 1,
                    location: (i - 1) as i32,
                    magnitude: e,
                    n_prev_pos: n_pos,
                    n_prev_neg: n_neg,
                });
                n_pos += 1;
            } else if e < -thresh && e < e_prev && e <= e_next {
                self.edges.push(DetectedEdge {
                    polarity: -1,
                    location: (i - 1) as i32,
                    magnitude: -e,
                    n_prev_pos: n_pos,
                    n_prev_neg: n_neg,
                });
                n_neg += 1;
            }
            e_prev = e;
            e = e_next;
        }
    }

    /// Match detected edges to the symbology's fixed edges and solve for
    /// the most plausible assignment, iterating on the module width until
    /// it stabilizes. `None` means the detected edges cannot carry this
    /// symbology.
    fn localize_fixed_edges(&mut self) -> Option<Vec<SymbolBoundary>> {
        self.extract_edges();
        if !self.collect_fixed_edge_candidates() {
            return None;
        }
        let n_fixed = self.fixed_info.len();
        let first = self.edges[self.candidates[0][0]].location;
        let Some(&last_candidate) = self.candidates[n_fixed - 1].last() else {
            return None;
        };
        let last = self.edges[last_candidate].location;
        let mut x = (last - first) as f64 / self.total_width as f64;

        let mut chosen: Vec<i32> = Vec::new();
        for _ in 0..16 {
            let x_prev = x;
            self.fixed_edge_energies(x);
            let solutions = match self.solver.solve(&self.priors, &self.conditionals, None) {
                Ok(s) => s,
                Err(err) => {
                    debug!("fixed-edge alignment aborted: {err}");
                    return None;
                }
            };
            chosen = solutions[0].sequence.clone();
            let first = self.edges[self.candidates[0][chosen[0] as usize]].location;
            let last =
                self.edges[self.candidates[n_fixed - 1][chosen[n_fixed - 1] as usize]].location;
            x = (last - first) as f64 / self.total_width as f64;
            if (x - x_prev).abs() <= 0.01 * x {
                break;
            }
        }

        let boundaries = self
            .symbol_anchors
            .iter()
            .map(|&(left, right, width)| SymbolBoundary {
                left: self.edges[self.candidates[left][chosen[left] as usize]].location,
                right: self.edges[self.candidates[right][chosen[right] as usize]].location,
                width,
            })
            .collect();
        Some(boundaries)
    }

    /// Build the per-fixed-edge candidate sets by polarity and prefix-count
    /// windows. The window slack is the surplus of detected edges over the
    /// expected count per polarity; a deficit means the slice cannot hold
    /// the symbology and there is nothing to align.
    fn collect_fixed_edge_candidates(&mut self) -> bool {
        let Some(last) = self.edges.last() else {
            return false;
        };
        let expected_pos = (self.symbology.graph().n_edges() / 2) as i32;
        let expected_neg = expected_pos;
        let detected_pos = last.n_prev_pos + i32::from(last.polarity == 1);
        let detected_neg = last.n_prev_neg + i32::from(last.polarity == -1);
        let slack_pos = detected_pos - expected_pos;
        let slack_neg = detected_neg - expected_neg;
        if slack_pos < 0 || slack_neg < 0 {
            debug!(
                "not enough edges detected ({detected_pos}+/{detected_neg}-, \
                 need {expected_pos}+/{expected_neg}-)"
            );
            return false;
        }
        let mut start = 0usize;
        for (n, info) in self.fixed_info.iter().enumerate() {
            let set = &mut self.candidates[n];
            set.clear();
            let min_neg = info.n_prev_neg;
            let max_neg = info.n_prev_neg + slack_neg;
            let min_pos = info.n_prev_pos;
            let max_pos = info.n_prev_pos + slack_pos;
            while start < self.edges.len()
                && (self.edges[start].n_prev_neg < min_neg || self.edges[start].n_prev_pos < min_pos)
            {
                start += 1;
            }
            for (i, edge) in self.edges.iter().enumerate().skip(start) {
                if edge.n_prev_neg > max_neg || edge.n_prev_pos > max_pos {
                    break;
                }
                if edge.polarity == info.polarity {
                    set.push(i);
                }
            }
            if set.is_empty() {
                return false;
            }
        }
        true
    }

    /// Prior and transition energies for the fixed-edge assignment at the
    /// current module-width estimate `x`.
    fn fixed_edge_energies(&mut self, x: f64) {
        let coeff_prior = 1.0 / self.opts.edge_fixed_location_var;
        let coeff_cond = 1.0 / self.opts.edge_relative_location_var;
        let n_fixed = self.fixed_info.len();
        for n in 0..n_fixed {
            let info = self.fixed_info[n];
            let expected = 1.0 + info.location as f64;
            self.priors[n].clear();
            for &i in &self.candidates[n] {
                let edge = &self.edges[i];
                let weak = (self.opts.max_edge_magnitude - edge.magnitude).max(0) as f64;
                let miss = expected - edge.location as f64 / x;
                self.priors[n]
                    .push(self.opts.edge_power_coefficient * weak + coeff_prior * miss * miss);
            }
        }
        for n in 0..n_fixed - 1 {
            let expected = (self.fixed_info[n + 1].location - self.fixed_info[n].location) as f64;
            let (rows, cols) = (self.candidates[n].len(), self.candidates[n + 1].len());
            self.conditionals[n].reset(rows, cols);
            for i in 0..rows {
                let loc_i = self.edges[self.candidates[n][i]].location;
                for j in 0..cols {
                    let loc_j = self.edges[self.candidates[n + 1][j]].location;
                    let gap = (loc_j - loc_i) as f64 / x;
                    *self.conditionals[n].at_mut(i, j) = if gap <= 0.0 {
                        1e6
                    } else {
                        let miss = expected - gap;
                        coeff_cond * miss * miss
                    };
                }
            }
        }
    }

    /// Matched-filter energies of every digit at every symbol, for one
    /// sweep direction. Both sweeps write the energy matrix in canonical
    /// symbol order, so the joint estimator never sees a reversed code.
    fn digit_energies(&mut self, backwards: bool, boundaries: &[SymbolBoundary]) {
        for (s, boundary) in boundaries.iter().enumerate() {
            let graph = self.symbology.graph();
            let symbol = graph.data_symbol(s);
            let module = (boundary.right - boundary.left) as f64 / boundary.width as f64;
            let sgn = if graph.bar_is_dark(symbol.bars.start) {
                1
            } else {
                -1
            };
            let symbol_index = if backwards { self.n_symbols - 1 - s } else { s };
            let mut sum = 0i64;
            for d in 0..self.alphabet {
                self.symbology
                    .convolution_pattern(d, module, backwards, &mut self.pattern);
                let start = boundary.left - self.pattern[0] as i32;
                let conv = convolve(&self.slice, start, sgn, &self.pattern).max(1);
                sum += conv as i64;
                *self.convolutions.at_mut(d, symbol_index) = conv;
            }
            for d in 0..self.alphabet {
                let conv = *self.convolutions.at(d, symbol_index);
                *self.energies.at_mut(d, symbol_index) = -((conv as f64 / sum as f64).ln());
            }
        }
    }
}

/// Normalized bar-pattern correlation of the integrated slice against a
/// cumulative boundary pattern, starting at `start` with initial sign
/// `sgn`. Out-of-range placements correlate minimally instead of reading
/// past the slice.
fn convolve(slice: &[i32], start: i32, sgn: i32, pattern: &[u32]) -> i32 {
    let Some(&width) = pattern.last() else {
        return 0;
    };
    let width = width as i32;
    if width <= 0 || start < 0 || start + width >= slice.len() as i32 {
        return 0;
    }
    let data = &slice[start as usize..];
    let mut sgn = sgn;
    let data_mean = (data[width as usize] - data[0]) / width;
    let mut pattern_sum = sgn * pattern[0] as i32;
    let mut c = sgn * (data[pattern[0] as usize] - data[0]);
    for k in 1..pattern.len() {
        sgn = -sgn;
        c += sgn * (data[pattern[k] as usize] - data[pattern[k - 1] as usize]);
        pattern_sum += sgn * (pattern[k] as i32 - pattern[k - 1] as i32);
    }
    (c - pattern_sum * data_mean) / width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbologies::Upca;

    fn upca_decoder() -> Decoder {
        Decoder::new(Box::<Upca>::default(), DecoderOptions::default())
    }

    /// Render a UPC-A digit string as a run-length list, outermost guard
    /// to outermost guard, starting with a dark run.
    fn upca_runs(digits: &[usize; 12]) -> Vec<u32> {
        static PATTERNS: [[u32; 4]; 10] = [
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
        let mut runs = vec![1, 1, 1];
        for d in &digits[..6] {
            runs.extend_from_slice(&PATTERNS[*d]);
        }
        runs.extend_from_slice(&[1, 1, 1, 1, 1]);
        for d in &digits[6..] {
            runs.extend_from_slice(&PATTERNS[*d]);
        }
        runs.extend_from_slice(&[1, 1, 1]);
        runs
    }

    /// Intensity profile of the rendered code at `module` pixels per
    /// module with two modules of quiet zone on each side.
    fn upca_profile(digits: &[usize; 12], module: usize) -> Vec<u8> {
        let runs = upca_runs(digits);
        let mut profile = vec![255u8; 2 * module];
        let mut dark = true;
        for run in runs {
            let value = if dark { 0 } else { 255 };
            profile.extend(std::iter::repeat(value).take(run as usize * module));
            dark = !dark;
        }
        profile.extend(std::iter::repeat(255u8).take(2 * module));
        profile
    }

    fn load_slice(decoder: &mut Decoder, profile: &[u8]) {
        assert_eq!(profile.len(), decoder.slice.len());
        let mut acc = 0i32;
        for (k, &v) in profile.iter().enumerate() {
            if k == 0 {
                acc = v as i32;
            } else {
                acc += v as i32;
            }
            decoder.slice[k] = acc;
        }
    }

    #[test]
    fn resolution_gate_truth_table() {
        let decoder = upca_decoder();
        let image = Matrix::<u8>::new(240, 320);
        let gate =
            |first: Point, last: Point| decoder.should_attempt(&image, &Barcode::new(first, last));
        // Small on both axes: refused.
        assert!(!gate(Point::new(100, 100), Point::new(180, 140)));
        // Wide enough horizontally even though short vertically: passes.
        assert!(gate(Point::new(60, 100), Point::new(250, 110)));
        // Too big on one axis alone: refused.
        assert!(!gate(Point::new(20, 100), Point::new(300, 110)));
        // Endpoint within min(M, N)/20 = 12 of the border: refused.
        assert!(!gate(Point::new(60, 8), Point::new(250, 12)));
    }

    #[test]
    fn edge_extraction_alternates_and_counts() {
        let mut decoder = upca_decoder();
        let profile = upca_profile(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 5], 10);
        load_slice(&mut decoder, &profile);
        decoder.extract_edges();
        // 59 bars yield 60 alternating edges, starting light-to-dark.
        assert_eq!(decoder.edges.len(), 60);
        assert_eq!(decoder.edges[0].polarity, -1);
        for pair in decoder.edges.windows(2) {
            assert_eq!(pair[0].polarity, -pair[1].polarity);
        }
        // Prefix counts reconstruct each edge's ordinal.
        for (i, edge) in decoder.edges.iter().enumerate() {
            assert_eq!((edge.n_prev_pos + edge.n_prev_neg) as usize, i);
        }
        // First transition sits at the end of the quiet zone.
        assert!((decoder.edges[0].location - 20).abs() <= 1);
    }

    #[test]
    fn clean_slice_decodes_in_place() {
        let digits = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 5];
        let mut decoder = upca_decoder();
        let profile = upca_profile(&digits, 10);
        load_slice(&mut decoder, &profile);
        let boundaries = decoder.localize_fixed_edges().expect("alignment");
        assert_eq!(boundaries.len(), 12);
        for b in &boundaries {
            // Each data symbol spans close to 7 modules of 10 pixels.
            assert!(((b.right - b.left) - 70).abs() <= 2, "span {b:?}");
        }
        decoder.digit_energies(false, &boundaries);
        let estimate = decoder.symbology.estimate(&decoder.energies);
        assert_eq!(estimate.as_deref(), Some("012345678905"));
    }

    #[test]
    fn mirrored_slice_decodes_backwards() {
        let digits = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 5];
        let mut decoder = upca_decoder();
        let mut profile = upca_profile(&digits, 10);
        profile.reverse();
        load_slice(&mut decoder, &profile);
        let boundaries = decoder.localize_fixed_edges().expect("alignment");
        decoder.digit_energies(true, &boundaries);
        let estimate = decoder.symbology.estimate(&decoder.energies);
        assert_eq!(estimate.as_deref(), Some("012345678905"));
    }

    #[test]
    fn missing_edges_fail_cleanly() {
        let digits = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 5];
        let mut decoder = upca_decoder();
        let mut profile = upca_profile(&digits, 10);
        // Fill in one light bar: two interior edges disappear, leaving a
        // per-polarity deficit that cannot be aligned.
        let runs = upca_runs(&digits);
        let gap_start = (2 + runs[..3].iter().sum::<u32>() as usize) * 10;
        let gap_len = runs[3] as usize * 10;
        for v in &mut profile[gap_start..gap_start + gap_len] {
            *v = 0;
        }
        load_slice(&mut decoder, &profile);
        assert!(decoder.localize_fixed_edges().is_none());
    }

    #[test]
    fn empty_slice_fails_cleanly() {
        let mut decoder = upca_decoder();
        let profile = vec![128u8; decoder.slice.len()];
        load_slice(&mut decoder, &profile);
        assert!(decoder.localize_fixed_edges().is_none());
    }
}
