//! Barcode location by orientation voting and directional edge scans
//!
//! A barcode stripe shows up in the gradient field as a dense population
//! of edges sharing one undirected orientation in both polarities. The
//! locator tiles the field into cells, lets each qualifying cell vote on
//! orientation, climbs the circular vote density to its modes, clusters
//! the cells that agree with each mode, and finally walks a ray through
//! every cluster center tallying aligned edges to pin down the stripe's
//! extent.

use crate::barcode::Barcode;
use crate::gradient::GradientField;
use crate::matrix::{Matrix, Point, PointF};
use crate::meanshift::{
    ascend_circular_modes, find_cluster_centers, mean_shift, PointGaussianKernel, Vote,
};
use crate::{Error, Result};
use log::debug;

/// Tuning knobs of the locating stage.
#[derive(Debug, Clone, Copy)]
pub struct LocatorOptions {
    /// Minimum gradient magnitude for a pixel to vote.
    pub grad_thresh: u8,
    /// Side length of the voting cells, in working-scale pixels.
    pub cell_size: usize,
    /// Maximum orientation entropy for a cell to qualify.
    pub max_entropy: f64,
    /// Cap on votes a single histogram bin may receive.
    pub max_votes_per_bin: u32,
    /// Minimum folded votes for an orientation to seed mode search.
    pub min_votes_per_orientation: u32,
    /// Minimum votes for a surviving orientation mode.
    pub min_votes_per_mode: u32,
    /// Minimum aligned edges for a segment to count as a barcode.
    pub min_edges_in_barcode: i32,
    /// Minimum edges per pixel along an accepted segment.
    pub min_edge_density_in_barcode: f64,
    /// Scan abort distance: pixels without an aligned edge.
    pub max_dist_btw_edges: i32,
    /// Number of undirected orientation bins over half a turn.
    pub n_orientations: usize,
    /// Power-of-two subsampling of the input image.
    pub scale: u32,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        LocatorOptions {
            grad_thresh: 20,
            cell_size: 16,
            max_entropy: 1.5,
            max_votes_per_bin: 20,
            min_votes_per_orientation: 300,
            min_votes_per_mode: 50,
            min_edges_in_barcode: 20,
            min_edge_density_in_barcode: 0.2,
            max_dist_btw_edges: 5,
            n_orientations: 18,
            scale: 0,
        }
    }
}

impl LocatorOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.scale > 3 {
            return Err(Error::InvalidOptions("scale must be in 0..=3"));
        }
        if self.n_orientations == 0 || self.n_orientations > 60 {
            return Err(Error::InvalidOptions("n_orientations must be in 1..=60"));
        }
        if self.cell_size < 2 {
            return Err(Error::InvalidOptions("cell_size must be at least 2"));
        }
        Ok(())
    }
}

/// One voting tile of the gradient field.
struct Cell {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    /// Signed orientation tally, `2n` bins.
    signed_hist: Vec<u32>,
    /// Magnitude-weighted undirected tally, `n` bins.
    weighted_hist: Vec<u32>,
    n_voters: u32,
    /// Cached dominant signed bin, -1 until first queried.
    dominant: i32,
    /// Cached entropy, negative until first queried.
    entropy: f64,
}

impl Cell {
    fn new(x: usize, y: usize, w: usize, h: usize, n_orientations: usize) -> Self {
        Cell {
            x,
            y,
            w,
            h,
            signed_hist: vec![0; 2 * n_orientations],
            weighted_hist: vec![0; n_orientations],
            n_voters: 0,
            dominant: -1,
            entropy: -1.0,
        }
    }

    fn reset(&mut self) {
        self.signed_hist.fill(0);
        self.weighted_hist.fill(0);
        self.n_voters = 0;
        self.dominant = -1;
        self.entropy = -1.0;
    }

    fn add_voter(&mut self, orientation: u8, magnitude: u8) {
        let n = self.weighted_hist.len();
        self.signed_hist[orientation as usize] += 1;
        self.weighted_hist[orientation as usize % n] += magnitude as u32;
        self.n_voters += 1;
    }

    fn dominant_orientation(&mut self) -> usize {
        if self.dominant < 0 {
            let mut best = 0;
            for (o, &count) in self.signed_hist.iter().enumerate() {
                if count > self.signed_hist[best] {
                    best = o;
                }
            }
            self.dominant = best as i32;
        }
        self.dominant as usize
    }

    /// Shannon entropy (natural log) of the normalized weighted histogram.
    fn entropy(&mut self) -> f64 {
        if self.entropy < 0.0 {
            let mut acc = 0.0;
            let mut total = 0.0;
            for &h in &self.weighted_hist {
                if h > 0 {
                    let p = h as f64;
                    acc -= p * p.ln();
                    total += p;
                }
            }
            self.entropy = if total > 0.0 {
                total.ln() + acc / total
            } else {
                0.0
            };
        }
        self.entropy
    }

    fn has_enough_voters(&self) -> bool {
        self.n_voters > (self.w * self.h) as u32 / 4
    }

    fn qualifies(&mut self, max_entropy: f64) -> bool {
        self.has_enough_voters() && self.entropy() < max_entropy
    }

    fn center(&self) -> Point {
        Point::new((self.x + self.w / 2) as i32, (self.y + self.h / 2) as i32)
    }
}

/// A segment accepted by the edge-tally scan, at working scale.
struct Candidate {
    orientation: usize,
    first_edge: Point,
    last_edge: Point,
    n_edges: i32,
}

/// The locating stage. Owns the gradient planes, the voting cells and the
/// acceptable-orientation table; all of it is recycled between calls.
pub struct Locator {
    opts: LocatorOptions,
    field: GradientField,
    cells: Vec<Cell>,
    grid_rows: usize,
    grid_cols: usize,
    field_size: (usize, usize),
    orientation_histogram: Vec<u32>,
    /// `acceptable[scan_bin][pixel_bin]` over both polarities.
    acceptable: Matrix<bool>,
    candidates: Vec<Candidate>,
}

impl Locator {
    pub fn new(opts: LocatorOptions) -> Result<Self> {
        opts.validate()?;
        let n = opts.n_orientations;
        // A pixel orientation is acceptable for a scan when it is within
        // two bins of the scan orientation on the circle, either polarity.
        let acceptable = Matrix::from_fn(n, 2 * n, |scan, pixel| {
            let d = (scan as i32 - (pixel % n) as i32).unsigned_abs() as usize;
            d <= 2 || d >= n.saturating_sub(2)
        });
        Ok(Locator {
            field: GradientField::new(opts.grad_thresh, n, opts.scale),
            cells: Vec::new(),
            grid_rows: 0,
            grid_cols: 0,
            field_size: (0, 0),
            orientation_histogram: vec![0; 2 * n],
            acceptable,
            candidates: Vec::new(),
            opts,
        })
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.opts
    }

    /// Locate barcode candidates, strongest (most edges) first. Endpoints
    /// are promoted to full image coordinates.
    pub fn locate(&mut self, image: &Matrix<u8>) -> Vec<Barcode> {
        self.field.update(image);
        self.prepare_cells();
        self.compute_cell_histograms();
        let seeds = self.orientation_seeds();
        let modes = find_cluster_centers(
            &ascend_circular_modes(&seeds, self.opts.n_orientations as f64),
            0.5,
        );
        self.candidates.clear();
        for mode in &modes {
            self.scan_mode(mode.loc);
        }
        debug!("{} barcode candidates found", self.candidates.len());
        self.candidates
            .sort_by(|a, b| b.n_edges.cmp(&a.n_edges));
        let multiplier = 1 << self.opts.scale;
        self.candidates
            .iter()
            .map(|c| Barcode {
                first_edge: c.first_edge * multiplier,
                last_edge: c.last_edge * multiplier,
                orientation: c.orientation,
                edge_count: c.n_edges,
                ..Default::default()
            })
            .collect()
    }

    /// (Re)build the cell grid for the current field size. Partial cells at
    /// the right and bottom edges are kept.
    fn prepare_cells(&mut self) {
        let cs = self.opts.cell_size;
        let (rows, cols) = (self.field.rows(), self.field.cols());
        if (rows, cols) == self.field_size {
            for cell in &mut self.cells {
                cell.reset();
            }
            return;
        }
        self.field_size = (rows, cols);
        self.grid_rows = rows.div_ceil(cs);
        self.grid_cols = cols.div_ceil(cs);
        let (grid_rows, grid_cols) = (self.grid_rows, self.grid_cols);
        self.cells.clear();
        for ci in 0..grid_rows {
            let y = ci * cs;
            let h = cs.min(rows - y);
            for cj in 0..grid_cols {
                let x = cj * cs;
                let w = cs.min(cols - x);
                self.cells
                    .push(Cell::new(x, y, w, h, self.opts.n_orientations));
            }
        }
    }

    fn compute_cell_histograms(&mut self) {
        let cs = self.opts.cell_size;
        for i in 0..self.field.rows() {
            let mag_row = self.field.magnitudes().row(i);
            let ang_row = self.field.orientations().row(i);
            let cell_row = (i / cs) * self.grid_cols;
            for (j, &m) in mag_row.iter().enumerate() {
                if m != 0 {
                    self.cells[cell_row + j / cs].add_voter(ang_row[j], m);
                }
            }
        }
    }

    /// Fold the global signed histogram and keep the orientations backed by
    /// edges of both polarities.
    fn orientation_seeds(&mut self) -> Vec<Vote<f64>> {
        let n = self.opts.n_orientations;
        self.orientation_histogram.fill(0);
        for cell in &mut self.cells {
            if cell.qualifies(self.opts.max_entropy) {
                for (o, &count) in cell.signed_hist.iter().enumerate() {
                    self.orientation_histogram[o] += count;
                }
            }
        }
        let mut seeds = Vec::new();
        for o in 0..n {
            let folded = self.orientation_histogram[o].min(self.orientation_histogram[o + n]);
            if folded > self.opts.min_votes_per_orientation {
                seeds.push(Vote::new(o as f64, folded as f64));
            }
        }
        seeds
    }

    fn scan_mode(&mut self, theta: f64) {
        let n = self.opts.n_orientations;
        let centers = self.candidate_cell_clusters(theta);
        let mut orientation = theta.floor() as usize % n;
        if theta >= orientation as f64 + 0.5 {
            orientation = (orientation + 1) % n;
        }
        for center in centers {
            if let Some(candidate) = self.scan_segment(center, orientation) {
                debug!(
                    "segment at ({}, {}) orientation {} has {} edges",
                    center.x, center.y, orientation, candidate.n_edges
                );
                self.candidates.push(candidate);
            }
        }
    }

    /// Cluster the qualifying cells whose dominant bin agrees with `theta`
    /// into candidate stripe centers.
    fn candidate_cell_clusters(&mut self, theta: f64) -> Vec<Point> {
        let n = self.opts.n_orientations;
        let floor_bin = theta.floor() as usize % n;
        let ceil_bin = (floor_bin + 1) % n;
        let mut votes = Vec::new();
        for cell in &mut self.cells {
            if cell.qualifies(self.opts.max_entropy) {
                let dominant = cell.dominant_orientation();
                if dominant == floor_bin || dominant == ceil_bin {
                    votes.push(Vote::new(PointF::from(cell.center()), cell.n_voters as f64));
                }
            }
        }
        let kernel = PointGaussianKernel::new(5.0 * self.opts.cell_size as f64);
        let shifted = mean_shift(&votes, &kernel);
        find_cluster_centers(&shifted, 5.0)
            .into_iter()
            .map(|c| c.loc.floor())
            .collect()
    }

    /// Walk both directions from `start` along the scan orientation,
    /// tallying aligned edges. A direction ends after `max_dist_btw_edges`
    /// pixels without an aligned edge, or at the image border; the last
    /// aligned pixel becomes that side's endpoint.
    fn scan_segment(&self, start: Point, orientation: usize) -> Option<Candidate> {
        let (rows, cols) = (self.field.rows() as i32, self.field.cols() as i32);
        if start.x < 0 || start.y < 0 || start.x >= cols || start.y >= rows {
            return None;
        }
        let mag = self.field.magnitudes();
        let ang = self.field.orientations();
        let acceptable = self.acceptable.row(orientation);
        let theta = std::f64::consts::PI * orientation as f64 / self.opts.n_orientations as f64;
        let mut step = PointF::new(theta.cos(), theta.sin());

        let mut n_edges: i32 = 0;
        let mut first_edge = start;
        let mut last_edge = start;
        for dir in 0..2 {
            if dir == 1 {
                step *= -1.0;
            }
            let mut cur = PointF::from(start);
            let mut dist = 0;
            let mut last_good = start;
            loop {
                cur += step;
                let q = cur.floor();
                if q.x < 0 || q.y < 0 || q.x >= cols || q.y >= rows {
                    break;
                }
                let m = mag.row(q.y as usize)[q.x as usize];
                if m != 0 {
                    let bin = ang.row(q.y as usize)[q.x as usize] as usize;
                    if acceptable[bin] {
                        last_good = q;
                        dist = 0;
                        n_edges += 1;
                    } else if n_edges > 0 {
                        // Misaligned edge while tracing erodes the tally.
                        dist += 1;
                        n_edges -= 1;
                    }
                } else if n_edges > 0 {
                    dist += 1;
                }
                if dist > self.opts.max_dist_btw_edges {
                    break;
                }
            }
            if dir == 0 {
                last_edge = last_good;
            } else {
                first_edge = last_good;
            }
        }

        let width = (last_edge - first_edge).norm();
        let threshold = self
            .opts
            .min_edges_in_barcode
            .max((width * self.opts.min_edge_density_in_barcode) as i32);
        (n_edges > threshold).then_some(Candidate {
            orientation,
            first_edge,
            last_edge,
            n_edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vertical bars alternating every `period` pixels inside the given
    /// span, white background.
    fn bar_image(rows: usize, cols: usize, x0: usize, x1: usize, y0: usize, y1: usize, period: usize) -> Matrix<u8> {
        Matrix::from_fn(rows, cols, |i, j| {
            if i >= y0 && i < y1 && j >= x0 && j < x1 && ((j - x0) / period) % 2 == 1 {
                0
            } else {
                255
            }
        })
    }

    #[test]
    fn uniform_image_yields_no_candidates() {
        let mut locator = Locator::new(LocatorOptions::default()).unwrap();
        let img = Matrix::from_fn(240, 320, |_, _| 128);
        assert!(locator.locate(&img).is_empty());
        // Running again on the same image is stable.
        assert!(locator.locate(&img).is_empty());
    }

    #[test]
    fn striped_region_is_located_horizontally() {
        let mut locator = Locator::new(LocatorOptions::default()).unwrap();
        let img = bar_image(200, 200, 40, 160, 40, 160, 4);
        let found = locator.locate(&img);
        assert!(!found.is_empty());
        let best = &found[0];
        assert_eq!(best.orientation, 0);
        // The scan ray is horizontal: both endpoints near the center row.
        assert!((best.first_edge.y - best.last_edge.y).abs() <= 2);
        assert!(best.first_edge.x < best.last_edge.x);
        // Acceptance invariant.
        let width = best.width();
        let opts = LocatorOptions::default();
        assert!(
            best.edge_count
                > opts
                    .min_edges_in_barcode
                    .max((width * opts.min_edge_density_in_barcode) as i32)
        );
    }

    #[test]
    fn locate_is_repeatable() {
        let mut locator = Locator::new(LocatorOptions::default()).unwrap();
        let img = bar_image(200, 200, 40, 160, 40, 160, 4);
        let a = locator.locate(&img);
        let b = locator.locate(&img);
        assert_eq!(a, b);
    }

    #[test]
    fn two_stripes_are_both_found_and_sorted() {
        let mut locator = Locator::new(LocatorOptions::default()).unwrap();
        // A wide vertical-bar stripe and a smaller horizontal-bar stripe.
        let mut img = bar_image(400, 240, 20, 220, 30, 150, 4);
        for i in 250..370 {
            for j in 60..180 {
                // Horizontal bars: alternate by row.
                *img.at_mut(i, j) = if ((i - 250) / 4) % 2 == 1 { 0 } else { 255 };
            }
        }
        let found = locator.locate(&img);
        assert!(found.len() >= 2, "found {} candidates", found.len());
        for pair in found.windows(2) {
            assert!(pair[0].edge_count >= pair[1].edge_count);
        }
        let orientations: Vec<usize> = found.iter().map(|b| b.orientation).collect();
        assert!(orientations.contains(&0));
        assert!(orientations.iter().any(|&o| o == 9));
    }

    #[test]
    fn single_textured_cell_is_not_enough() {
        let mut locator = Locator::new(LocatorOptions::default()).unwrap();
        // One 16x16 patch of stripes cannot reach the vote floor.
        let img = bar_image(200, 200, 96, 112, 96, 112, 2);
        assert!(locator.locate(&img).is_empty());
    }

    #[test]
    fn scaled_endpoints_match_full_scale() {
        let opts = LocatorOptions {
            scale: 1,
            ..Default::default()
        };
        let mut scaled = Locator::new(opts).unwrap();
        let mut full = Locator::new(LocatorOptions::default()).unwrap();
        // Period-6 stripes survive decimation by 2 and keep the full-scale
        // inter-edge gaps under the scan abort distance.
        let img = bar_image(400, 400, 80, 320, 80, 320, 6);
        let coarse = scaled.locate(&img);
        let fine = full.locate(&img);
        assert!(!coarse.is_empty());
        assert!(!fine.is_empty());
        let (c, f) = (&coarse[0], &fine[0]);
        assert!((c.first_edge.x - f.first_edge.x).abs() <= 4);
        assert!((c.last_edge.x - f.last_edge.x).abs() <= 4);
    }

    #[test]
    fn options_are_validated() {
        let bad_scale = LocatorOptions {
            scale: 4,
            ..Default::default()
        };
        assert!(matches!(
            Locator::new(bad_scale),
            Err(Error::InvalidOptions(_))
        ));
        let bad_bins = LocatorOptions {
            n_orientations: 0,
            ..Default::default()
        };
        assert!(matches!(
            Locator::new(bad_bins),
            Err(Error::InvalidOptions(_))
        ));
    }
}
