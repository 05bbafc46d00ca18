//! Gradient extraction: subsampling, separable Scharr, polar lookup
//!
//! The locator does not need exact gradients, it needs cheap ones: an
//! optional power-of-two decimation (no prefilter; the speed/quality trade
//! is deliberate), a separable 3x3 Scharr operator whose intermediate is
//! stored transposed to keep the second pass cache-friendly, and a polar
//! conversion done entirely through two 511x511 lookup tables indexed by
//! `(d_i + 255, d_j + 255)`.

use crate::matrix::Matrix;

const MAX_GRAD: i32 = 255;
const LUT_SIZE: usize = (2 * MAX_GRAD + 1) as usize;

/// Gradient planes of the working-scale image, refreshed per locate pass.
///
/// Orientation values are quantized signed bins in `0..2n`; bins `o` and
/// `o + n` are the two polarities of the same undirected angle. The value
/// `2n` marks pixels whose gradient magnitude is at or below threshold.
pub struct GradientField {
    n_orientations: usize,
    scale: u32,
    rows: usize,
    cols: usize,
    scaled: Matrix<u8>,
    mag: Matrix<u8>,
    ang: Matrix<u8>,
    di: Matrix<i32>,
    dj: Matrix<i32>,
    // Transposed intermediates of the separable pass.
    tmp_diff: Matrix<i32>,
    tmp_smooth: Matrix<i32>,
    magnitude_lut: Matrix<u8>,
    orientation_lut: Matrix<u8>,
}

impl GradientField {
    pub fn new(grad_thresh: u8, n_orientations: usize, scale: u32) -> Self {
        let (magnitude_lut, orientation_lut) = build_polar_luts(grad_thresh, n_orientations);
        GradientField {
            n_orientations,
            scale,
            rows: 0,
            cols: 0,
            scaled: Matrix::new(0, 0),
            mag: Matrix::new(0, 0),
            ang: Matrix::new(0, 0),
            di: Matrix::new(0, 0),
            dj: Matrix::new(0, 0),
            tmp_diff: Matrix::new(0, 0),
            tmp_smooth: Matrix::new(0, 0),
            magnitude_lut,
            orientation_lut,
        }
    }

    /// Sentinel orientation value for below-threshold pixels.
    pub fn no_edge_bin(&self) -> u8 {
        (2 * self.n_orientations) as u8
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn magnitudes(&self) -> &Matrix<u8> {
        &self.mag
    }

    pub fn orientations(&self) -> &Matrix<u8> {
        &self.ang
    }

    /// Recompute all planes for the current image contents.
    pub fn update(&mut self, image: &Matrix<u8>) {
        let rows = image.rows() >> self.scale;
        let cols = image.cols() >> self.scale;
        if rows != self.rows || cols != self.cols {
            self.rows = rows;
            self.cols = cols;
            self.mag.reset(rows, cols);
            self.ang.reset(rows, cols);
            self.di.reset(rows, cols);
            self.dj.reset(rows, cols);
            self.tmp_diff.reset(cols, rows);
            self.tmp_smooth.reset(cols, rows);
            if self.scale > 0 {
                self.scaled.reset(rows, cols);
            }
        }
        if self.scale > 0 {
            subsample(image, &mut self.scaled, self.scale);
            // Borrow split: gradients read `scaled`, write the rest.
            let scaled = std::mem::replace(&mut self.scaled, Matrix::new(0, 0));
            self.scharr(&scaled);
            self.scaled = scaled;
        } else {
            self.scharr(image);
        }
        self.polar();
    }

    /// Separable Scharr: [1, 0, -1] differentiation and [3, 10, 3]
    /// smoothing, normalized by 16. The first pass writes transposed.
    fn scharr(&mut self, img: &Matrix<u8>) {
        let (m, n) = (self.rows, self.cols);
        self.di.fill(0);
        self.dj.fill(0);
        if m < 5 || n < 5 {
            return;
        }
        for i in 0..m {
            let row = img.row(i);
            for j in 1..n - 1 {
                let (a, b, c) = (row[j - 1] as i32, row[j] as i32, row[j + 1] as i32);
                *self.tmp_diff.at_mut(j, i) = a - c;
                *self.tmp_smooth.at_mut(j, i) = 3 * a + 10 * b + 3 * c;
            }
        }
        for j in 1..n - 1 {
            let diff = self.tmp_diff.row(j);
            let smooth = self.tmp_smooth.row(j);
            for i in 2..m - 2 {
                // d_j: horizontal difference, vertically smoothed.
                self.dj.row_mut(i)[j] = (3 * diff[i - 1] + 10 * diff[i] + 3 * diff[i + 1]) / 16;
                // d_i: vertical difference of the horizontally smoothed image.
                self.di.row_mut(i)[j] = (smooth[i - 1] - smooth[i + 1]) / 16;
            }
        }
        // Two border rows and columns on each side never receive a full
        // stencil; keep them at zero.
        for i in [0, 1, m - 2, m - 1] {
            self.di.row_mut(i).fill(0);
            self.dj.row_mut(i).fill(0);
        }
        for i in 0..m {
            for j in [0, 1, n - 2, n - 1] {
                self.di.row_mut(i)[j] = 0;
                self.dj.row_mut(i)[j] = 0;
            }
        }
    }

    fn polar(&mut self) {
        for i in 0..self.rows {
            let di_row = self.di.row(i);
            let dj_row = self.dj.row(i);
            for j in 0..self.cols {
                let y = (di_row[j] + MAX_GRAD) as usize;
                let x = (dj_row[j] + MAX_GRAD) as usize;
                self.mag.row_mut(i)[j] = *self.magnitude_lut.at(y, x);
                self.ang.row_mut(i)[j] = *self.orientation_lut.at(y, x);
            }
        }
    }
}

/// Strided decimation by `1 << scale`, no prefilter.
fn subsample(input: &Matrix<u8>, output: &mut Matrix<u8>, scale: u32) {
    debug_assert!(scale > 0);
    let step = 1usize << scale;
    for i in 0..output.rows() {
        let src = input.row(i * step);
        let dst = output.row_mut(i);
        for (j, d) in dst.iter_mut().enumerate() {
            *d = src[j * step];
        }
    }
}

/// Magnitude and quantized-orientation tables over all `(d_i, d_j)` pairs.
fn build_polar_luts(grad_thresh: u8, n_orientations: usize) -> (Matrix<u8>, Matrix<u8>) {
    let bins = (2 * n_orientations) as u32;
    let d_theta = 2.0 * std::f64::consts::PI / bins as f64;
    let thresh2 = (grad_thresh as u32) * (grad_thresh as u32);
    let mut magnitude = Matrix::<u8>::new(LUT_SIZE, LUT_SIZE);
    let mut orientation = Matrix::<u8>::new(LUT_SIZE, LUT_SIZE);
    for di in -MAX_GRAD..=MAX_GRAD {
        for dj in -MAX_GRAD..=MAX_GRAD {
            let y = (di + MAX_GRAD) as usize;
            let x = (dj + MAX_GRAD) as usize;
            let mag2 = (di * di + dj * dj) as u32;
            let mag = if mag2 > thresh2 {
                // sqrt of the halved square always fits 8 bits.
                ((mag2 >> 1) as f64).sqrt() as u8
            } else {
                0
            };
            *magnitude.at_mut(y, x) = mag;
            *orientation.at_mut(y, x) = if mag != 0 {
                // Quantize the upper half-plane and mirror the lower one,
                // so (d_i, d_j) and (-d_i, -d_j) always land exactly n bins
                // apart even when the angle sits on a bin boundary.
                if di > 0 || (di == 0 && dj > 0) {
                    let angle = (di as f64).atan2(dj as f64);
                    ((angle / d_theta + 0.5 + bins as f64) as u32 % bins) as u8
                } else {
                    let angle = (-di as f64).atan2(-dj as f64);
                    let mirrored = (angle / d_theta + 0.5 + bins as f64) as u32 % bins;
                    ((mirrored + bins / 2) % bins) as u8
                }
            } else {
                bins as u8
            };
        }
    }
    (magnitude, orientation)
}

#[cfg(test)]
mod tests {
    use super::*;

    const N_ORIENT: usize = 18;

    fn step_image(rows: usize, cols: usize, split: usize) -> Matrix<u8> {
        Matrix::from_fn(rows, cols, |_, j| if j < split { 0 } else { 200 })
    }

    #[test]
    fn flat_image_has_no_edges() {
        let mut field = GradientField::new(20, N_ORIENT, 0);
        field.update(&Matrix::from_fn(32, 32, |_, _| 128));
        let sentinel = field.no_edge_bin();
        for i in 0..field.rows() {
            assert!(field.magnitudes().row(i).iter().all(|&m| m == 0));
            assert!(field.orientations().row(i).iter().all(|&o| o == sentinel));
        }
    }

    #[test]
    fn vertical_step_yields_horizontal_gradient() {
        let mut field = GradientField::new(20, N_ORIENT, 0);
        field.update(&step_image(32, 32, 16));
        // Pixels adjacent to the step must be above threshold and vote the
        // horizontal orientation family (bin 0 mod n, either polarity).
        let mut found = 0;
        for i in 4..28 {
            for j in 14..18 {
                let mag = field.magnitudes().row(i)[j];
                if mag > 0 {
                    found += 1;
                    let bin = field.orientations().row(i)[j] as usize;
                    assert_eq!(bin % N_ORIENT, 0, "bin {bin} at ({i},{j})");
                }
            }
        }
        assert!(found > 20);
    }

    #[test]
    fn borders_are_zeroed() {
        let mut field = GradientField::new(20, N_ORIENT, 0);
        field.update(&step_image(16, 16, 8));
        for i in [0, 1, 14, 15] {
            assert!(field.magnitudes().row(i).iter().all(|&m| m == 0));
        }
        for i in 0..16 {
            for j in [0, 1, 14, 15] {
                assert_eq!(field.magnitudes().row(i)[j], 0);
            }
        }
    }

    #[test]
    fn subsample_decimates_without_filtering() {
        let img = Matrix::from_fn(16, 16, |i, j| (16 * i + j) as u8);
        let mut field = GradientField::new(20, N_ORIENT, 1);
        field.update(&img);
        assert_eq!(field.rows(), 8);
        assert_eq!(field.cols(), 8);
    }

    #[test]
    fn diagonal_extremes_share_an_undirected_bin() {
        let (_, orientation) = build_polar_luts(20, N_ORIENT);
        let pos = *orientation.at((255 + 255) as usize, (255 + 255) as usize) as usize;
        let neg = *orientation.at(0, 0) as usize;
        assert_eq!(pos % N_ORIENT, neg % N_ORIENT);
        assert_eq!(pos.abs_diff(neg), N_ORIENT);
    }

    #[test]
    fn opposite_gradients_are_opposite_polarities() {
        let (_, orientation) = build_polar_luts(20, N_ORIENT);
        for (di, dj) in [(100, 0), (0, 100), (70, -30), (-55, 255)] {
            let fwd = *orientation.at((di + 255) as usize, (dj + 255) as usize) as usize;
            let rev = *orientation.at((-di + 255) as usize, (-dj + 255) as usize) as usize;
            assert_eq!((fwd + N_ORIENT) % (2 * N_ORIENT), rev, "for ({di},{dj})");
        }
    }

    #[test]
    fn lut_threshold_is_exclusive() {
        let (magnitude, orientation) = build_polar_luts(20, N_ORIENT);
        // d = (20, 0): squared magnitude equals thresh^2, still suppressed.
        assert_eq!(*magnitude.at((20 + 255) as usize, 255), 0);
        assert_eq!(
            *orientation.at((20 + 255) as usize, 255) as usize,
            2 * N_ORIENT
        );
        // One step above the threshold passes.
        assert!(*magnitude.at((21 + 255) as usize, 255) > 0);
    }
}
