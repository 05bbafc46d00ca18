//! Image handling
//!
//! The engine consumes dense row-major 8-bit grayscale. Conversion from
//! color or packed formats is the caller's job.

use crate::matrix::Matrix;
use crate::{Error, Result};

/// A grayscale image to scan for barcodes.
#[derive(Debug)]
pub struct GrayImage {
    mat: Matrix<u8>,
}

impl GrayImage {
    /// Create an image from grayscale data, row-major, one byte per pixel.
    pub fn from_gray(data: &[u8], width: u32, height: u32) -> Result<Self> {
        if data.len() as u64 != width as u64 * height as u64 {
            return Err(Error::InvalidOptions("image data length"));
        }
        Ok(GrayImage {
            mat: Matrix::from_vec(height as usize, width as usize, data.to_vec()),
        })
    }

    /// Wrap an already-built matrix of pixels.
    pub fn from_matrix(mat: Matrix<u8>) -> Self {
        GrayImage { mat }
    }

    pub fn width(&self) -> u32 {
        self.mat.cols() as u32
    }

    pub fn height(&self) -> u32 {
        self.mat.rows() as u32
    }

    pub(crate) fn matrix(&self) -> &Matrix<u8> {
        &self.mat
    }
}
