//! Stripecode Barcode Location & Decoding Library
//!
//! A pure Rust library that finds one-dimensional barcodes in noisy,
//! arbitrarily rotated grayscale camera frames and decodes them against
//! registered symbologies (UPC-A ships in the box). Location works by
//! voting over local gradient fields; decoding aligns the symbology's
//! fixed edges to a resampled slice with a dynamic program and reads the
//! digits through matched filters, so both stages tolerate missing or
//! spurious edges.
//!
//! # Quick Start
//!
//! ```no_run
//! use stripecode::{Engine, EngineOptions, GrayImage, Predefined};
//!
//! // Load and convert a frame to grayscale.
//! let frame = image::open("shelf-photo.jpg").unwrap().to_luma8();
//! let (width, height) = frame.dimensions();
//! let img = GrayImage::from_gray(frame.as_raw(), width, height).unwrap();
//!
//! // Create an engine bound to the frame and register UPC-A.
//! let mut engine = Engine::new(&img, EngineOptions::default()).unwrap();
//! engine.add_predefined(Predefined::UpcA).unwrap();
//!
//! // Locate candidates (strongest first), then decode them.
//! for mut candidate in engine.locate() {
//!     if engine.decode(&mut candidate) {
//!         println!("{}: {}", candidate.symbology, candidate.estimate);
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Engine façade: locate + decode
//! - [`image`] - Grayscale input handling
//! - [`barcode`] - Located/decoded barcode records
//! - [`locator`] - Orientation voting and candidate scanning
//! - [`decoder`] - Slice extraction and symbol estimation
//! - [`symbology`] - Symbology structure and capability interface
//! - [`viterbi`] - K-best layered path solver
//! - [`meanshift`] - Kernel density estimation and mode seeking
//! - [`error`] - Error types

pub mod barcode;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod gradient;
pub mod image;
pub mod locator;
pub mod matrix;
pub mod meanshift;
pub mod symbologies;
pub mod symbology;
pub mod viterbi;

pub use barcode::Barcode;
pub use decoder::{DecoderOptions, ReadOutcome};
pub use engine::{Engine, EngineOptions, Predefined};
pub use error::{Error, Result};
pub use image::GrayImage;
pub use locator::LocatorOptions;
pub use symbologies::{Upca, UpcaOptions};
pub use symbology::Symbology;

#[cfg(test)]
mod proptest_viterbi;
