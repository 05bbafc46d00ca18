//! Error types and result handling
//!
//! This module provides error types used throughout the library:
//! - [`Error`] - The main error type
//! - [`Result`] - Type alias for `Result<T, Error>`
//!
//! Only contract violations by the caller are reported through [`Error`].
//! A scan that finds nothing and a decode attempt that fails are ordinary
//! outcomes, returned through the normal value channel.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The input image has zero width or height.
    EmptyImage,
    /// An option value is outside its documented range.
    InvalidOptions(&'static str),
    /// A symbology with the same name is already registered.
    AlreadyRegistered(String),
    /// The prior vectors and conditional matrices given to the path solver
    /// do not agree in shape.
    Inconsistent,
    /// The requested final state does not exist in the last layer.
    InvalidFinalState,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyImage => write!(f, "input image is empty"),
            Self::InvalidOptions(what) => write!(f, "invalid option: {what}"),
            Self::AlreadyRegistered(name) => {
                write!(f, "a decoder for symbology {name:?} is already registered")
            }
            Self::Inconsistent => write!(f, "prior and conditional shapes are inconsistent"),
            Self::InvalidFinalState => write!(f, "final state is out of range"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;
