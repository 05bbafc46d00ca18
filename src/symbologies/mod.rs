//! Concrete symbology implementations

pub mod upca;

pub use upca::{Upca, UpcaOptions};
