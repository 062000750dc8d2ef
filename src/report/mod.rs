//! Human-readable report output.

pub mod generator;

pub use generator::*;
