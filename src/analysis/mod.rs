//! Analysis modules.
//!
//! The aggregator holds the pure stages; the pipeline drives them over the
//! configured sources and persists the result.

pub mod aggregator;
pub mod pipeline;

pub use aggregator::*;
pub use pipeline::*;
