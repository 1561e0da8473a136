//! Analysis modules.
//!
//! Grouping and averaging of the combined run table.

pub mod aggregator;

pub use aggregator::*;
