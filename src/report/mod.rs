//! Table export.

pub mod generator;

pub use generator::*;
