//! Charts for sorting-benchmark and cache-simulation sweep results.
//!
//! Every command runs the same linear pipeline: discover the input CSV
//! files, validate them against a [`schema::Schema`], aggregate and group
//! them, build one figure description per group and let gnuplot render it.

pub mod commands;
pub mod config;
pub mod discovery;
pub mod draw;
pub mod error;
pub mod interpolate;
pub mod pipeline;
pub mod schema;
pub mod table;

pub use error::{Error, Result};
