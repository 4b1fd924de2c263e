//! # Graft Core Kernel
//!
//! Crate-wide pieces that sit above the plugin system: the top-level
//! [`Error`](error::Error) / [`Result`](error::Result) pair that hosts work
//! with, and shared constants such as the default namespace set.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
