//! Domain types shared across processing, synthesis, fitting and reporting.

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
