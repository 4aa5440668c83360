//! Reporting: terminal tables and plot-ready point collections.
//!
//! Formatting lives here so the processing, fitting and synthesis code stays
//! free of presentation concerns.

pub mod format;
pub mod plot;

pub use format::*;
pub use plot::*;
