//! Input/output helpers.
//!
//! - JSON read/write of series, targets and circle sets (`json`)
//! - result and log exports (`export`)

pub mod export;
pub mod json;

pub use export::*;
pub use json::*;
