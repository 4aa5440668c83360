//! Mathematical utilities: least squares, polynomial smoothing, interpolation
//! and bounded minimizers.

pub mod grid;
pub mod interp;
pub mod ols;
pub mod optimize;
pub mod poly;

pub use grid::*;
pub use interp::*;
pub use ols::*;
pub use optimize::*;
pub use poly::*;
