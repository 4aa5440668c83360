//! Synthetic test generation.
//!
//! - [`TestSynthesizer`]: raw series of one test from a [`MechanicalTarget`](crate::domain::MechanicalTarget)
//! - [`CircleNoiser`]: noised qf values of a circle group
//! - [`synthesize_group`]: both combined over a pressure schedule
//! - [`to_log_series`]: per-sample device-log rows of a synthetic series

pub mod circles;
pub mod group;
pub mod log;
pub mod schedule;
pub mod shape;
pub mod single;
pub mod soil;

pub use circles::{Attempt, CircleNoiser, retry_bounded, theoretical_qf};
pub use group::{GroupMember, GroupSynthesis, member_target, synthesize_group};
pub use log::{LogRow, to_log_series};
pub use schedule::STANDARD_PRESSURES;
pub use shape::DrawParams;
pub use single::TestSynthesizer;
