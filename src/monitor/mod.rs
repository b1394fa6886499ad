//! Stream monitoring: change detection, tick scheduling and the poll loop.
//!
//! - Pure start/end transition detection
//! - Wall-clock aligned tick scheduling and quota reset boundaries
//! - The monitor loop orchestrating fetch -> detect -> notify -> persist

pub mod detector;
mod schedule;
mod service;

pub use schedule::{QuotaResetPolicy, seconds_until_next_tick};
pub use service::{MonitorConfig, MonitorService};
