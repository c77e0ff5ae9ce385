/// Sliding-window send quota
///
/// This module answers "how many sends happened in the last N hours":
/// - every recipient of a successful send is recorded with its timestamp
/// - the count covers the trailing window, both edges included
/// - entries older than the window are pruned on the write path

pub mod clock;
pub mod tracker;

pub use clock::{Clock, ManualClock, SystemClock};
pub use tracker::{QuotaTracker, WindowCounter};
