//! Send statistics
//!
//! Store-backed outcome counters, with failures broken down by provider
//! error code.

pub mod aggregator;
pub mod types;

pub use aggregator::StatsAggregator;
pub use types::EmailStats;
