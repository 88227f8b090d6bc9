//! Traced signal and derived statistics

pub mod statistics;
pub mod traced;

pub use statistics::{Statistics, StatisticsExtractor};
pub use traced::TracedSignal;
