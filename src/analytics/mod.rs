//! Analytics: summary statistics and weekly trend buckets.

pub mod aggregator;
pub mod types;

pub use aggregator::AnalyticsAggregator;
pub use types::{RunnerSummary, Timeframe, TypeBreakdown, WeeklyBucket};
