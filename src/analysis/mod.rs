//! Year-over-year analysis.
//!
//! Aggregation of transactions into yearly totals and computation of
//! consecutive-year percentage changes.

pub mod aggregator;
pub mod change;
mod error;
pub mod parallel;

pub use aggregator::*;
pub use change::*;
pub use error::AnalysisError;
pub use parallel::aggregate_sharded;
