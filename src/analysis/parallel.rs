//! Partition-then-merge aggregation for large inputs.
//!
//! Each shard is a contiguous slice of the input aggregated on a blocking
//! worker. Partials keep exact sums and are merged in shard order, so both
//! the totals and the first-seen category order equal those of sequential
//! aggregation.

use super::aggregator::{aggregate_from, PartialTotals, YearlyTotals};
use crate::models::Transaction;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::debug;

/// Aggregate `transactions` split across `shards` blocking tasks.
pub async fn aggregate_sharded(
    transactions: Arc<[Transaction]>,
    shards: usize,
    date_format: &str,
) -> Result<YearlyTotals> {
    let len = transactions.len();
    let shards = shards.clamp(1, len.max(1));
    let chunk_size = len.div_ceil(shards).max(1);

    debug!("Aggregating {} records in {} shards of up to {}", len, shards, chunk_size);

    let handles = (0..len).step_by(chunk_size).map(|start| {
        let end = (start + chunk_size).min(len);
        let transactions = Arc::clone(&transactions);
        let date_format = date_format.to_string();

        tokio::task::spawn_blocking(move || {
            aggregate_from(start, &transactions[start..end], &date_format)
        })
    });

    let partials = try_join_all(handles)
        .await
        .context("Aggregation worker panicked")?;

    let mut merged = PartialTotals::default();
    for partial in partials {
        merged = merged.merge(partial?)?;
    }

    Ok(merged.finish()?)
}
