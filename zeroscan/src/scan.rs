//! Two stage scan over a block range: collect zero-prefixed transaction ids, then classify them
//! against the special-transaction thresholds

use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

use crate::client::FetchRequest;
use crate::error::ScanError;
use crate::primitives::{ScanRequest, ScanStats, ScanSummary, ScanTiming};
use crate::status::StatusPublisher;

mod blocks;
mod transactions;

/// Number of transaction detail lookups per batched round in the classification stage.
pub(crate) const TRANSACTION_DETAIL_BATCH_SIZE: usize = 100;

/// Runs a full scan for `request` and returns its structured outcome.
///
/// Degraded transport results surface as skipped units and never abort the run; the only hard
/// failure is losing the connection to the fetcher. Requires [`crate::client::fetch::fetch`] to
/// be running concurrently, connected via the `fetch_request` channel.
pub async fn scan(
    fetch_request_sender: UnboundedSender<FetchRequest>,
    status: StatusPublisher,
    request: ScanRequest,
) -> Result<ScanSummary, ScanError> {
    info!(
        job = %request.job_id(),
        name = %request.name(),
        start = request.start_block(),
        end = request.end_block(),
        min_zeros = request.min_zeros(),
        "starting scan"
    );
    status.start_new(&request);
    let started = Instant::now();
    let mut stats = ScanStats::new();

    let candidates =
        blocks::collect_zero_candidates(&fetch_request_sender, &request, &status, &mut stats)
            .await?;
    let collect_elapsed = started.elapsed();
    info!(
        candidates = candidates.len(),
        elapsed_ms = collect_elapsed.as_millis() as u64,
        "collection stage finished"
    );

    let classify_started = Instant::now();
    let (special_transactions, zero_transactions) = if candidates.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        transactions::classify_candidates(
            &fetch_request_sender,
            &request,
            &status,
            &mut stats,
            candidates,
        )
        .await?
    };
    let classify_elapsed = classify_started.elapsed();

    status.finish(&request);
    let timing = ScanTiming::from_parts(
        collect_elapsed,
        classify_elapsed,
        started.elapsed(),
        stats.blocks_analyzed(),
    );
    info!(
        job = %request.job_id(),
        special = special_transactions.len(),
        "scan finished"
    );
    Ok(ScanSummary::from_parts(
        request,
        stats,
        special_transactions,
        zero_transactions,
        timing,
    ))
}

/// Counts the consecutive '0' characters at the start of a transaction id.
pub fn leading_zeros(txid: &str) -> u32 {
    txid.chars().take_while(|character| *character == '0').count() as u32
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::leading_zeros;

    #[test]
    fn counts_the_zero_prefix() {
        assert_eq!(leading_zeros("00ab12"), 2);
        assert_eq!(leading_zeros("1234"), 0);
        assert_eq!(leading_zeros("0000"), 4);
        assert_eq!(leading_zeros("0a0b"), 1);
        assert_eq!(leading_zeros(""), 0);
    }

    proptest! {
        #[test]
        fn count_is_the_maximal_zero_prefix(txid in "[0-9a-f]{0,64}") {
            let count = leading_zeros(&txid) as usize;
            prop_assert!(txid[..count].chars().all(|character| character == '0'));
            if let Some(next) = txid[count..].chars().next() {
                prop_assert_ne!(next, '0');
            }
        }
    }
}
