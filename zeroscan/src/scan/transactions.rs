//! Classification stage: resolve candidate transaction detail and apply the special thresholds

use std::cmp;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::client::{self, FetchRequest};
use crate::error::ScanError;
use crate::primitives::{ScanRequest, ScanStats, SpecialTransaction, ZeroCandidate};
use crate::scan::TRANSACTION_DETAIL_BATCH_SIZE;
use crate::status::StatusPublisher;

/// Resolves full transaction detail for every candidate, in fixed sub-batches, and splits the
/// survivors into the special list and (when requested) the all-zero list.
///
/// Candidates whose detail fails to resolve are silently dropped from both outputs. The all-zero
/// list ignores the input-count threshold; only the coinbase filter applies to it.
pub(crate) async fn classify_candidates(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
    request: &ScanRequest,
    status: &StatusPublisher,
    stats: &mut ScanStats,
    candidates: Vec<ZeroCandidate>,
) -> Result<(Vec<SpecialTransaction>, Vec<SpecialTransaction>), ScanError> {
    let total = candidates.len();
    let mut special_transactions = Vec::new();
    let mut zero_transactions = Vec::new();

    for (batch_index, batch) in candidates.chunks(TRANSACTION_DETAIL_BATCH_SIZE).enumerate() {
        let txids = batch
            .iter()
            .map(|candidate| candidate.txid().to_string())
            .collect();
        let details = client::get_transaction_details(fetch_request_sender, txids).await?;

        for (candidate, detail) in batch.iter().zip(details) {
            let Some(detail) = detail else { continue };
            let inputs = detail.vin.len();
            let outputs = detail.vout.len();

            if candidate.coinbase() {
                stats.record_coinbase();
            }
            if inputs > 1 && !candidate.coinbase() {
                stats.record_multi_input();
            }

            let coinbase_filter = !request.exclude_coinbase() || !candidate.coinbase();
            if candidate.leading_zeros() >= request.min_zeros()
                && inputs >= request.min_inputs()
                && coinbase_filter
            {
                stats.record_special();
                special_transactions.push(SpecialTransaction::from_candidate(
                    candidate, inputs, outputs,
                ));
            }
            if request.show_all_zeros() && coinbase_filter {
                zero_transactions.push(SpecialTransaction::from_candidate(
                    candidate, inputs, outputs,
                ));
            }
        }

        let processed = cmp::min((batch_index + 1) * TRANSACTION_DETAIL_BATCH_SIZE, total);
        let percent = processed as f64 * 100.0 / total as f64;
        status.update_classifying(request, percent);
        debug!(processed, total, "processed transaction detail batch");
    }

    Ok((special_transactions, zero_transactions))
}
