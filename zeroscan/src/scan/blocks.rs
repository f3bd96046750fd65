//! Collection stage: walk the block range in chunks and gather zero-prefixed transaction ids

use std::cmp;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::client::{self, FetchRequest};
use crate::error::ScanError;
use crate::primitives::{ScanRequest, ScanStats, ZeroCandidate};
use crate::scan::leading_zeros;
use crate::status::StatusPublisher;

/// Walks the block range in chunks of the request's batch size and returns every transaction id
/// carrying at least `min_zeros` leading zeros, in block order.
///
/// Each chunk costs two dependent batched rounds: heights to block hashes, then hashes to block
/// detail. Blocks that fail to resolve, or resolve without a transaction list, are skipped and
/// excluded from the counts. The transaction at index 0 of a block's list is the coinbase.
pub(crate) async fn collect_zero_candidates(
    fetch_request_sender: &UnboundedSender<FetchRequest>,
    request: &ScanRequest,
    status: &StatusPublisher,
    stats: &mut ScanStats,
) -> Result<Vec<ZeroCandidate>, ScanError> {
    let mut candidates = Vec::new();
    let start = request.start_block();
    let end = request.end_block();

    let mut chunk_start = start;
    loop {
        let chunk_end = cmp::min(chunk_start.saturating_add(request.batch_size() - 1), end);

        let hashes =
            client::get_block_hashes(fetch_request_sender, chunk_start..=chunk_end).await?;
        // keep each height paired with its hash so unresolved heights cannot shift alignment
        let resolved: Vec<(u64, String)> = hashes
            .into_iter()
            .enumerate()
            .filter_map(|(offset, hash)| hash.map(|hash| (chunk_start + offset as u64, hash)))
            .collect();

        let block_hashes = resolved.iter().map(|(_, hash)| hash.clone()).collect();
        let block_details = client::get_blocks(fetch_request_sender, block_hashes).await?;

        for ((height, _), detail) in resolved.into_iter().zip(block_details) {
            let Some(detail) = detail else { continue };
            let Some(txids) = detail.tx else { continue };

            stats.record_block(txids.len() as u64);
            for (index, txid) in txids.iter().enumerate() {
                let zeros = leading_zeros(txid);
                if zeros >= request.min_zeros() {
                    stats.record_zero_prefix(zeros);
                    candidates.push(ZeroCandidate::from_parts(
                        height,
                        txid.clone(),
                        zeros,
                        index == 0,
                    ));
                }
            }
        }

        status.update_collecting(request, chunk_end, chunk_end - start + 1);
        debug!(
            chunk_start,
            chunk_end,
            candidates = candidates.len(),
            "processed block chunk"
        );

        if chunk_end == end {
            break;
        }
        chunk_start = chunk_end + 1;
    }

    Ok(candidates)
}
