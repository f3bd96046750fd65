//! Module for primitive structs associated with the scan engine

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Opaque job identifier assigned by the caller's persistence layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a job record. Transitions are one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Queued,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Parameters of one scan run. Immutable once constructed.
#[derive(Debug, Clone, Getters, CopyGetters, Serialize, Deserialize)]
pub struct ScanRequest {
    #[getset(get_copy = "pub")]
    job_id: JobId,
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    start_block: u64,
    #[getset(get_copy = "pub")]
    end_block: u64,
    #[getset(get_copy = "pub")]
    batch_size: u64,
    #[getset(get_copy = "pub")]
    min_zeros: u32,
    #[getset(get_copy = "pub")]
    min_inputs: usize,
    #[getset(get_copy = "pub")]
    show_all_zeros: bool,
    #[getset(get_copy = "pub")]
    exclude_coinbase: bool,
}

impl ScanRequest {
    /// Creates a new ScanRequest from parts, validating the block range and batch size.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        job_id: JobId,
        name: String,
        start_block: u64,
        end_block: u64,
        batch_size: u64,
        min_zeros: u32,
        min_inputs: usize,
        show_all_zeros: bool,
        exclude_coinbase: bool,
    ) -> Result<Self, RequestError> {
        if start_block > end_block {
            return Err(RequestError::InvalidRange {
                start: start_block,
                end: end_block,
            });
        }
        if batch_size == 0 {
            return Err(RequestError::InvalidBatchSize);
        }
        Ok(ScanRequest {
            job_id,
            name,
            start_block,
            end_block,
            batch_size,
            min_zeros,
            min_inputs,
            show_all_zeros,
            exclude_coinbase,
        })
    }

    /// Number of blocks covered by the range, end inclusive.
    pub fn total_blocks(&self) -> u64 {
        self.end_block - self.start_block + 1
    }
}

/// A zero-prefixed transaction id found during collection, awaiting classification.
///
/// Owned exclusively by the run that produced it and discarded once classified.
#[derive(Debug, Clone, CopyGetters)]
pub struct ZeroCandidate {
    #[getset(get_copy = "pub")]
    block_height: u64,
    #[getset(skip)]
    txid: String,
    #[getset(get_copy = "pub")]
    leading_zeros: u32,
    #[getset(get_copy = "pub")]
    coinbase: bool,
}

impl ZeroCandidate {
    /// Creates a new ZeroCandidate from parts.
    pub fn from_parts(block_height: u64, txid: String, leading_zeros: u32, coinbase: bool) -> Self {
        ZeroCandidate {
            block_height,
            txid,
            leading_zeros,
            coinbase,
        }
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }
}

/// A candidate enriched with resolved transaction detail.
#[derive(Debug, Clone, CopyGetters, Serialize)]
pub struct SpecialTransaction {
    #[getset(get_copy = "pub")]
    block_height: u64,
    #[getset(skip)]
    txid: String,
    #[getset(get_copy = "pub")]
    leading_zeros: u32,
    #[getset(get_copy = "pub")]
    inputs: usize,
    #[getset(get_copy = "pub")]
    outputs: usize,
    #[getset(get_copy = "pub")]
    coinbase: bool,
}

impl SpecialTransaction {
    pub(crate) fn from_candidate(candidate: &ZeroCandidate, inputs: usize, outputs: usize) -> Self {
        SpecialTransaction {
            block_height: candidate.block_height(),
            txid: candidate.txid().to_string(),
            leading_zeros: candidate.leading_zeros(),
            inputs,
            outputs,
            coinbase: candidate.coinbase(),
        }
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }
}

/// Aggregate counters for one scan run. Reset at the start of each run, monotonic within it.
#[derive(Debug, Clone, Default, Getters, CopyGetters, Serialize)]
pub struct ScanStats {
    #[getset(get_copy = "pub")]
    blocks_analyzed: u64,
    #[getset(get_copy = "pub")]
    transactions_analyzed: u64,
    #[getset(get_copy = "pub")]
    coinbase_transactions: u64,
    #[getset(get_copy = "pub")]
    multi_input_transactions: u64,
    /// Occurrences keyed by leading-zero count.
    #[getset(get = "pub")]
    transactions_with_zeros: BTreeMap<u32, u64>,
    #[getset(get_copy = "pub")]
    special_transactions: u64,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_block(&mut self, transaction_count: u64) {
        self.blocks_analyzed += 1;
        self.transactions_analyzed += transaction_count;
    }

    pub(crate) fn record_zero_prefix(&mut self, leading_zeros: u32) {
        *self.transactions_with_zeros.entry(leading_zeros).or_insert(0) += 1;
    }

    pub(crate) fn record_coinbase(&mut self) {
        self.coinbase_transactions += 1;
    }

    pub(crate) fn record_multi_input(&mut self) {
        self.multi_input_transactions += 1;
    }

    pub(crate) fn record_special(&mut self) {
        self.special_transactions += 1;
    }

    /// Total transactions that carried the minimum zero prefix, across all zero counts.
    pub fn zero_prefix_total(&self) -> u64 {
        self.transactions_with_zeros.values().sum()
    }
}

/// Wall-clock figures for one scan run, in seconds.
#[derive(Debug, Clone, Copy, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct ScanTiming {
    collect_seconds: f64,
    classify_seconds: f64,
    elapsed_seconds: f64,
    blocks_per_second: f64,
}

impl ScanTiming {
    pub(crate) fn from_parts(
        collect: Duration,
        classify: Duration,
        elapsed: Duration,
        blocks_analyzed: u64,
    ) -> Self {
        let elapsed_seconds = elapsed.as_secs_f64();
        let blocks_per_second = if elapsed_seconds > 0.0 {
            blocks_analyzed as f64 / elapsed_seconds
        } else {
            0.0
        };
        ScanTiming {
            collect_seconds: collect.as_secs_f64(),
            classify_seconds: classify.as_secs_f64(),
            elapsed_seconds,
            blocks_per_second,
        }
    }
}

/// Structured outcome of a scan run, handed to the caller's persistence layer.
///
/// [`fmt::Display`] renders the textual summary, [`serde::Serialize`] the structured form.
#[derive(Debug, Clone, Getters, CopyGetters, Serialize)]
pub struct ScanSummary {
    #[getset(get = "pub")]
    request: ScanRequest,
    #[getset(get = "pub")]
    stats: ScanStats,
    #[getset(get = "pub")]
    special_transactions: Vec<SpecialTransaction>,
    /// Every zero-prefixed transaction, kept only when the request asked for it.
    #[getset(get = "pub")]
    zero_transactions: Vec<SpecialTransaction>,
    #[getset(get_copy = "pub")]
    timing: ScanTiming,
}

impl ScanSummary {
    pub(crate) fn from_parts(
        request: ScanRequest,
        stats: ScanStats,
        special_transactions: Vec<SpecialTransaction>,
        zero_transactions: Vec<SpecialTransaction>,
        timing: ScanTiming,
    ) -> Self {
        ScanSummary {
            request,
            stats,
            special_transactions,
            zero_transactions,
            timing,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== ANALYSIS SUMMARY ===")?;
        writeln!(f, "Blocks analyzed: {}", self.stats.blocks_analyzed())?;
        writeln!(
            f,
            "Transactions analyzed: {}",
            self.stats.transactions_analyzed()
        )?;
        writeln!(
            f,
            "Coinbase transactions: {}",
            self.stats.coinbase_transactions()
        )?;
        writeln!(
            f,
            "Multi-input transactions: {}",
            self.stats.multi_input_transactions()
        )?;
        writeln!(
            f,
            "Transactions with {}+ leading zeros: {}",
            self.request.min_zeros(),
            self.stats.zero_prefix_total()
        )?;
        for (zeros, count) in self.stats.transactions_with_zeros() {
            writeln!(f, "  {zeros} leading zeros: {count} transactions")?;
        }
        writeln!(
            f,
            "SPECIAL transactions ({}+ zeros, {}+ inputs{}): {}",
            self.request.min_zeros(),
            self.request.min_inputs(),
            if self.request.exclude_coinbase() {
                ", non-coinbase"
            } else {
                ""
            },
            self.stats.special_transactions()
        )?;
        if !self.special_transactions.is_empty() {
            writeln!(f, "Special transactions found:")?;
            for transaction in &self.special_transactions {
                writeln!(
                    f,
                    "  Block {}: {} ({} zeros, {} inputs, {} outputs)",
                    transaction.block_height(),
                    transaction.txid(),
                    transaction.leading_zeros(),
                    transaction.inputs(),
                    transaction.outputs()
                )?;
            }
        }
        if !self.zero_transactions.is_empty() {
            writeln!(
                f,
                "All transactions with {}+ leading zeros:",
                self.request.min_zeros()
            )?;
            for transaction in &self.zero_transactions {
                writeln!(
                    f,
                    "  Block {}: {} ({} zeros, {} inputs, {} outputs){}",
                    transaction.block_height(),
                    transaction.txid(),
                    transaction.leading_zeros(),
                    transaction.inputs(),
                    transaction.outputs(),
                    if transaction.coinbase() { " (COINBASE)" } else { "" }
                )?;
            }
        }
        writeln!(
            f,
            "Total analysis time: {:.2}s",
            self.timing.elapsed_seconds()
        )?;
        writeln!(f, "Rate: {:.2} blocks/sec", self.timing.blocks_per_second())?;
        write!(
            f,
            "Phase 1 (collection): {:.2}s, Phase 2 (analysis): {:.2}s",
            self.timing.collect_seconds(),
            self.timing.classify_seconds()
        )
    }
}

/// A scan request while it sits in, or transits through, the job queue.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct QueuedJob {
    #[getset(get = "pub")]
    request: ScanRequest,
    #[getset(get_copy = "pub")]
    status: JobStatus,
}

impl QueuedJob {
    pub(crate) fn new(request: ScanRequest) -> Self {
        QueuedJob {
            request,
            status: JobStatus::Queued,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
    }

    pub(crate) fn into_request(self) -> ScanRequest {
        self.request
    }
}
