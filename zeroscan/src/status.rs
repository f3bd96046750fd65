//! Scan progress reporting through an in-process observable snapshot

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use getset::CopyGetters;
use serde::Serialize;
use tokio::sync::watch;

use crate::primitives::ScanRequest;

/// Snapshots older than this are stale. A consumer finding a stale snapshot must fall back to
/// whatever in-process status it maintains independently.
pub const STATUS_STALE_AFTER: Duration = Duration::from_secs(30);

/// Stage of the active scan run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ScanPhase {
    /// No scan has run yet.
    Idle,
    /// Walking the block range for zero-prefixed transaction ids.
    Collecting,
    /// Resolving candidate transaction detail. Carries the percent of candidates processed.
    Classifying { percent: f64 },
    /// The run finished.
    Completed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "idle"),
            ScanPhase::Collecting => write!(f, "phase1"),
            ScanPhase::Classifying { percent } => {
                write!(f, "phase2 ({percent:.1}% of transactions)")
            }
            ScanPhase::Completed => write!(f, "completed"),
        }
    }
}

/// Progress snapshot for the active scan run.
///
/// Overwritten in place on every update, never appended. Readers always see the latest value.
#[derive(Debug, Clone, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct ScanProgress {
    current_block: u64,
    start_block: u64,
    total_blocks: u64,
    blocks_processed: u64,
    /// Percent of the block range processed, capped at 100.
    progress: f64,
    phase: ScanPhase,
    timestamp: SystemTime,
}

impl ScanProgress {
    fn idle() -> Self {
        ScanProgress {
            current_block: 0,
            start_block: 0,
            total_blocks: 0,
            blocks_processed: 0,
            progress: 0.0,
            phase: ScanPhase::Idle,
            timestamp: SystemTime::now(),
        }
    }

    /// Whether the snapshot has outlived the freshness window.
    pub fn is_stale(&self) -> bool {
        SystemTime::now()
            .duration_since(self.timestamp)
            .map(|age| age > STATUS_STALE_AFTER)
            .unwrap_or(false)
    }

    #[cfg(test)]
    fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | block {} | {}/{} blocks ({:.1}%)",
            self.phase, self.current_block, self.blocks_processed, self.total_blocks, self.progress
        )
    }
}

/// Single-writer handle publishing [`ScanProgress`] snapshots through a watch cell.
///
/// The active pipeline run is the only writer; any number of readers subscribe or poll. Updates
/// are best-effort latest-wins, a reader that misses an intermediate snapshot sees the next one.
#[derive(Clone)]
pub struct StatusPublisher {
    sender: Arc<watch::Sender<ScanProgress>>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(ScanProgress::idle());
        StatusPublisher {
            sender: Arc::new(sender),
        }
    }

    /// Watch subscription delivering every snapshot that is current when the reader looks.
    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.sender.subscribe()
    }

    /// Latest published snapshot.
    pub fn latest(&self) -> ScanProgress {
        self.sender.borrow().clone()
    }

    pub(crate) fn start_new(&self, request: &ScanRequest) {
        self.publish(
            request.start_block(),
            request,
            0,
            ScanPhase::Collecting,
        );
    }

    pub(crate) fn update_collecting(
        &self,
        request: &ScanRequest,
        current_block: u64,
        blocks_processed: u64,
    ) {
        self.publish(current_block, request, blocks_processed, ScanPhase::Collecting);
    }

    pub(crate) fn update_classifying(&self, request: &ScanRequest, percent: f64) {
        self.publish(
            request.end_block(),
            request,
            request.total_blocks(),
            ScanPhase::Classifying { percent },
        );
    }

    pub(crate) fn finish(&self, request: &ScanRequest) {
        self.publish(
            request.end_block(),
            request,
            request.total_blocks(),
            ScanPhase::Completed,
        );
    }

    fn publish(
        &self,
        current_block: u64,
        request: &ScanRequest,
        blocks_processed: u64,
        phase: ScanPhase,
    ) {
        let total_blocks = request.total_blocks();
        let progress = if total_blocks == 0 {
            0.0
        } else {
            (blocks_processed as f64 * 100.0 / total_blocks as f64).min(100.0)
        };
        self.sender.send_replace(ScanProgress {
            current_block,
            start_block: request.start_block(),
            total_blocks,
            blocks_processed,
            progress,
            phase,
            timestamp: SystemTime::now(),
        });
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::JobId;

    fn request() -> ScanRequest {
        ScanRequest::from_parts(JobId(1), "status".to_string(), 100, 199, 10, 2, 1, false, false)
            .unwrap()
    }

    #[test]
    fn progress_stays_within_bounds_and_grows_monotonically() {
        let publisher = StatusPublisher::new();
        let request = request();

        publisher.start_new(&request);
        let mut previous = publisher.latest();
        assert_eq!(previous.progress(), 0.0);
        assert_eq!(previous.phase(), ScanPhase::Collecting);

        for processed in [10, 40, 70, 100] {
            publisher.update_collecting(&request, 100 + processed - 1, processed);
            let snapshot = publisher.latest();
            assert!(snapshot.progress() >= previous.progress());
            assert!(snapshot.blocks_processed() >= previous.blocks_processed());
            assert!((0.0..=100.0).contains(&snapshot.progress()));
            previous = snapshot;
        }

        publisher.update_classifying(&request, 50.0);
        let classifying = publisher.latest();
        assert_eq!(classifying.progress(), 100.0);
        assert_eq!(
            classifying.phase().to_string(),
            "phase2 (50.0% of transactions)"
        );

        publisher.finish(&request);
        assert_eq!(publisher.latest().phase(), ScanPhase::Completed);
    }

    #[test]
    fn overflowing_block_count_is_capped_at_one_hundred_percent() {
        let publisher = StatusPublisher::new();
        let request = request();
        publisher.update_collecting(&request, 400, 400);
        assert_eq!(publisher.latest().progress(), 100.0);
    }

    #[test]
    fn snapshots_expire_after_the_freshness_window() {
        let publisher = StatusPublisher::new();
        publisher.start_new(&request());

        let fresh = publisher.latest();
        assert!(!fresh.is_stale());

        let old = fresh
            .clone()
            .with_timestamp(SystemTime::now() - (STATUS_STALE_AFTER + Duration::from_secs(1)));
        assert!(old.is_stale());

        // a snapshot from a skewed clock reads as not yet stale
        let future = fresh.with_timestamp(SystemTime::now() + Duration::from_secs(600));
        assert!(!future.is_stale());
    }

    #[test]
    fn snapshot_renders_a_one_line_status() {
        let publisher = StatusPublisher::new();
        let request = request();
        publisher.update_collecting(&request, 149, 50);
        assert_eq!(
            publisher.latest().to_string(),
            "phase1 | block 149 | 50/100 blocks (50.0%)"
        );
    }
}
