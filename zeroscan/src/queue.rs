//! Serialised execution of queued scan requests

use std::sync::Arc;
use std::time::Duration;

use getset::{CopyGetters, Getters};
use serde::Serialize;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::client::FetchRequest;
use crate::error::QueueError;
use crate::interface::JobStore;
use crate::primitives::{JobId, JobStatus, QueuedJob, ScanRequest};
use crate::scan;
use crate::status::StatusPublisher;

/// How long an idle worker waits before polling the queue one final time and stopping.
pub const WORKER_IDLE_POLL: Duration = Duration::from_secs(1);

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, Getters, CopyGetters, Serialize)]
pub struct QueueStatus {
    #[getset(get_copy = "pub")]
    queue_length: usize,
    #[getset(get = "pub")]
    pending: Vec<PendingJob>,
    #[getset(get_copy = "pub")]
    worker_running: bool,
}

/// Lightweight listing entry for a job waiting in the queue.
#[derive(Debug, Clone, Getters, CopyGetters, Serialize)]
pub struct PendingJob {
    #[getset(get_copy = "pub")]
    id: JobId,
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    start_block: u64,
    #[getset(get_copy = "pub")]
    end_block: u64,
}

impl From<&ScanRequest> for PendingJob {
    fn from(request: &ScanRequest) -> Self {
        PendingJob {
            id: request.job_id(),
            name: request.name().clone(),
            start_block: request.start_block(),
            end_block: request.end_block(),
        }
    }
}

enum WorkerSlot {
    /// No worker task is alive. Holds the receiving end for the next one to take over.
    Idle(UnboundedReceiver<QueuedJob>),
    Running,
}

struct QueueInner {
    job_sender: UnboundedSender<QueuedJob>,
    worker: WorkerSlot,
}

struct WorkerContext<S> {
    fetch_request_sender: UnboundedSender<FetchRequest>,
    store: Arc<S>,
    progress: StatusPublisher,
    status: watch::Sender<QueueStatus>,
}

/// FIFO queue of scan requests drained by at most one background worker.
///
/// `enqueue` is a non-blocking channel send. The worker runs each scan to completion before
/// looking at the next job, stops once it finds the queue still empty after a short poll, and is
/// restarted by the next enqueue. Queue status is read from a published snapshot, so status
/// queries never contend with the worker.
pub struct JobQueue<S> {
    inner: Arc<Mutex<QueueInner>>,
    context: Arc<WorkerContext<S>>,
}

impl<S> JobQueue<S>
where
    S: JobStore + Send + Sync + 'static,
{
    /// Creates an idle queue. The worker starts on the first enqueue.
    pub fn new(
        fetch_request_sender: UnboundedSender<FetchRequest>,
        store: Arc<S>,
        progress: StatusPublisher,
    ) -> Self {
        let (job_sender, job_receiver) = unbounded_channel();
        let (status_sender, _status_receiver) = watch::channel(QueueStatus::default());
        JobQueue {
            inner: Arc::new(Mutex::new(QueueInner {
                job_sender,
                worker: WorkerSlot::Idle(job_receiver),
            })),
            context: Arc::new(WorkerContext {
                fetch_request_sender,
                store,
                progress,
                status: status_sender,
            }),
        }
    }

    /// Appends a request to the queue tail, marks its external record queued and makes sure a
    /// worker is alive to drain it.
    pub async fn enqueue(&self, request: ScanRequest) -> Result<JobId, QueueError> {
        let job_id = request.job_id();
        if let Err(store_error) = self.context.store.update_status(job_id, JobStatus::Queued) {
            warn!(job = %job_id, ?store_error, "failed to mark job queued in the job store");
        }
        self.context.status.send_modify(|status| {
            status.pending.push(PendingJob::from(&request));
            status.queue_length = status.pending.len();
        });

        let mut inner = self.inner.lock().await;
        inner
            .job_sender
            .send(QueuedJob::new(request))
            .map_err(|_| QueueError::ChannelClosed)?;
        match std::mem::replace(&mut inner.worker, WorkerSlot::Running) {
            WorkerSlot::Running => {}
            WorkerSlot::Idle(receiver) => {
                self.context
                    .status
                    .send_modify(|status| status.worker_running = true);
                info!("queue worker starting");
                tokio::spawn(run_worker(
                    receiver,
                    Arc::clone(&self.inner),
                    Arc::clone(&self.context),
                ));
            }
        }
        Ok(job_id)
    }

    /// Current queue snapshot: length, pending listing and worker liveness.
    pub fn queue_status(&self) -> QueueStatus {
        self.context.status.borrow().clone()
    }

    /// Watch subscription to queue snapshots.
    pub fn subscribe_status(&self) -> watch::Receiver<QueueStatus> {
        self.context.status.subscribe()
    }
}

async fn run_worker<S>(
    mut receiver: UnboundedReceiver<QueuedJob>,
    inner: Arc<Mutex<QueueInner>>,
    context: Arc<WorkerContext<S>>,
) where
    S: JobStore + Send + Sync + 'static,
{
    loop {
        match receiver.try_recv() {
            Ok(job) => {
                run_job(&context, job).await;
                continue;
            }
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        sleep(WORKER_IDLE_POLL).await;

        // final check under the queue lock so a racing enqueue cannot be stranded
        let mut inner_guard = inner.lock().await;
        match receiver.try_recv() {
            Ok(job) => {
                drop(inner_guard);
                run_job(&context, job).await;
            }
            Err(TryRecvError::Empty) => {
                context
                    .status
                    .send_modify(|status| status.worker_running = false);
                inner_guard.worker = WorkerSlot::Idle(receiver);
                info!("queue worker stopping, queue is empty");
                return;
            }
            Err(TryRecvError::Disconnected) => break,
        }
    }
    context
        .status
        .send_modify(|status| status.worker_running = false);
}

async fn run_job<S>(context: &WorkerContext<S>, mut job: QueuedJob)
where
    S: JobStore + Send + Sync + 'static,
{
    job.mark_running();
    let request = job.into_request();
    let job_id = request.job_id();
    context.status.send_modify(|status| {
        status.pending.retain(|pending| pending.id() != job_id);
        status.queue_length = status.pending.len();
    });
    if let Err(store_error) = context.store.update_status(job_id, JobStatus::Running) {
        warn!(job = %job_id, ?store_error, "failed to mark job running in the job store");
    }
    info!(job = %job_id, name = %request.name(), "starting queued scan");

    // run the scan in its own task so a panic is caught here instead of killing the worker
    let scan_task = tokio::spawn(scan::scan(
        context.fetch_request_sender.clone(),
        context.progress.clone(),
        request,
    ));
    match scan_task.await {
        Ok(Ok(summary)) => {
            if let Err(store_error) = context.store.record_result(job_id, &summary) {
                error!(job = %job_id, ?store_error, "failed to persist scan result");
            }
            if let Err(store_error) = context.store.update_status(job_id, JobStatus::Completed) {
                warn!(job = %job_id, ?store_error, "failed to mark job completed in the job store");
            }
            info!(
                job = %job_id,
                special = summary.special_transactions().len(),
                "queued scan completed"
            );
        }
        Ok(Err(scan_error)) => {
            error!(job = %job_id, %scan_error, "queued scan failed");
            if let Err(store_error) = context
                .store
                .record_failure(job_id, &scan_error.to_string())
            {
                error!(job = %job_id, ?store_error, "failed to persist scan failure");
            }
        }
        Err(join_error) => {
            error!(job = %job_id, %join_error, "queued scan aborted");
            if let Err(store_error) = context
                .store
                .record_failure(job_id, &format!("scan task aborted: {join_error}"))
            {
                error!(job = %job_id, ?store_error, "failed to persist scan failure");
            }
        }
    }
}
