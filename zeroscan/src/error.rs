//! Top level error module for the crate

/// Errors associated with requesting data through the fetcher
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The fetch request channel closed before the request could be sent.
    #[error("fetch request channel closed before the request was sent")]
    RequestChannelClosed,
    /// The fetcher dropped the reply channel without answering.
    #[error("fetch response channel closed before a response arrived")]
    ResponseChannelClosed,
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client. {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors that abort a scan run.
///
/// Degraded transport results are not errors, they surface as skipped units. A run only fails
/// when its connection to the fetcher is gone.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Errors associated with the fetcher connection
    #[error("Client error. {0}")]
    Client(#[from] ClientError),
}

/// Validation errors for scan request parameters.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid block range. start {start} is above end {end}")]
    InvalidRange { start: u64, end: u64 },
    #[error("batch size must be greater than zero")]
    InvalidBatchSize,
}

/// Errors raised by the job queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The job channel closed, the queue can no longer accept work.
    #[error("job channel closed, the queue can no longer accept work")]
    ChannelClosed,
}
