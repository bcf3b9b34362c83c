//! Error taxonomy for job settlement and shutdown.

/// Why a submitted job settled with an error instead of a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// The handler's `process` hook returned an error. Delivered only to
    /// this job's caller; the pool keeps running and the slot is freed.
    #[error("job execution failed: {0}")]
    Failed(String),

    /// The job was still queued when `shutdown(false)` discarded the queue.
    #[error("the pool was shut down forcefully before the job started")]
    ForcedShutdown,

    /// The `open` hook failed while this job was queued. The pool rolls back
    /// to closed; a later submit triggers a fresh open attempt.
    #[error("failed to open the shared resource: {0}")]
    OpenFailed(String),

    /// The dispatcher is no longer running.
    #[error("the pool is no longer running")]
    PoolShutDown,
}

/// Why a `shutdown` call settled with an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShutdownError {
    /// The `close` hook failed. The pool still considers the resource
    /// released and ends up closed.
    #[error("failed to close the shared resource: {0}")]
    CloseFailed(String),

    /// The dispatcher was already gone and the pool never reached closed.
    #[error("the pool is no longer running")]
    Terminated,
}
