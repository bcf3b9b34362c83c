//! Job value object and the caller-side handle to its outcome.

use std::time::Instant;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::JobError;

/// One unit of submitted work. Owned by the queue until assigned to a slot,
/// then by that slot until completion; only the handle outlives it.
pub(crate) struct Job<T, U> {
    pub id: Uuid,
    pub payload: T,
    pub created_at: Instant,
    /// Fires with the slot index when the job is assigned.
    pub started: oneshot::Sender<usize>,
    /// Settles the job exactly once.
    pub reply: oneshot::Sender<Result<U, JobError>>,
}

impl<T, U> Job<T, U> {
    pub(crate) fn new(payload: T) -> (Self, JobHandle<U>) {
        let id = Uuid::new_v4();
        let (started_tx, started_rx) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();

        let job = Self {
            id,
            payload,
            created_at: Instant::now(),
            started: started_tx,
            reply: reply_tx,
        };
        let handle = JobHandle {
            id,
            started: started_rx,
            result: reply_rx,
        };
        (job, handle)
    }
}

/// Caller-side handle to a submitted job.
///
/// `started` is a progress notification: it resolves with the slot index once
/// the job is assigned, or `None` if the job settles without ever starting
/// (forced shutdown, open failure). `result` resolves with the outcome.
pub struct JobHandle<U> {
    id: Uuid,
    started: oneshot::Receiver<usize>,
    result: oneshot::Receiver<Result<U, JobError>>,
}

impl<U> JobHandle<U> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait until the job is assigned a slot. `None` if it never starts.
    pub async fn started(&mut self) -> Option<usize> {
        (&mut self.started).await.ok()
    }

    /// Wait for the job to settle.
    pub async fn result(self) -> Result<U, JobError> {
        match self.result.await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobError::PoolShutDown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_settles_with_result() {
        let (job, handle) = Job::<&str, u32>::new("payload");
        job.reply.send(Ok(9)).unwrap();
        assert_eq!(handle.result().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn handle_sees_started_then_result() {
        let (job, mut handle) = Job::<(), u32>::new(());
        job.started.send(3).unwrap();
        job.reply.send(Err(JobError::Failed("nope".into()))).unwrap();

        assert_eq!(handle.started().await, Some(3));
        assert_eq!(
            handle.result().await,
            Err(JobError::Failed("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn dropped_job_reports_pool_shut_down() {
        let (job, handle) = Job::<(), u32>::new(());
        drop(job);
        assert_eq!(handle.result().await, Err(JobError::PoolShutDown));
    }
}
