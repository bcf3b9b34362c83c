//! Pool facade - the single entry point.
//!
//! `Pool` is a cheap handle to the dispatcher task. Observers read shared
//! atomics, so they are pure and never contend with the dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::PoolConfig;
use crate::dispatcher::{Command, Dispatcher};
use crate::error::{JobError, ShutdownError};
use crate::events::{EventBus, PoolEvent};
use crate::handler::Handler;
use crate::job::{Job, JobHandle};
use crate::lifecycle::HandleState;

/// State visible outside the dispatcher task.
pub(crate) struct PoolShared {
    state: AtomicU8,
    queued: AtomicUsize,
    active: AtomicUsize,
    events: EventBus,
}

impl PoolShared {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(HandleState::Closed.as_u8()),
            queued: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            events: EventBus::new(),
        }
    }

    pub(crate) fn state(&self) -> HandleState {
        HandleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: HandleState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn queued_count(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    pub(crate) fn active_count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn job_enqueued(&self) {
        self.queued.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn job_dequeued(&self) {
        self.queued.fetch_sub(1, Ordering::Release);
    }

    pub(crate) fn job_started(&self) {
        self.queued.fetch_sub(1, Ordering::Release);
        self.active.fetch_add(1, Ordering::Release);
    }

    pub(crate) fn job_finished(&self) {
        self.active.fetch_sub(1, Ordering::Release);
    }

    pub(crate) fn emit(&self, event: PoolEvent) {
        self.events.emit(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }
}

/// Bounded-concurrency job pool over a lazily held shared resource.
///
/// Submitting work opens the resource on first demand; the resource closes
/// again after the configured idle timeout or on explicit [`shutdown`].
/// Cloning the pool shares the same dispatcher; the dispatcher drains and
/// stops once every clone is dropped.
///
/// [`shutdown`]: Pool::shutdown
pub struct Pool<H: Handler> {
    commands: mpsc::UnboundedSender<Command<H>>,
    shared: Arc<PoolShared>,
}

impl<H: Handler> Clone for Pool<H> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<H: Handler> Pool<H> {
    /// Start the pool. The dispatcher task runs until every handle is
    /// dropped, then drains remaining work and closes the resource.
    pub fn start(config: PoolConfig, handler: H) -> Self {
        let shared = Arc::new(PoolShared::new());
        let (commands, rx) = mpsc::unbounded_channel();
        Dispatcher::spawn(config, Arc::new(handler), Arc::clone(&shared), rx);
        Self { commands, shared }
    }

    /// Queue one unit of work. Jobs start in submission order, subject only
    /// to slot availability.
    pub fn submit(&self, payload: H::Payload) -> JobHandle<H::Output> {
        let (job, handle) = Job::new(payload);
        self.shared.job_enqueued();
        if let Err(mpsc::error::SendError(cmd)) = self.commands.send(Command::Submit(job)) {
            self.shared.job_dequeued();
            if let Command::Submit(job) = cmd {
                let _ = job.reply.send(Err(JobError::PoolShutDown));
            }
        }
        handle
    }

    /// Close the resource. Graceful shutdown first lets the queue drain and
    /// every running job finish; forceful shutdown fails all queued (not yet
    /// running) jobs immediately, but still lets running jobs finish.
    ///
    /// Settles once the resource has closed. Concurrent calls attach to the
    /// same close transition; the close hook is never invoked twice.
    pub async fn shutdown(&self, graceful: bool) -> Result<(), ShutdownError> {
        let (done, done_rx) = oneshot::channel();
        if self
            .commands
            .send(Command::Shutdown { graceful, done })
            .is_err()
        {
            return if self.shared.state() == HandleState::Closed {
                Ok(())
            } else {
                Err(ShutdownError::Terminated)
            };
        }
        done_rx.await.unwrap_or(Err(ShutdownError::Terminated))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandleState {
        self.shared.state()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state() == HandleState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state() == HandleState::Closed
    }

    /// Whether jobs are waiting in the queue.
    pub fn has_pending_jobs(&self) -> bool {
        self.shared.queued_count() > 0
    }

    /// Whether any slot is currently running a job.
    pub fn has_active_jobs(&self) -> bool {
        self.shared.active_count() > 0
    }

    /// Subscribe to lifecycle events (`Opened`, `Closed`, `Idle`).
    pub fn events(&self) -> broadcast::Receiver<PoolEvent> {
        self.shared.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::IdentityHandler;

    #[tokio::test]
    async fn fresh_pool_is_closed_and_empty() {
        let pool = Pool::start(PoolConfig::default(), IdentityHandler::<u32>::new());
        assert!(pool.is_closed());
        assert!(!pool.is_open());
        assert!(!pool.has_pending_jobs());
        assert!(!pool.has_active_jobs());
        assert_eq!(pool.state(), HandleState::Closed);
    }

    #[tokio::test]
    async fn submit_marks_pending_before_dispatch() {
        let pool = Pool::start(PoolConfig::default(), IdentityHandler::<u32>::new());
        let handle = pool.submit(1);
        // The dispatcher has not run yet on this single-threaded runtime.
        assert!(pool.has_pending_jobs());
        assert_eq!(handle.result().await.unwrap(), 1);
    }
}
