//! Dispatcher - the single owner of all mutable pool state.
//!
//! One task owns the queue, the slot set, the lifecycle machine and the idle
//! timer; everything else talks to it over channels. Between awaits every
//! state change is atomic from the callers' perspective, so no locks are
//! needed anywhere.
//!
//! Flow:
//! 1. Commands (submit, shutdown) arrive on the command channel
//! 2. Open/close completions and job completions arrive on the internal channel
//! 3. After every event the dispatcher pumps: non-empty queue → ensure open,
//!    assign head jobs to free slots; empty queue and no busy slot → idle
//! 4. Idle with the timer expired → close; idle with shutdown waiters → close

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::config::{PoolConfig, TimeoutSource};
use crate::error::{JobError, ShutdownError};
use crate::events::PoolEvent;
use crate::handler::Handler;
use crate::job::Job;
use crate::lifecycle::{Action, HandleState, LifecycleMachine, Target};
use crate::pool::PoolShared;
use crate::queue::JobQueue;
use crate::slot::{RunningJob, SlotSet};
use crate::timer::IdleTimer;

pub(crate) enum Command<H: Handler> {
    Submit(Job<H::Payload, H::Output>),
    Shutdown {
        graceful: bool,
        done: oneshot::Sender<Result<(), ShutdownError>>,
    },
}

enum Internal<U> {
    Opened(Result<(), String>),
    Closed(Result<(), String>),
    JobFinished { slot: usize, outcome: Result<U, String> },
}

enum Wake<H: Handler> {
    Command(Option<Command<H>>),
    Internal(Internal<H::Output>),
    TimerFired(u64),
}

pub(crate) struct Dispatcher<H: Handler> {
    handler: Arc<H>,
    timeout: TimeoutSource,
    queue: JobQueue<H::Payload, H::Output>,
    slots: SlotSet<H::Output>,
    machine: LifecycleMachine,
    timer: IdleTimer,
    shared: Arc<PoolShared>,
    commands: mpsc::UnboundedReceiver<Command<H>>,
    internal_tx: mpsc::UnboundedSender<Internal<H::Output>>,
    internal_rx: mpsc::UnboundedReceiver<Internal<H::Output>>,
    /// Shutdown callers parked until the idle condition.
    shutdown_pending: Vec<oneshot::Sender<Result<(), ShutdownError>>>,
    /// Shutdown callers parked until the close transition settles.
    close_waiters: Vec<oneshot::Sender<Result<(), ShutdownError>>>,
    /// False once every pool handle is dropped; the loop then drains and exits.
    accepting: bool,
}

impl<H: Handler> Dispatcher<H> {
    pub(crate) fn spawn(
        config: PoolConfig,
        handler: Arc<H>,
        shared: Arc<PoolShared>,
        commands: mpsc::UnboundedReceiver<Command<H>>,
    ) {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            handler,
            timeout: config.timeout,
            queue: JobQueue::new(),
            slots: SlotSet::new(config.concurrency),
            machine: LifecycleMachine::new(),
            timer: IdleTimer::new(),
            shared,
            commands,
            internal_tx,
            internal_rx,
            shutdown_pending: Vec::new(),
            close_waiters: Vec::new(),
            accepting: true,
        };
        tokio::spawn(dispatcher.run());
    }

    async fn run(mut self) {
        tracing::debug!(slots = self.slots.len(), "dispatcher started");
        loop {
            let wake = tokio::select! {
                biased;
                msg = self.internal_rx.recv() => match msg {
                    Some(msg) => Wake::Internal(msg),
                    None => continue,
                },
                generation = self.timer.fired() => Wake::TimerFired(generation),
                cmd = self.commands.recv(), if self.accepting => Wake::Command(cmd),
            };

            match wake {
                Wake::Command(Some(cmd)) => self.on_command(cmd),
                Wake::Command(None) => {
                    tracing::debug!("all pool handles dropped, draining");
                    self.accepting = false;
                    self.pump();
                }
                Wake::Internal(msg) => self.on_internal(msg),
                Wake::TimerFired(generation) => self.on_timer_fired(generation),
            }

            if self.finished() {
                break;
            }
        }
        tracing::debug!("dispatcher exiting");
    }

    fn finished(&self) -> bool {
        !self.accepting
            && self.queue.is_empty()
            && !self.slots.any_busy()
            && self.machine.state() == HandleState::Closed
    }

    fn on_command(&mut self, cmd: Command<H>) {
        match cmd {
            Command::Submit(job) => {
                tracing::trace!(job = %job.id, queued = self.queue.len() + 1, "job submitted");
                self.queue.enqueue(job);
                self.pump();
            }
            Command::Shutdown { graceful, done } => {
                tracing::debug!(
                    graceful,
                    queued = self.queue.len(),
                    busy = self.slots.busy_count(),
                    "shutdown requested"
                );
                if !graceful {
                    self.fail_queued(JobError::ForcedShutdown);
                }
                if self.is_idle() {
                    if self.machine.state() == HandleState::Closed {
                        // Already at rest; never re-invoke the close hook.
                        let _ = done.send(Ok(()));
                    } else {
                        self.close_waiters.push(done);
                        self.request_close();
                    }
                } else {
                    // Running jobs always finish; the close starts once the
                    // pool reaches the idle condition.
                    self.shutdown_pending.push(done);
                }
            }
        }
    }

    fn on_internal(&mut self, msg: Internal<H::Output>) {
        match msg {
            Internal::Opened(Ok(())) => {
                let follow_up = self.machine.opened();
                self.sync_state();
                tracing::info!("shared resource opened");
                self.shared.emit(PoolEvent::Opened);
                self.arm_timer();
                if let Some(action) = follow_up {
                    self.begin(action);
                    self.sync_state();
                }
                self.pump();
            }
            Internal::Opened(Err(error)) => {
                tracing::error!(error = %error, "open hook failed, rolling back to closed");
                self.machine.open_failed();
                self.sync_state();
                self.fail_queued(JobError::OpenFailed(error));
                // Anyone waiting on a close is satisfied: the resource was
                // never opened, so there is nothing to release.
                for waiter in self.close_waiters.drain(..) {
                    let _ = waiter.send(Ok(()));
                }
                self.pump();
            }
            Internal::Closed(result) => {
                let follow_up = self.machine.closed();
                self.sync_state();
                match &result {
                    Ok(()) => tracing::info!("shared resource closed"),
                    Err(error) => {
                        tracing::error!(error = %error, "close hook failed, resource treated as released");
                    }
                }
                self.shared.emit(PoolEvent::Closed);
                let settled = result.map_err(ShutdownError::CloseFailed);
                for waiter in self.close_waiters.drain(..) {
                    let _ = waiter.send(settled.clone());
                }
                if let Some(action) = follow_up {
                    self.begin(action);
                    self.sync_state();
                }
                self.pump();
            }
            Internal::JobFinished { slot, outcome } => {
                let Some(running) = self.slots.complete(slot) else {
                    tracing::warn!(slot, "completion for a slot that is not busy");
                    return;
                };
                self.shared.job_finished();
                match outcome {
                    Ok(value) => {
                        tracing::trace!(job = %running.id, slot, "job succeeded");
                        let _ = running.reply.send(Ok(value));
                    }
                    Err(error) => {
                        tracing::debug!(job = %running.id, slot, error = %error, "job failed");
                        let _ = running.reply.send(Err(JobError::Failed(error)));
                    }
                }
                self.arm_timer();
                self.pump();
            }
        }
    }

    fn on_timer_fired(&mut self, generation: u64) {
        if !self.timer.is_current(generation) {
            tracing::trace!(generation, "stale idle timer fire ignored");
            return;
        }
        self.timer.disarm();

        if self.slots.any_busy() {
            // Never close while work is in flight. A zero timeout would
            // refire in the same turn, so leave rearming to the next
            // completion in that case.
            let delay = self.timeout.duration();
            if !delay.is_zero() {
                self.timer.arm(delay);
            }
            return;
        }
        if !self.queue.is_empty() {
            // Work is pending; the dispatcher will pick it up.
            return;
        }
        tracing::debug!("idle timeout elapsed, closing shared resource");
        if let Some(action) = self.machine.request(Target::Closed) {
            self.begin(action);
        }
        self.sync_state();
    }

    /// Re-evaluate the pool after any event: ensure the resource is open
    /// while jobs are queued, assign queued jobs to free slots, and report
    /// the idle condition.
    fn pump(&mut self) {
        if self.queue.is_empty() {
            if !self.slots.any_busy() {
                self.on_idle();
            }
            return;
        }
        if self.machine.state() == HandleState::Open {
            self.assign_ready();
        } else if let Some(action) = self.machine.request(Target::Open) {
            self.begin(action);
            self.sync_state();
        }
    }

    /// FIFO assignment: pop the queue head into the first free slot while
    /// both exist.
    fn assign_ready(&mut self) {
        while let Some(index) = self.slots.first_free() {
            let Some(job) = self.queue.dequeue() else {
                break;
            };
            self.shared.job_started();
            tracing::debug!(
                job = %job.id,
                slot = index,
                queued_for = ?job.created_at.elapsed(),
                "job assigned to slot"
            );
            let _ = job.started.send(index);
            self.slots.assign(
                index,
                RunningJob {
                    id: job.id,
                    reply: job.reply,
                },
            );

            let handler = Arc::clone(&self.handler);
            let internal_tx = self.internal_tx.clone();
            let payload = job.payload;
            tokio::spawn(async move {
                let outcome = handler
                    .process(payload, index)
                    .await
                    .map_err(|e| e.to_string());
                let _ = internal_tx.send(Internal::JobFinished {
                    slot: index,
                    outcome,
                });
            });
            self.arm_timer();
        }
    }

    fn on_idle(&mut self) {
        self.shared.emit(PoolEvent::Idle);
        if self.shutdown_pending.is_empty() && self.accepting {
            return;
        }
        if self.machine.state() == HandleState::Closed {
            for waiter in self.shutdown_pending.drain(..) {
                let _ = waiter.send(Ok(()));
            }
        } else {
            self.close_waiters.append(&mut self.shutdown_pending);
            self.request_close();
        }
    }

    /// Explicit close request: cancels the outstanding idle timer first so
    /// the timer cannot race a second close attempt.
    fn request_close(&mut self) {
        self.timer.cancel();
        if let Some(action) = self.machine.request(Target::Closed) {
            self.begin(action);
        }
        self.sync_state();
    }

    fn begin(&mut self, action: Action) {
        match action {
            Action::BeginOpen => {
                tracing::debug!("opening shared resource");
                let handler = Arc::clone(&self.handler);
                let internal_tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = handler.open().await.map_err(|e| e.to_string());
                    let _ = internal_tx.send(Internal::Opened(result));
                });
            }
            Action::BeginClose => {
                tracing::debug!("closing shared resource");
                let handler = Arc::clone(&self.handler);
                let internal_tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = handler.close().await.map_err(|e| e.to_string());
                    let _ = internal_tx.send(Internal::Closed(result));
                });
            }
        }
    }

    /// Rearm the idle timer on activity, re-evaluating the timeout source.
    fn arm_timer(&mut self) {
        if self.machine.state() != HandleState::Open {
            return;
        }
        self.timer.arm(self.timeout.duration());
    }

    fn fail_queued(&mut self, error: JobError) {
        for job in self.queue.drain() {
            self.shared.job_dequeued();
            tracing::debug!(job = %job.id, error = %error, "failing queued job");
            let _ = job.reply.send(Err(error.clone()));
        }
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && !self.slots.any_busy()
    }

    fn sync_state(&mut self) {
        let state = self.machine.state();
        tracing::trace!(state = state.as_str(), "lifecycle state");
        self.shared.set_state(state);
    }
}

impl<H: Handler> Drop for Dispatcher<H> {
    fn drop(&mut self) {
        // Settle anything still pending so no caller hangs if the loop is
        // torn down mid-flight (runtime shutdown). Observer counters are
        // decremented too, so `has_pending_jobs`/`has_active_jobs` go quiet.
        for job in self.queue.drain() {
            self.shared.job_dequeued();
            let _ = job.reply.send(Err(JobError::PoolShutDown));
        }
        for running in self.slots.drain_busy() {
            self.shared.job_finished();
            let _ = running.reply.send(Err(JobError::PoolShutDown));
        }
        for waiter in self.shutdown_pending.drain(..) {
            let _ = waiter.send(Err(ShutdownError::Terminated));
        }
        for waiter in self.close_waiters.drain(..) {
            let _ = waiter.send(Err(ShutdownError::Terminated));
        }
    }
}
