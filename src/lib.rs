//! idlegate: bounded-concurrency job dispatch over a lazily held resource.
//!
//! Callers submit units of work; at most `concurrency` run at once. The
//! shared resource behind the work is opened on first demand and closed
//! automatically once the pool has been idle for the configured timeout,
//! or on explicit shutdown.

mod config;
mod dispatcher;
mod error;
mod events;
mod handler;
mod job;
mod lifecycle;
mod pool;
mod queue;
mod slot;
mod timer;

pub use config::{PoolConfig, TimeoutSource};
pub use error::{JobError, ShutdownError};
pub use events::PoolEvent;
pub use handler::{Handler, IdentityHandler};
pub use job::JobHandle;
pub use lifecycle::HandleState;
pub use pool::Pool;
