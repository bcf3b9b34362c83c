//! The user seam: open / process / close hooks for the shared resource.

use std::marker::PhantomData;

use async_trait::async_trait;

/// Hooks supplied by the caller.
///
/// `open` and `close` bracket the lifetime of the shared resource; they are
/// invoked at most once per lifecycle transition and never overlap. `process`
/// runs one job and may run up to `concurrency` times in parallel. The slot
/// index identifies which of the fixed worker slots the job landed on, useful
/// when the handler keeps per-slot sub-resources.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    type Payload: Send + 'static;
    type Output: Send + 'static;

    /// Acquire the shared resource. Called on the closed → open transition.
    async fn open(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Run one job on the given slot.
    async fn process(&self, payload: Self::Payload, slot: usize) -> anyhow::Result<Self::Output>;

    /// Release the shared resource. Called on the open → closed transition.
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handler that passes every payload through unchanged, with no-op
/// open/close hooks.
pub struct IdentityHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IdentityHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for IdentityHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Send + 'static> Handler for IdentityHandler<T> {
    type Payload = T;
    type Output = T;

    async fn process(&self, payload: T, _slot: usize) -> anyhow::Result<T> {
        Ok(payload)
    }
}
