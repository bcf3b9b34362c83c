//! Fixed set of worker slots.
//!
//! The slot count is the concurrency limit, fixed at pool construction.
//! A slot is either free or running exactly one job.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::JobError;

/// The running half of a job: its id and the sender that settles it.
pub(crate) struct RunningJob<U> {
    pub id: Uuid,
    pub reply: oneshot::Sender<Result<U, JobError>>,
}

struct Slot<U> {
    running: Option<RunningJob<U>>,
}

pub(crate) struct SlotSet<U> {
    slots: Vec<Slot<U>>,
}

impl<U> SlotSet<U> {
    pub(crate) fn new(count: usize) -> Self {
        debug_assert!(count >= 1);
        Self {
            slots: (0..count).map(|_| Slot { running: None }).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Lowest-index free slot, if any.
    pub(crate) fn first_free(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.running.is_none())
    }

    pub(crate) fn assign(&mut self, index: usize, job: RunningJob<U>) {
        debug_assert!(self.slots[index].running.is_none(), "slot already busy");
        self.slots[index].running = Some(job);
    }

    /// Free the slot, returning the job that was running on it.
    pub(crate) fn complete(&mut self, index: usize) -> Option<RunningJob<U>> {
        self.slots.get_mut(index).and_then(|s| s.running.take())
    }

    pub(crate) fn busy_count(&self) -> usize {
        self.slots.iter().filter(|s| s.running.is_some()).count()
    }

    pub(crate) fn any_busy(&self) -> bool {
        self.slots.iter().any(|s| s.running.is_some())
    }

    /// Take every running job, freeing all slots.
    pub(crate) fn drain_busy(&mut self) -> Vec<RunningJob<U>> {
        self.slots.iter_mut().filter_map(|s| s.running.take()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: Uuid) -> (RunningJob<u32>, oneshot::Receiver<Result<u32, JobError>>) {
        let (tx, rx) = oneshot::channel();
        (RunningJob { id, reply: tx }, rx)
    }

    #[test]
    fn assign_and_complete() {
        let mut slots = SlotSet::<u32>::new(2);
        assert_eq!(slots.first_free(), Some(0));
        assert!(!slots.any_busy());

        let id = Uuid::new_v4();
        let (job, _rx) = running(id);
        slots.assign(0, job);

        assert_eq!(slots.first_free(), Some(1));
        assert_eq!(slots.busy_count(), 1);

        let done = slots.complete(0).unwrap();
        assert_eq!(done.id, id);
        assert_eq!(slots.first_free(), Some(0));
        assert!(!slots.any_busy());
    }

    #[test]
    fn full_set_has_no_free_slot() {
        let mut slots = SlotSet::<u32>::new(2);
        let (a, _ra) = running(Uuid::new_v4());
        let (b, _rb) = running(Uuid::new_v4());
        slots.assign(0, a);
        slots.assign(1, b);

        assert_eq!(slots.first_free(), None);
        assert_eq!(slots.busy_count(), 2);
    }

    #[test]
    fn complete_on_free_slot_is_none() {
        let mut slots = SlotSet::<u32>::new(1);
        assert!(slots.complete(0).is_none());
        assert!(slots.complete(5).is_none());
    }
}
