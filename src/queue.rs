//! FIFO queue of jobs awaiting a free slot.

use std::collections::VecDeque;

use crate::job::Job;

/// Ordered, unbounded job queue. Append at the tail, pop at the head,
/// never reordered.
pub(crate) struct JobQueue<T, U> {
    inner: VecDeque<Job<T, U>>,
}

impl<T, U> JobQueue<T, U> {
    pub(crate) fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    pub(crate) fn enqueue(&mut self, job: Job<T, U>) {
        self.inner.push_back(job);
    }

    pub(crate) fn dequeue(&mut self) -> Option<Job<T, U>> {
        self.inner.pop_front()
    }

    /// Remove every queued job, in order. Used by forced shutdown and
    /// open-failure fan-out.
    pub(crate) fn drain(&mut self) -> Vec<Job<T, U>> {
        self.inner.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut queue = JobQueue::<u32, u32>::new();
        let (a, _ha) = Job::new(1);
        let (b, _hb) = Job::new(2);
        let (c, _hc) = Job::new(3);
        queue.enqueue(a);
        queue.enqueue(b);
        queue.enqueue(c);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue().unwrap().payload, 1);
        assert_eq!(queue.dequeue().unwrap().payload, 2);
        assert_eq!(queue.dequeue().unwrap().payload, 3);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn drain_empties_in_order() {
        let mut queue = JobQueue::<u32, u32>::new();
        let (a, _ha) = Job::new(1);
        let (b, _hb) = Job::new(2);
        queue.enqueue(a);
        queue.enqueue(b);

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].payload, 1);
        assert!(queue.is_empty());
    }
}
