// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Queue-based interrupt coalescing for the resource interpreter.
//!
//! Flushing one resource frequently triggers an interrupt on another (a
//! fairness node re-balancing one output must re-pull all of them). Instead of
//! recursing, every interrupt request lands in a FIFO queue that is drained by
//! a single non-recursive loop: `schedule` calls issued while the queue is
//! draining append to it and return immediately.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::{
    fail::Fail,
    scheduler::flushable::{
        FlushId,
        Flushable,
    },
    SharedBox,
};
use ::std::collections::{
    hash_map::Entry,
    HashMap,
    VecDeque,
};

//==============================================================================
// Structures
//==============================================================================

/// Scheduler Trampoline
pub struct Trampoline {
    /// Queued flushables, in arrival order.
    queue: VecDeque<SharedBox<dyn Flushable>>,
    /// Strength of the queued request for each flushable: `true` means an
    /// intermediate flush suffices, `false` demands a full one.
    pending: HashMap<FlushId, bool>,
    /// Set while the queue is being drained.
    running: bool,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for the Scheduler Trampoline
impl Trampoline {
    /// Creates a trampoline with pre-allocated slots for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::<SharedBox<dyn Flushable>>::with_capacity(capacity),
            pending: HashMap::<FlushId, bool>::with_capacity(capacity),
            running: false,
        }
    }

    /// Enqueues a flush request without draining the queue. A request for a
    /// flushable that is already queued is folded into the existing entry: a
    /// full flush upgrades a queued intermediate one, and a weaker request
    /// against a stronger one is dropped.
    pub fn enqueue(&mut self, flushable: SharedBox<dyn Flushable>, intermediate: bool) {
        let id: FlushId = flushable.id();
        match self.pending.entry(id) {
            Entry::Occupied(mut entry) => {
                if !intermediate {
                    *entry.get_mut() = false;
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(intermediate);
                self.queue.push_back(flushable);
            },
        }
    }

    /// Drains the queue iteratively until it is empty. Re-entrant calls (from
    /// inside a flush that is itself being drained) return immediately, so the
    /// drain never grows the stack regardless of how many interrupts a single
    /// flush triggers. A failing flushable does not prevent its siblings from
    /// being visited; the first failure is returned once the queue is empty.
    pub fn drain(&mut self) -> Result<(), Fail> {
        if self.running {
            return Ok(());
        }
        self.running = true;
        let mut first_failure: Option<Fail> = None;
        while let Some(mut flushable) = self.queue.pop_front() {
            let intermediate: bool = self.pending.remove(&flushable.id()).unwrap_or(false);
            if let Err(e) = flushable.flush(intermediate) {
                warn!("drain(): flush failed (error={:?})", e);
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
        self.running = false;
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Returns whether the queue is currently being drained.
    #[allow(unused)]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the number of queued flush requests.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::Trampoline;
    use crate::runtime::{
        fail::Fail,
        scheduler::flushable::{
            FlushId,
            Flushable,
        },
        SharedBox,
        SharedObject,
    };
    use ::anyhow::Result;
    use ::std::ops::{
        Deref,
        DerefMut,
    };

    struct Recorder {
        id: FlushId,
        visits: Vec<bool>,
    }

    #[derive(Clone)]
    struct SharedRecorder(SharedObject<Recorder>);

    impl SharedRecorder {
        fn new(id: u64) -> Self {
            Self(SharedObject::<Recorder>::new(Recorder {
                id: FlushId::from(id),
                visits: Vec::<bool>::new(),
            }))
        }
    }

    impl Flushable for SharedRecorder {
        fn id(&self) -> FlushId {
            self.0.id
        }

        fn flush(&mut self, intermediate: bool) -> Result<(), Fail> {
            self.visits.push(intermediate);
            Ok(())
        }
    }

    impl Deref for SharedRecorder {
        type Target = Recorder;

        fn deref(&self) -> &Self::Target {
            self.0.deref()
        }
    }

    impl DerefMut for SharedRecorder {
        fn deref_mut(&mut self) -> &mut Self::Target {
            self.0.deref_mut()
        }
    }

    /// Tests that duplicate requests are folded and a full flush upgrades a
    /// queued intermediate one.
    #[test]
    fn enqueue_deduplicates_and_upgrades() -> Result<()> {
        let mut trampoline: Trampoline = Trampoline::new(8);
        let recorder: SharedRecorder = SharedRecorder::new(1);

        trampoline.enqueue(SharedBox::<dyn Flushable>::new(Box::new(recorder.clone())), true);
        trampoline.enqueue(SharedBox::<dyn Flushable>::new(Box::new(recorder.clone())), false);
        trampoline.enqueue(SharedBox::<dyn Flushable>::new(Box::new(recorder.clone())), true);
        crate::ensure_eq!(trampoline.len(), 1);

        trampoline.drain()?;
        crate::ensure_eq!(recorder.visits.as_slice(), &[false]);

        Ok(())
    }

    /// Tests that requests issued during a drain are visited by the same
    /// drain, in arrival order.
    #[test]
    fn drain_visits_requests_issued_mid_drain() -> Result<()> {
        struct Chained {
            id: FlushId,
            next: Option<SharedRecorder>,
            visited: bool,
        }

        #[derive(Clone)]
        struct SharedChained(SharedObject<Chained>, SharedObject<Trampoline>);

        impl Flushable for SharedChained {
            fn id(&self) -> FlushId {
                self.0.id
            }

            fn flush(&mut self, _intermediate: bool) -> Result<(), Fail> {
                let ptr: &mut Chained = self.0.deref_mut();
                ptr.visited = true;
                if let Some(next) = ptr.next.take() {
                    self.1
                        .deref_mut()
                        .enqueue(SharedBox::<dyn Flushable>::new(Box::new(next)), false);
                }
                Ok(())
            }
        }

        let trampoline: SharedObject<Trampoline> = SharedObject::<Trampoline>::new(Trampoline::new(8));
        let tail: SharedRecorder = SharedRecorder::new(2);
        let head: SharedChained = SharedChained(
            SharedObject::<Chained>::new(Chained {
                id: FlushId::from(1),
                next: Some(tail.clone()),
                visited: false,
            }),
            trampoline.clone(),
        );

        let mut driver: SharedObject<Trampoline> = trampoline.clone();
        driver
            .deref_mut()
            .enqueue(SharedBox::<dyn Flushable>::new(Box::new(head.clone())), false);
        driver.deref_mut().drain()?;

        crate::ensure_eq!(head.0.deref().visited, true);
        crate::ensure_eq!(tail.visits.as_slice(), &[false]);
        crate::ensure_eq!(driver.deref().len(), 0);

        Ok(())
    }

    /// Tests that a failing flushable does not shadow its siblings and that
    /// the first failure is reported.
    #[test]
    fn drain_continues_past_failure() -> Result<()> {
        struct Failing {
            id: FlushId,
        }

        #[derive(Clone)]
        struct SharedFailing(SharedObject<Failing>);

        impl Flushable for SharedFailing {
            fn id(&self) -> FlushId {
                self.0.id
            }

            fn flush(&mut self, _intermediate: bool) -> Result<(), Fail> {
                Err(Fail::new(libc::EIO, "consumer failure"))
            }
        }

        let mut trampoline: Trampoline = Trampoline::new(8);
        let failing: SharedFailing = SharedFailing(SharedObject::<Failing>::new(Failing {
            id: FlushId::from(1),
        }));
        let recorder: SharedRecorder = SharedRecorder::new(2);

        trampoline.enqueue(SharedBox::<dyn Flushable>::new(Box::new(failing)), false);
        trampoline.enqueue(SharedBox::<dyn Flushable>::new(Box::new(recorder.clone())), false);

        let result: Result<(), Fail> = trampoline.drain();
        crate::ensure_eq!(result.is_err(), true);
        crate::ensure_eq!(recorder.visits.as_slice(), &[false]);

        Ok(())
    }
}
