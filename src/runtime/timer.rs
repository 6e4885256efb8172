// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::{
    scheduler::Flushable,
    SharedBox,
    SharedObject,
};
use ::core::cmp::Reverse;
use ::std::{
    collections::BinaryHeap,
    ops::{
        Deref,
        DerefMut,
    },
    time::Instant,
};

//==============================================================================
// Structures
//==============================================================================

struct TimerQueueEntry {
    expiry: Instant,
    /// Insertion sequence number. Entries with equal expiry fire in insertion
    /// order, which keeps a scheduling pass reproducible.
    seq: u64,
    flushable: SharedBox<dyn Flushable>,
}

/// Timer that holds one or more deferred flushes for future wake up. This is
/// the virtual clock of the simulation: time only moves when the embedding
/// driver advances it.
pub struct Timer {
    now: Instant,
    seq: u64,
    // Use a reverse to get a min heap.
    heap: BinaryHeap<Reverse<TimerQueueEntry>>,
}

#[derive(Clone)]
pub struct SharedTimer(SharedObject<Timer>);

//==============================================================================
// Associate Functions
//==============================================================================

impl SharedTimer {
    pub fn new(now: Instant, capacity: usize) -> Self {
        Self(SharedObject::<Timer>::new(Timer {
            now,
            seq: 0,
            heap: BinaryHeap::with_capacity(capacity),
        }))
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Registers a deferred flush of `flushable` at virtual time `expiry`.
    pub fn defer_until(&mut self, expiry: Instant, flushable: SharedBox<dyn Flushable>) {
        let seq: u64 = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(TimerQueueEntry { expiry, seq, flushable }));
    }

    /// Returns the expiry of the earliest deferred flush, if any.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.expiry)
    }

    /// Moves the clock forward and pops every deferred flush that has become
    /// due, in (expiry, insertion) order.
    pub fn advance_clock(&mut self, now: Instant) -> Vec<SharedBox<dyn Flushable>> {
        assert!(self.now <= now);

        let mut due: Vec<SharedBox<dyn Flushable>> = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if now < entry.expiry {
                break;
            }
            let entry: TimerQueueEntry = self
                .heap
                .pop()
                .expect("should have an entry because we were able to peek")
                .0;
            due.push(entry.flushable);
        }
        self.now = now;
        due
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl Deref for SharedTimer {
    type Target = Timer;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedTimer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &TimerQueueEntry) -> bool {
        self.expiry == other.expiry && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &TimerQueueEntry) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &TimerQueueEntry) -> core::cmp::Ordering {
        // Compare timer queue entries by expiration time, then by insertion
        // order so that equal deadlines remain deterministic.
        self.expiry.cmp(&other.expiry).then(self.seq.cmp(&other.seq))
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::SharedTimer;
    use crate::runtime::{
        fail::Fail,
        scheduler::{
            FlushId,
            Flushable,
        },
        SharedBox,
        SharedObject,
    };
    use ::anyhow::Result;
    use ::std::{
        ops::Deref,
        time::{
            Duration,
            Instant,
        },
    };

    #[derive(Clone)]
    struct Probe(SharedObject<(FlushId, Vec<u64>)>);

    impl Probe {
        fn new(id: u64, log: &SharedObject<(FlushId, Vec<u64>)>) -> Self {
            let _ = id;
            Self(log.clone())
        }
    }

    impl Flushable for Probe {
        fn id(&self) -> FlushId {
            self.0.deref().0
        }

        fn flush(&mut self, _intermediate: bool) -> Result<(), Fail> {
            Ok(())
        }
    }

    /// Tests that entries with equal expiry pop in insertion order.
    #[test]
    fn equal_deadlines_pop_in_insertion_order() -> Result<()> {
        let now: Instant = Instant::now();
        let mut timer: SharedTimer = SharedTimer::new(now, 8);
        let expiry: Instant = now + Duration::from_secs(1);

        struct Tagged {
            id: FlushId,
        }

        #[derive(Clone)]
        struct SharedTagged(SharedObject<Tagged>);

        impl Flushable for SharedTagged {
            fn id(&self) -> FlushId {
                self.0.deref().id
            }

            fn flush(&mut self, _intermediate: bool) -> Result<(), Fail> {
                Ok(())
            }
        }

        for id in 0..4u64 {
            let tagged: SharedTagged = SharedTagged(SharedObject::<Tagged>::new(Tagged {
                id: FlushId::from(id),
            }));
            timer.defer_until(expiry, SharedBox::<dyn Flushable>::new(Box::new(tagged)));
        }

        crate::ensure_eq!(timer.next_expiry(), Some(expiry));
        let due: Vec<SharedBox<dyn Flushable>> = timer.advance_clock(expiry);
        let order: Vec<u64> = due.iter().map(|f| f.id().into()).collect();
        crate::ensure_eq!(order.as_slice(), &[0, 1, 2, 3]);

        Ok(())
    }

    /// Tests that entries later than the new clock value stay queued.
    #[test]
    fn advance_clock_pops_only_due_entries() -> Result<()> {
        let now: Instant = Instant::now();
        let mut timer: SharedTimer = SharedTimer::new(now, 8);
        let log: SharedObject<(FlushId, Vec<u64>)> = SharedObject::new((FlushId::from(7), Vec::new()));

        timer.defer_until(
            now + Duration::from_secs(2),
            SharedBox::<dyn Flushable>::new(Box::new(Probe::new(7, &log))),
        );

        crate::ensure_eq!(timer.advance_clock(now + Duration::from_secs(1)).len(), 0);
        crate::ensure_eq!(timer.advance_clock(now + Duration::from_secs(2)).len(), 1);
        crate::ensure_eq!(timer.next_expiry(), None);

        Ok(())
    }
}
