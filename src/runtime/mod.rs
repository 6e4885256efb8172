// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod fail;
pub mod logging;
pub mod scheduler;
pub mod timer;

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    config::Config,
    resource::{
        consumer::ResourceConsumer,
        context::SharedResourceContext,
        provider::ProviderLogic,
    },
    runtime::{
        fail::Fail,
        scheduler::{
            FlushId,
            Flushable,
            Trampoline,
        },
        timer::SharedTimer,
    },
};
use ::std::{
    boxed::Box,
    convert::{
        AsMut,
        AsRef,
    },
    ops::{
        Deref,
        DerefMut,
    },
    rc::Rc,
    time::Instant,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Default number of pre-allocated trampoline queue slots.
pub const DEFAULT_TRAMPOLINE_CAPACITY: usize = 64;

/// Default number of pre-allocated timer heap slots.
pub const DEFAULT_TIMER_CAPACITY: usize = 64;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Resource Interpreter
///
/// Owns the virtual clock and the trampoline, constructs resource contexts,
/// and coalesces recomputation: related state changes issued inside a batch
/// are flattened into a single recomputation pass instead of one per change.
pub struct Interpreter {
    /// Virtual clock and deferred flushes.
    timer: SharedTimer,
    /// Interrupt-coalescing flush queue.
    trampoline: Trampoline,
    /// Nesting depth of open batches. Only the outermost `pop_batch` drains.
    batch_depth: usize,
    /// Next flush identifier to hand out.
    next_flush_id: u64,
}

#[derive(Clone)]
pub struct SharedInterpreter(SharedObject<Interpreter>);

/// The SharedObject wraps an object that will be shared across resource
/// contexts and sharing nodes.
pub struct SharedObject<T>(Rc<T>);
pub struct SharedBox<T: ?Sized>(SharedObject<Box<T>>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for the Resource Interpreter
impl SharedInterpreter {
    /// Creates an interpreter whose virtual clock starts at `now`.
    pub fn new(now: Instant) -> Self {
        Self::with_capacities(now, DEFAULT_TRAMPOLINE_CAPACITY, DEFAULT_TIMER_CAPACITY)
    }

    /// Creates an interpreter tuned by the `kernel` section of `config`.
    pub fn from_config(config: &Config, now: Instant) -> Result<Self, Fail> {
        let trampoline_capacity: usize = config.trampoline_capacity()?;
        let timer_capacity: usize = config.timer_capacity()?;
        Ok(Self::with_capacities(now, trampoline_capacity, timer_capacity))
    }

    fn with_capacities(now: Instant, trampoline_capacity: usize, timer_capacity: usize) -> Self {
        logging::initialize();
        Self(SharedObject::<Interpreter>::new(Interpreter {
            timer: SharedTimer::new(now, timer_capacity),
            trampoline: Trampoline::new(trampoline_capacity),
            batch_depth: 0,
            next_flush_id: 0,
        }))
    }

    /// Gets the current virtual time.
    pub fn now(&self) -> Instant {
        self.timer.now()
    }

    /// Allocates a fresh flush identifier for a context or a sharing node.
    pub fn alloc_flush_id(&mut self) -> FlushId {
        let id: u64 = self.next_flush_id;
        self.next_flush_id += 1;
        FlushId::from(id)
    }

    /// Creates a new resource context mediating between `consumer` and the
    /// provider behind `logic`. The context starts out Pending.
    pub fn new_context(
        &mut self,
        consumer: Box<dyn ResourceConsumer>,
        logic: SharedBox<dyn ProviderLogic>,
    ) -> SharedResourceContext {
        let id: FlushId = self.alloc_flush_id();
        SharedResourceContext::new(self.clone(), id, consumer, logic)
    }

    /// Opens a batch: flush requests issued until the matching `pop_batch` are
    /// queued instead of drained. Batches nest; only the outermost pop drains.
    pub fn push_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Closes a batch. The outermost pop drains every queued flush in one
    /// pass; inner pops are no-ops on the running flag.
    pub fn pop_batch(&mut self) -> Result<(), Fail> {
        match self.batch_depth {
            0 => Err(Fail::new(libc::EINVAL, "no batch is open")),
            1 => {
                self.batch_depth = 0;
                self.drain()
            },
            _ => {
                self.batch_depth -= 1;
                Ok(())
            },
        }
    }

    /// Runs `f` inside a batch scope.
    pub fn batch<F, R>(&mut self, f: F) -> Result<R, Fail>
    where
        F: FnOnce(&mut SharedInterpreter) -> Result<R, Fail>,
    {
        self.push_batch();
        let result: Result<R, Fail> = f(self);
        self.pop_batch()?;
        result
    }

    /// Requests a flush of `flushable` and, unless a batch is open or a drain
    /// is already running, synchronously drains the queue.
    pub fn schedule(&mut self, flushable: SharedBox<dyn Flushable>, intermediate: bool) -> Result<(), Fail> {
        self.trampoline.enqueue(flushable, intermediate);
        if self.batch_depth == 0 {
            return self.drain();
        }
        Ok(())
    }

    /// Queues a flush of `flushable` for the next interpreter cycle without
    /// draining now.
    pub fn enqueue(&mut self, flushable: SharedBox<dyn Flushable>, intermediate: bool) {
        self.trampoline.enqueue(flushable, intermediate);
    }

    /// Defers a full flush of `flushable` to virtual time `expiry`. An expiry
    /// that is not in the future is queued for the current instant instead.
    pub fn schedule_at(&mut self, expiry: Instant, flushable: SharedBox<dyn Flushable>) {
        if expiry <= self.timer.now() {
            self.trampoline.enqueue(flushable, false);
            return;
        }
        self.timer.defer_until(expiry, flushable);
    }

    /// Moves virtual time forward to `now`, firing every deferred flush at its
    /// own timestamp: the clock stops at each intermediate deadline, drains
    /// the resulting recomputation, and only then advances further. The first
    /// failure raised by a consumer along the way is returned after the clock
    /// has reached `now`; sibling resources keep being scheduled.
    pub fn advance_clock(&mut self, now: Instant) -> Result<(), Fail> {
        assert!(self.timer.now() <= now);

        let mut first_failure: Option<Fail> = None;
        loop {
            let expiry: Instant = match self.timer.next_expiry() {
                Some(expiry) if expiry <= now => expiry,
                _ => break,
            };
            for flushable in self.timer.advance_clock(expiry) {
                self.trampoline.enqueue(flushable, false);
            }
            if let Err(e) = self.drain() {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
        let _ = self.timer.advance_clock(now);
        if let Err(e) = self.drain() {
            if first_failure.is_none() {
                first_failure = Some(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn drain(&mut self) -> Result<(), Fail> {
        self.trampoline.drain()
    }
}

impl<T> SharedObject<T> {
    pub fn new(object: T) -> Self {
        Self(Rc::new(object))
    }
}

impl<T: ?Sized> SharedBox<T> {
    pub fn new(boxed_object: Box<T>) -> Self {
        Self(SharedObject::<Box<T>>::new(boxed_object))
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// Dereferences a shared object for use.
impl<T> Deref for SharedObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

/// Dereferences a mutable reference to a shared object for use. This breaks Rust's ownership model because it allows
/// more than one mutable dereference of a shared object at a time. The kernel requires this because contexts, sharing
/// nodes and the interpreter hold mutable references to each other while a scheduling pass walks the graph; the kernel
/// also guarantees that only one callback runs at a time, as the whole simulation is single-threaded and the
/// trampoline flattens re-entrant interrupts into iteration. Due to this design, Rust's static borrow checker is not
/// able to ensure memory safety and we have chosen not to use the dynamic borrow checker. Instead, shared objects
/// should be used judiciously with the understanding that the shared object may change/be mutated whenever a callback
/// is invoked.
impl<T> DerefMut for SharedObject<T> {
    fn deref_mut<'a>(&'a mut self) -> &'a mut Self::Target {
        let ptr: *mut T = Rc::as_ptr(&self.0) as *mut T;
        unsafe { &mut *ptr }
    }
}

/// Returns a reference to the interior object, which is borrowed for directly accessing the value. Generally deref
/// should be used unless you absolutely need to borrow the reference.
impl<T> AsRef<T> for SharedObject<T> {
    fn as_ref(&self) -> &T {
        self.0.as_ref()
    }
}

/// Returns a mutable reference to the interior object. Similar to DerefMut, this breaks Rust's ownership properties
/// and should be considered unsafe. However, it is safe to use in this kernel if and only if we only run one callback
/// at a time.
impl<T> AsMut<T> for SharedObject<T> {
    fn as_mut<'a>(&'a mut self) -> &'a mut T {
        let ptr: *mut T = Rc::as_ptr(&self.0) as *mut T;
        unsafe { &mut *ptr }
    }
}

impl<T> Clone for SharedObject<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: ?Sized> Deref for SharedBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.0.deref()
    }
}

impl<T: ?Sized> DerefMut for SharedBox<T> {
    fn deref_mut<'a>(&'a mut self) -> &'a mut Self::Target {
        self.0.deref_mut().as_mut()
    }
}

impl<T: ?Sized> Clone for SharedBox<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Deref for SharedInterpreter {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedInterpreter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
