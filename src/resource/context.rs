// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the resource context, the unit everything else in the
//! kernel is built from.
//!
//! A context mediates exactly one (provider, consumer) pair. It tracks the
//! capacity offered by the provider, the rate requested by the consumer and
//! the rate actually granted, and materializes elapsed-work bookkeeping
//! lazily: between scheduling passes nothing is computed, and a flush brings
//! the accounting up to the current virtual instant in one step.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    resource::{
        command::Command,
        consumer::{
            Event,
            ResourceConsumer,
        },
        counters::Counters,
        provider::ProviderLogic,
    },
    runtime::{
        fail::Fail,
        scheduler::{
            FlushId,
            Flushable,
        },
        SharedBox,
        SharedInterpreter,
        SharedObject,
    },
};
use ::std::{
    ops::{
        Deref,
        DerefMut,
    },
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Lifecycle of a resource context. Transitions are monotonic: Pending to
/// Active to Stopped, never backwards.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResourceState {
    /// Created, not yet driving time.
    Pending,
    /// Participating in scheduling.
    Active,
    /// Terminal.
    Stopped,
}

/// Resource Context
pub struct ResourceContext {
    /// Identifier in the interpreter's flush queue.
    id: FlushId,
    interpreter: SharedInterpreter,
    consumer: Box<dyn ResourceConsumer>,
    /// Provider-side hooks. Dropped once the context stops, so a stopped
    /// context never keeps its provider alive.
    logic: Option<SharedBox<dyn ProviderLogic>>,
    /// Provider-assigned tag identifying this context among its siblings.
    token: u64,
    state: ResourceState,
    /// Capacity offered by the provider, in units/s.
    capacity: f64,
    /// Rate requested by the consumer, in units/s.
    limit: f64,
    /// Rate granted by the provider, in units/s.
    speed: f64,
    /// Outstanding work as of `last_update`.
    remaining_work: f64,
    /// Virtual instant up to which work accounting has been materialized.
    last_update: Instant,
    /// Virtual instant of the previous consumer pull.
    last_pull: Instant,
    /// Virtual instant of the next required pull, if bounded.
    deadline: Option<Instant>,
    /// Deadline for which a timer entry is already pending, so re-pulls do
    /// not flood the timer heap with duplicates.
    armed: Option<Instant>,
    /// Command staged by `push` while the consumer is being pulled.
    pushed: Option<Command>,
    /// Whether the last applied command was an Idle.
    idle: bool,
    /// Dirty flag: a full flush re-pulls the consumer only when this is set
    /// or the deadline has arrived.
    invalidated: bool,
    /// Set while the consumer is being pulled.
    in_flush: bool,
    counters: Counters,
    /// Cause attached when the consumer failed.
    failure: Option<Fail>,
}

#[derive(Clone)]
pub struct SharedResourceContext(SharedObject<ResourceContext>);

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

fn min_instant(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Resource Contexts
impl SharedResourceContext {
    /// Creates a Pending context. Use [SharedInterpreter::new_context] rather
    /// than calling this directly.
    pub(crate) fn new(
        interpreter: SharedInterpreter,
        id: FlushId,
        consumer: Box<dyn ResourceConsumer>,
        logic: SharedBox<dyn ProviderLogic>,
    ) -> Self {
        let now: Instant = interpreter.now();
        Self(SharedObject::<ResourceContext>::new(ResourceContext {
            id,
            interpreter,
            consumer,
            logic: Some(logic),
            token: 0,
            state: ResourceState::Pending,
            capacity: 0.0,
            limit: 0.0,
            speed: 0.0,
            remaining_work: 0.0,
            last_update: now,
            last_pull: now,
            deadline: None,
            armed: None,
            pushed: None,
            idle: false,
            invalidated: false,
            in_flush: false,
            counters: Counters::default(),
            failure: None,
        }))
    }

    /// Transitions the context from Pending to Active, delivers the Start
    /// event and schedules the first pull. Starting twice is an error.
    pub fn start(&mut self) -> Result<(), Fail> {
        if self.state != ResourceState::Pending {
            let cause: String = format!("context cannot be started twice (state={:?})", self.state);
            error!("start(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        trace!("start(): id={:?}", self.id);
        let now: Instant = self.interpreter.now();
        self.state = ResourceState::Active;
        self.last_update = now;
        self.last_pull = now;
        let mut ctx: SharedResourceContext = self.clone();
        if let Err(e) = self.consumer.on_event(&mut ctx, Event::Start) {
            return self.raise(e);
        }
        self.interrupt()
    }

    /// Transitions the context to Stopped, synchronously delivering the Exit
    /// event to the consumer. Closing an already-stopped context is an error.
    pub fn close(&mut self) -> Result<(), Fail> {
        if self.state == ResourceState::Stopped {
            let cause: &str = "context is already stopped";
            error!("close(): {} (id={:?})", cause, self.id);
            return Err(Fail::new(libc::EINVAL, cause));
        }
        trace!("close(): id={:?}", self.id);
        self.stop(true)
    }

    /// Cancels the context: immediate and synchronous, with no grace period.
    pub fn cancel(&mut self) -> Result<(), Fail> {
        self.close()
    }

    /// Pushes a command into the context. Inside a pull the command is staged
    /// and applied when the pull returns; outside it is applied immediately
    /// and the context is interrupted so the provider re-evaluates.
    pub fn push(&mut self, command: Command) -> Result<(), Fail> {
        if self.in_flush {
            self.pushed = Some(command);
            return Ok(());
        }
        if self.state != ResourceState::Active {
            let cause: String = format!("cannot push on an inactive context (state={:?})", self.state);
            warn!("push(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        let now: Instant = self.interpreter.now();
        self.materialize(now);
        self.apply_command(now, command)?;
        if self.state == ResourceState::Stopped {
            return Ok(());
        }
        let limit: f64 = self.limit;
        if let Some(mut logic) = self.logic.clone() {
            let mut ctx: SharedResourceContext = self.clone();
            logic.on_push(&mut ctx, limit);
        }
        self.interrupt()
    }

    /// Marks the context dirty and queues a recomputation for the next
    /// interpreter cycle.
    pub fn invalidate(&mut self) {
        if self.state != ResourceState::Active {
            return;
        }
        self.invalidated = true;
        let flushable: SharedBox<dyn Flushable> = SharedBox::<dyn Flushable>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        interpreter.enqueue(flushable, false);
    }

    /// Marks the context dirty and schedules a recomputation now.
    pub fn interrupt(&mut self) -> Result<(), Fail> {
        if self.state != ResourceState::Active {
            return Ok(());
        }
        self.invalidated = true;
        let flushable: SharedBox<dyn Flushable> = SharedBox::<dyn Flushable>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        interpreter.schedule(flushable, false)
    }

    /// Synchronously materializes the context. An intermediate flush only
    /// brings elapsed-time bookkeeping up to date (for sampling); a full flush
    /// additionally re-pulls the consumer for a fresh command. A full flush on
    /// a clean context whose deadline has not arrived downgrades to an
    /// intermediate one, which suppresses stale timer firings.
    pub fn flush(&mut self, intermediate: bool) -> Result<(), Fail> {
        if self.state != ResourceState::Active || self.in_flush {
            return Ok(());
        }
        let now: Instant = self.interpreter.now();
        self.materialize(now);
        if intermediate {
            return Ok(());
        }
        let due: bool = match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        };
        if !self.invalidated && !due {
            return Ok(());
        }
        self.pull_consumer(now)
    }

    /// Forces a fresh pull of the consumer right now. Used by sharing nodes at
    /// the start of a fairness pass.
    pub(crate) fn repull(&mut self) -> Result<(), Fail> {
        if self.state != ResourceState::Active {
            return Ok(());
        }
        self.invalidated = true;
        self.flush(false)
    }

    /// Sets the capacity of the mediated resource and notifies the consumer,
    /// which may respond by pushing a new rate.
    pub fn set_capacity(&mut self, capacity: f64) -> Result<(), Fail> {
        if !capacity.is_finite() || capacity < 0.0 {
            let cause: String = format!("invalid capacity (capacity={:?})", capacity);
            error!("set_capacity(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        if self.state == ResourceState::Stopped {
            let cause: &str = "cannot set capacity on a stopped context";
            error!("set_capacity(): {} (id={:?})", cause, self.id);
            return Err(Fail::new(libc::EINVAL, cause));
        }
        if self.state == ResourceState::Active {
            let now: Instant = self.interpreter.now();
            self.materialize(now);
        }
        self.capacity = capacity;
        if self.speed > capacity {
            self.speed = capacity;
        }
        if self.state == ResourceState::Active {
            let mut ctx: SharedResourceContext = self.clone();
            if let Err(e) = self.consumer.on_event(&mut ctx, Event::Capacity) {
                return self.raise(e);
            }
        }
        Ok(())
    }

    /// Grants a rate to the consumer. Provider side only. The elapsed interval
    /// is materialized first, so the new rate only applies from now on.
    pub fn set_speed(&mut self, speed: f64) {
        if self.state != ResourceState::Active {
            return;
        }
        let now: Instant = self.interpreter.now();
        self.materialize(now);
        self.speed = speed.clamp(0.0, self.capacity);
    }

    /// Brings work accounting up to `now`. Materializing twice at the same
    /// instant is a no-op.
    fn materialize(&mut self, now: Instant) {
        let elapsed: Duration = now - self.last_update;
        if elapsed.is_zero() {
            return;
        }
        let dt: f64 = elapsed.as_secs_f64();
        let demand_delta: f64 = self.limit * dt;
        let actual_delta: f64 = self.speed * dt;
        self.counters.add(demand_delta, actual_delta);
        if self.remaining_work.is_finite() {
            self.remaining_work = (self.remaining_work - actual_delta).max(0.0);
        }
        self.last_update = now;
        if demand_delta > 0.0 || actual_delta > 0.0 {
            if let Some(mut logic) = self.logic.clone() {
                let mut ctx: SharedResourceContext = self.clone();
                logic.on_update(&mut ctx, demand_delta, actual_delta);
            }
        }
    }

    /// Pulls the consumer for a fresh command, applies it, arms the next
    /// deadline and notifies the provider logic of the (possibly unchanged)
    /// demand.
    fn pull_consumer(&mut self, now: Instant) -> Result<(), Fail> {
        self.in_flush = true;
        self.invalidated = false;
        let delta: Duration = now - self.last_pull;
        let mut ctx: SharedResourceContext = self.clone();
        let result: Result<Option<Duration>, Fail> = self.consumer.on_next(&mut ctx, now, delta);
        self.in_flush = false;
        self.last_pull = now;
        let next: Option<Duration> = match result {
            Ok(next) => next,
            Err(e) => return self.raise(e),
        };
        let mut command_deadline: Option<Instant> = None;
        if let Some(command) = self.pushed.take() {
            command_deadline = self.apply_command(now, command)?;
            if self.state == ResourceState::Stopped {
                return Ok(());
            }
        }
        self.deadline = min_instant(next.map(|delay| now + delay), command_deadline);
        if let Some(expiry) = self.deadline {
            if self.armed != Some(expiry) {
                self.armed = Some(expiry);
                let flushable: SharedBox<dyn Flushable> = SharedBox::<dyn Flushable>::new(Box::new(self.clone()));
                let mut interpreter: SharedInterpreter = self.interpreter.clone();
                interpreter.schedule_at(expiry, flushable);
            }
        }
        let limit: f64 = self.limit;
        if let Some(mut logic) = self.logic.clone() {
            let mut ctx: SharedResourceContext = self.clone();
            logic.on_push(&mut ctx, limit);
        }
        Ok(())
    }

    /// Applies a command, returning the deadline it implies, if any. An Exit
    /// command stops the context without an Exit notification, as the
    /// consumer initiated the detachment itself.
    fn apply_command(&mut self, now: Instant, command: Command) -> Result<Option<Instant>, Fail> {
        match command {
            Command::Consume { limit, duration } => {
                self.limit = limit;
                self.idle = false;
                self.remaining_work = match duration {
                    Some(duration) => limit * duration.as_secs_f64(),
                    None => f64::INFINITY,
                };
                Ok(duration.map(|duration| now + duration))
            },
            Command::Idle { deadline } => {
                self.limit = 0.0;
                self.idle = true;
                self.remaining_work = 0.0;
                Ok(deadline.map(|deadline| now + deadline))
            },
            Command::Exit => {
                self.stop(false)?;
                Ok(None)
            },
        }
    }

    /// Attaches `cause`, notifies the consumer, force-stops the context and
    /// re-raises the failure to the caller of the triggering operation.
    fn raise(&mut self, cause: Fail) -> Result<(), Fail> {
        error!("raise(): consumer failed (id={:?}, cause={:?})", self.id, cause);
        self.failure = Some(cause.clone());
        self.consumer.on_failure(&cause);
        if let Err(e) = self.stop(false) {
            warn!("raise(): stop failed while handling a failure (error={:?})", e);
        }
        Err(cause)
    }

    /// Stops the context: materializes the elapsed interval, zeroes the rates,
    /// optionally delivers the Exit event, and releases the provider logic.
    fn stop(&mut self, notify_exit: bool) -> Result<(), Fail> {
        let now: Instant = self.interpreter.now();
        if self.state == ResourceState::Active {
            self.materialize(now);
        }
        self.state = ResourceState::Stopped;
        self.speed = 0.0;
        self.limit = 0.0;
        self.deadline = None;
        self.invalidated = false;
        self.pushed = None;
        let result: Result<(), Fail> = if notify_exit {
            let mut ctx: SharedResourceContext = self.clone();
            self.consumer.on_event(&mut ctx, Event::Exit)
        } else {
            Ok(())
        };
        if let Some(mut logic) = self.logic.take() {
            let mut ctx: SharedResourceContext = self.clone();
            logic.on_finish(&mut ctx);
        }
        result
    }

    /// Tags this context with a provider-assigned token. Set once, before the
    /// context starts.
    pub(crate) fn set_token(&mut self, token: u64) {
        self.token = token;
    }

    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Rate currently requested by the consumer.
    pub fn demand(&self) -> f64 {
        self.limit
    }

    /// Whether the last applied command was an Idle.
    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Virtual instant of the next required pull, if bounded.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Outstanding work at the current virtual instant. Derived lazily; does
    /// not mutate the context.
    pub fn remaining_work(&self) -> f64 {
        if !self.remaining_work.is_finite() {
            return self.remaining_work;
        }
        let elapsed: Duration = self.interpreter.now() - self.last_update;
        (self.remaining_work - self.speed * elapsed.as_secs_f64()).max(0.0)
    }

    /// Running totals as of the last materialization. Issue an intermediate
    /// flush first to sample up to the current instant.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Clears the counters. Telemetry only, between export windows.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    /// Cause of the failure that stopped this context, if any.
    pub fn failure(&self) -> Option<Fail> {
        self.failure.clone()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Flushable for SharedResourceContext {
    fn id(&self) -> FlushId {
        self.0.id
    }

    fn flush(&mut self, intermediate: bool) -> Result<(), Fail> {
        SharedResourceContext::flush(self, intermediate)
    }
}

impl Deref for SharedResourceContext {
    type Target = ResourceContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedResourceContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
