// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the forwarder, a node that is simultaneously a provider
//! (to whatever attaches to it) and a consumer (of whatever it is attached
//! to). Forwarders build pipelines without each stage needing bespoke wiring;
//! a transformer is a forwarder with a hook that modifies the delegate's
//! scheduling decision.
//!
//! Forwarders are decoupled by default: when the delegate exits, the
//! forwarder zeroes the forwarded rate and waits to be re-attached, which
//! supports consumer replacement mid-flight. A coupled forwarder propagates
//! the exit upstream instead.

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
        context::{
            ResourceState,
            SharedResourceContext,
        },
        counters::Counters,
        provider::{
            ProviderLogic,
            ResourceProvider,
        },
    },
    runtime::{
        fail::Fail,
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
// Traits
//======================================================================================================================

/// Hook of a transformer: modifies the scheduling decision of the delegate
/// before it is returned upstream. The identity forwarder has no hook.
pub trait Transform {
    fn transform(&mut self, next: Option<Duration>) -> Option<Duration>;
}

//======================================================================================================================
// Structures
//======================================================================================================================

/// Forwarder
pub struct Forwarder {
    interpreter: SharedInterpreter,
    /// Context mediating our consumption of the upstream resource.
    upstream: Option<SharedResourceContext>,
    /// Context of the downstream delegate, if one is attached.
    inner: Option<SharedResourceContext>,
    has_delegate_started: bool,
    /// Whether a delegate exit also exits the upstream connection.
    coupled: bool,
    transform: Option<Box<dyn Transform>>,
    /// Demand most recently forwarded upstream.
    limit: f64,
    /// Set while the delegate is being pulled from inside the upstream pull.
    pulling: bool,
    counters: Counters,
}

#[derive(Clone)]
pub struct SharedForwarder(SharedObject<Forwarder>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Forwarders
impl SharedForwarder {
    /// Creates an identity forwarder.
    pub fn new(interpreter: &SharedInterpreter, coupled: bool) -> Self {
        Self::with_transform(interpreter, coupled, None)
    }

    /// Creates a transformer with the given scheduling hook.
    pub fn with_transform(
        interpreter: &SharedInterpreter,
        coupled: bool,
        transform: Option<Box<dyn Transform>>,
    ) -> Self {
        Self(SharedObject::<Forwarder>::new(Forwarder {
            interpreter: interpreter.clone(),
            upstream: None,
            inner: None,
            has_delegate_started: false,
            coupled,
            transform,
            limit: 0.0,
            pulling: false,
            counters: Counters::default(),
        }))
    }

    /// Returns the forwarder to a pristine state: the delegate, if any, is
    /// closed, the forwarded rate drops to zero and the counters clear. Pooled
    /// forwarders are reset between uses, never reallocated.
    pub fn reset(&mut self) -> Result<(), Fail> {
        // Clear the tracking state before notifying the delegate; the
        // notification may re-attach reentrantly.
        let inner: Option<SharedResourceContext> = self.inner.take();
        self.has_delegate_started = false;
        self.limit = 0.0;
        self.counters.reset();
        if let Some(mut ctx) = inner {
            if ctx.state() != ResourceState::Stopped {
                ctx.close()?;
            }
        }
        let upstream: Option<SharedResourceContext> = self.upstream.clone();
        if let Some(mut ctx) = upstream {
            if ctx.state() == ResourceState::Active {
                ctx.push(Command::idle(None))?;
            }
        }
        Ok(())
    }

    /// Whether a delegate is currently attached and running.
    pub fn has_delegate(&self) -> bool {
        self.has_delegate_started
    }

    /// Running totals across the delegates this forwarder served since the
    /// last reset.
    pub fn counters(&self) -> Counters {
        self.counters
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// The forwarder consumes the upstream resource on behalf of its delegate.
impl ResourceConsumer for SharedForwarder {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        let speed: f64 = ctx.speed();
        let inner: Option<SharedResourceContext> = self.inner.clone();
        let next: Option<Duration> = match inner {
            Some(mut inner) if inner.state() == ResourceState::Active => {
                // Mirror the upstream grant, then pull the delegate for a
                // fresh command.
                inner.set_speed(speed);
                self.pulling = true;
                let result: Result<(), Fail> = inner.repull();
                self.pulling = false;
                if let Err(e) = result {
                    warn!("on_next(): delegate failed (error={:?})", e);
                }
                if self.inner.is_none() {
                    // The delegate exited or failed during the pull; its exit
                    // handling already staged the upstream command.
                    None
                } else {
                    let limit: f64 = self.limit;
                    ctx.push(Command::consume(limit, None)?)?;
                    self.inner
                        .as_ref()
                        .and_then(|inner| inner.deadline())
                        .map(|deadline| deadline.saturating_duration_since(now))
                }
            },
            _ => {
                ctx.push(Command::idle(None))?;
                None
            },
        };
        let next: Option<Duration> = match self.transform.as_mut() {
            Some(transform) => transform.transform(next),
            None => next,
        };
        Ok(next)
    }

    fn on_event(&mut self, ctx: &mut SharedResourceContext, event: Event) -> Result<(), Fail> {
        match event {
            Event::Start => {
                self.upstream = Some(ctx.clone());
                let capacity: f64 = ctx.capacity();
                let inner: Option<SharedResourceContext> = self.inner.clone();
                if let Some(mut inner) = inner {
                    if inner.state() != ResourceState::Stopped {
                        inner.set_capacity(capacity)?;
                    }
                }
                Ok(())
            },
            Event::Capacity => {
                let capacity: f64 = ctx.capacity();
                let inner: Option<SharedResourceContext> = self.inner.clone();
                if let Some(mut inner) = inner {
                    if inner.state() != ResourceState::Stopped {
                        inner.set_capacity(capacity)?;
                    }
                }
                Ok(())
            },
            Event::Exit => {
                // Reset the delegate-tracking state before notifying the
                // delegate: the notification may trigger re-attachment.
                let inner: Option<SharedResourceContext> = self.inner.take();
                self.has_delegate_started = false;
                self.upstream = None;
                self.limit = 0.0;
                if let Some(mut inner) = inner {
                    if inner.state() != ResourceState::Stopped {
                        inner.close()?;
                    }
                }
                Ok(())
            },
        }
    }

    fn on_failure(&mut self, cause: &Fail) {
        warn!("on_failure(): upstream resource failed (cause={:?})", cause);
        let inner: Option<SharedResourceContext> = self.inner.take();
        self.has_delegate_started = false;
        self.upstream = None;
        self.limit = 0.0;
        if let Some(mut inner) = inner {
            if inner.state() != ResourceState::Stopped {
                if let Err(e) = inner.close() {
                    warn!("on_failure(): could not close delegate (error={:?})", e);
                }
            }
        }
    }
}

/// The forwarder provides the delegate's context.
impl ProviderLogic for SharedForwarder {
    fn on_push(&mut self, _ctx: &mut SharedResourceContext, limit: f64) {
        self.limit = limit;
        if self.pulling {
            // The enclosing upstream pull reads the fresh demand when the
            // delegate pull returns.
            return;
        }
        let upstream: Option<SharedResourceContext> = self.upstream.clone();
        if let Some(mut ctx) = upstream {
            if ctx.state() == ResourceState::Active {
                let command: Command = match Command::consume(limit, None) {
                    Ok(command) => command,
                    Err(_) => return,
                };
                if let Err(e) = ctx.push(command) {
                    warn!("on_push(): could not forward demand upstream (error={:?})", e);
                }
            }
        }
    }

    fn on_update(&mut self, _ctx: &mut SharedResourceContext, demand_delta: f64, actual_delta: f64) {
        self.counters.add(demand_delta, actual_delta);
    }

    fn on_finish(&mut self, _ctx: &mut SharedResourceContext) {
        if self.inner.is_none() {
            // Already detached by a reset or an upstream exit.
            return;
        }
        self.inner = None;
        self.has_delegate_started = false;
        self.limit = 0.0;
        let coupled: bool = self.coupled;
        let upstream: Option<SharedResourceContext> = self.upstream.clone();
        if let Some(mut ctx) = upstream {
            if ctx.state() == ResourceState::Active {
                let result: Result<(), Fail> = if coupled {
                    ctx.push(Command::exit())
                } else {
                    ctx.push(Command::idle(None))
                };
                if let Err(e) = result {
                    warn!("on_finish(): could not notify upstream (error={:?})", e);
                }
            }
        }
    }
}

impl ResourceProvider for SharedForwarder {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        if let Some(ctx) = &self.inner {
            if ctx.state() != ResourceState::Stopped {
                let cause: &str = "forwarder already has a delegate";
                error!("start_consumer(): {}", cause);
                return Err(Fail::new(libc::EBUSY, cause));
            }
        }
        let capacity: f64 = match &self.upstream {
            Some(ctx) => ctx.capacity(),
            None => 0.0,
        };
        let logic: SharedBox<dyn ProviderLogic> = SharedBox::<dyn ProviderLogic>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        let mut ctx: SharedResourceContext = interpreter.new_context(consumer, logic);
        ctx.set_capacity(capacity)?;
        self.inner = Some(ctx.clone());
        self.has_delegate_started = true;
        ctx.start()
    }

    fn capacity(&self) -> f64 {
        match &self.upstream {
            Some(ctx) => ctx.capacity(),
            None => 0.0,
        }
    }

    fn speed(&self) -> f64 {
        match &self.inner {
            Some(ctx) => ctx.speed(),
            None => 0.0,
        }
    }

    fn demand(&self) -> f64 {
        self.limit
    }

    fn state(&self) -> ResourceState {
        match &self.inner {
            Some(ctx) => ctx.state(),
            None => ResourceState::Pending,
        }
    }

    fn interrupt(&mut self) -> Result<(), Fail> {
        let inner: Option<SharedResourceContext> = self.inner.clone();
        match inner {
            Some(mut ctx) => ctx.interrupt(),
            None => Ok(()),
        }
    }

    fn cancel(&mut self) -> Result<(), Fail> {
        let inner: Option<SharedResourceContext> = self.inner.clone();
        match inner {
            Some(mut ctx) => ctx.cancel(),
            None => Ok(()),
        }
    }
}

impl Deref for SharedForwarder {
    type Target = Forwarder;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedForwarder {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
