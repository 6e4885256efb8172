// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    resource::{
        consumer::ResourceConsumer,
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
use ::std::ops::{
    Deref,
    DerefMut,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Grant rule of a leaf resource: whatever fits under the capacity.
struct SourceLogic;

/// Resource Source
///
/// The leaf provider: a single capacity-backed resource (a CPU, a GPU, a
/// link) directly driven by the interpreter. Every composition of sharing
/// nodes bottoms out in sources.
pub struct ResourceSource {
    interpreter: SharedInterpreter,
    capacity: f64,
    context: Option<SharedResourceContext>,
}

#[derive(Clone)]
pub struct SharedResourceSource(SharedObject<ResourceSource>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Resource Sources
impl SharedResourceSource {
    /// Creates a source with the given capacity in units/s.
    pub fn new(interpreter: &SharedInterpreter, capacity: f64) -> Result<Self, Fail> {
        if !capacity.is_finite() || capacity < 0.0 {
            let cause: String = format!("invalid capacity (capacity={:?})", capacity);
            error!("new(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        Ok(Self(SharedObject::<ResourceSource>::new(ResourceSource {
            interpreter: interpreter.clone(),
            capacity,
            context: None,
        })))
    }

    /// Changes the capacity of the resource. The consumer, if any, is
    /// notified and the grant is re-clamped.
    pub fn set_capacity(&mut self, capacity: f64) -> Result<(), Fail> {
        if !capacity.is_finite() || capacity < 0.0 {
            let cause: String = format!("invalid capacity (capacity={:?})", capacity);
            error!("set_capacity(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        self.capacity = capacity;
        let context: Option<SharedResourceContext> = self.context.clone();
        if let Some(mut ctx) = context {
            if ctx.state() != ResourceState::Stopped {
                ctx.set_capacity(capacity)?;
                let granted: f64 = ctx.demand().min(capacity);
                ctx.set_speed(granted);
            }
        }
        Ok(())
    }

    /// Running totals of the mediated context. Zeroes when no consumer was
    /// ever attached.
    pub fn counters(&self) -> Counters {
        match &self.context {
            Some(ctx) => ctx.counters(),
            None => Counters::default(),
        }
    }

    /// Samples the context up to the current virtual instant and returns the
    /// totals.
    pub fn sample(&mut self) -> Result<Counters, Fail> {
        let context: Option<SharedResourceContext> = self.context.clone();
        if let Some(mut ctx) = context {
            ctx.flush(true)?;
            return Ok(ctx.counters());
        }
        Ok(Counters::default())
    }

    /// The context currently mediated by this source, if any.
    pub fn context(&self) -> Option<SharedResourceContext> {
        self.context.clone()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl ProviderLogic for SourceLogic {
    fn on_push(&mut self, ctx: &mut SharedResourceContext, limit: f64) {
        let granted: f64 = limit.min(ctx.capacity());
        ctx.set_speed(granted);
    }

    fn on_finish(&mut self, ctx: &mut SharedResourceContext) {
        trace!("on_finish(): source consumer finished (token={:?})", ctx.token());
    }
}

impl ResourceProvider for SharedResourceSource {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        if let Some(ctx) = &self.context {
            if ctx.state() != ResourceState::Stopped {
                let cause: &str = "source already has a consumer";
                error!("start_consumer(): {}", cause);
                return Err(Fail::new(libc::EBUSY, cause));
            }
        }
        let capacity: f64 = self.capacity;
        let logic: SharedBox<dyn ProviderLogic> = SharedBox::<dyn ProviderLogic>::new(Box::new(SourceLogic));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        let mut ctx: SharedResourceContext = interpreter.new_context(consumer, logic);
        ctx.set_capacity(capacity)?;
        self.context = Some(ctx.clone());
        ctx.start()
    }

    fn capacity(&self) -> f64 {
        self.capacity
    }

    fn speed(&self) -> f64 {
        match &self.context {
            Some(ctx) => ctx.speed(),
            None => 0.0,
        }
    }

    fn demand(&self) -> f64 {
        match &self.context {
            Some(ctx) => ctx.demand(),
            None => 0.0,
        }
    }

    fn state(&self) -> ResourceState {
        match &self.context {
            Some(ctx) => ctx.state(),
            None => ResourceState::Pending,
        }
    }

    fn interrupt(&mut self) -> Result<(), Fail> {
        let context: Option<SharedResourceContext> = self.context.clone();
        match context {
            Some(mut ctx) => ctx.interrupt(),
            None => Ok(()),
        }
    }

    fn cancel(&mut self) -> Result<(), Fail> {
        let context: Option<SharedResourceContext> = self.context.clone();
        match context {
            Some(mut ctx) => ctx.cancel(),
            None => Ok(()),
        }
    }
}

impl Deref for SharedResourceSource {
    type Target = ResourceSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedResourceSource {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

#[cfg(test)]
mod tests {
    use super::SharedResourceSource;
    use crate::{
        resource::provider::ResourceProvider,
        runtime::SharedInterpreter,
        workload::FlatWorkload,
    };
    use ::anyhow::Result;
    use ::std::time::{
        Duration,
        Instant,
    };

    /// Tests that attaching a second consumer to an occupied source fails.
    #[test]
    fn second_consumer_is_rejected() -> Result<()> {
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(Instant::now());
        let mut source: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

        source.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(60))?))?;
        let result = source.start_consumer(Box::new(FlatWorkload::new(500.0, Duration::from_secs(60))?));
        crate::ensure_eq!(result.is_err(), true);

        Ok(())
    }

    /// Tests that a freed source accepts a replacement consumer.
    #[test]
    fn stopped_source_accepts_replacement() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut source: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

        source.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(10))?))?;
        interpreter.advance_clock(now + Duration::from_secs(10))?;

        source.start_consumer(Box::new(FlatWorkload::new(500.0, Duration::from_secs(10))?))?;
        crate::ensure_eq!(source.speed(), 500.0);

        Ok(())
    }

    /// Tests that lowering the capacity under the demand re-clamps the grant.
    #[test]
    fn capacity_change_reclamps_grant() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut source: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

        source.start_consumer(Box::new(FlatWorkload::new(1500.0, Duration::from_secs(60))?))?;
        crate::ensure_eq!(source.speed(), 1500.0);

        source.set_capacity(1000.0)?;
        crate::ensure_eq!(source.speed(), 1000.0);

        source.set_capacity(3000.0)?;
        crate::ensure_eq!(source.speed(), 1500.0);

        Ok(())
    }
}
