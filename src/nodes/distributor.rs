// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the max-min fair distributor: one input resource fanned
//! out to many outputs under max-min fairness.
//!
//! On every scheduling pass the distributor re-pulls its active outputs,
//! sorts them by ascending allowed rate and water-fills the input capacity
//! across them: processing outputs from least-demanding to most-demanding
//! guarantees that no output is denied capacity below what equal division
//! would give it, while under-demanding outputs never receive more than they
//! asked for, leaving the surplus for others.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::id_map::IdMap,
    nodes::OutputId,
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
        interference::{
            InterferenceDomain,
            InterferenceKey,
        },
        provider::{
            ProviderLogic,
            ResourceProvider,
        },
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
use ::slab::Slab;
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

/// One output of the distributor.
struct OutputSlot {
    id: OutputId,
    /// Context of the attached consumer, if one was started.
    ctx: Option<SharedResourceContext>,
    key: Option<InterferenceKey>,
    /// Rate most recently requested by the consumer.
    limit: f64,
    /// Rate granted by the last fairness pass.
    granted: f64,
    /// Marked when the context stops; swept before the next fairness pass.
    finished: bool,
}

/// Max-Min Distributor
pub struct MaxMinDistributor {
    interpreter: SharedInterpreter,
    flush_id: FlushId,
    /// Context mediating our consumption of the input resource.
    input: Option<SharedResourceContext>,
    attached: bool,
    /// Capacity of the input resource, passed through to every output.
    capacity: f64,
    /// Aggregate rate granted by the last fairness pass.
    granted_total: f64,
    outputs: Slab<OutputSlot>,
    ids: IdMap<OutputId, u64>,
    counters: Counters,
    domain: Option<SharedBox<dyn InterferenceDomain>>,
    /// Set while a fairness pass runs; re-entrant pushes only record demand.
    in_flush: bool,
}

#[derive(Clone)]
pub struct SharedMaxMinDistributor(SharedObject<MaxMinDistributor>);

/// Provider handle for one output of a [SharedMaxMinDistributor].
pub struct DistributorOutput {
    node: SharedMaxMinDistributor,
    id: OutputId,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Max-Min Distributors
impl SharedMaxMinDistributor {
    /// Creates a distributor with an optional interference domain. The input
    /// resource is bound separately with [attach](Self::attach).
    pub fn new(interpreter: &SharedInterpreter, domain: Option<SharedBox<dyn InterferenceDomain>>) -> Self {
        let mut interpreter: SharedInterpreter = interpreter.clone();
        let flush_id: FlushId = interpreter.alloc_flush_id();
        Self(SharedObject::<MaxMinDistributor>::new(MaxMinDistributor {
            interpreter,
            flush_id,
            input: None,
            attached: false,
            capacity: 0.0,
            granted_total: 0.0,
            outputs: Slab::<OutputSlot>::new(),
            ids: IdMap::<OutputId, u64>::default(),
            counters: Counters::default(),
            domain,
            in_flush: false,
        }))
    }

    /// Binds the distributor to its input resource by starting it as that
    /// resource's consumer. A distributor has exactly one input.
    pub fn attach(&mut self, provider: &mut dyn ResourceProvider) -> Result<(), Fail> {
        if self.attached {
            let cause: &str = "distributor is already attached to an input";
            error!("attach(): {}", cause);
            return Err(Fail::new(libc::EBUSY, cause));
        }
        self.attached = true;
        match provider.start_consumer(Box::new(self.clone())) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.attached = false;
                Err(e)
            },
        }
    }

    /// Adds an output. The returned handle is a provider: start a consumer on
    /// it to make the output participate in fairness passes.
    pub fn new_output(&mut self) -> DistributorOutput {
        self.new_output_with_key(None)
    }

    /// Adds an output tagged with an interference key.
    pub fn new_output_with_key(&mut self, key: Option<InterferenceKey>) -> DistributorOutput {
        let slot_key: usize = self.outputs.insert(OutputSlot {
            id: OutputId::from(0),
            ctx: None,
            key,
            limit: 0.0,
            granted: 0.0,
            finished: false,
        });
        let id: OutputId = self.ids.insert_with_new_id(slot_key as u64);
        self.outputs
            .get_mut(slot_key)
            .expect("just allocated!")
            .id = id;
        trace!("new_output(): id={:?}, slot={:?}", id, slot_key);
        DistributorOutput {
            node: self.clone(),
            id,
        }
    }

    /// Removes an output, closing its context if one is active.
    pub fn remove_output(&mut self, id: OutputId) -> Result<(), Fail> {
        let key: usize = self.slot_key(id)?;
        self.ids.remove(&id);
        let slot: OutputSlot = self.outputs.remove(key);
        trace!("remove_output(): id={:?}, slot={:?}", id, key);
        if let Some(mut ctx) = slot.ctx {
            if ctx.state() != ResourceState::Stopped {
                ctx.close()?;
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Capacity of the input resource.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Aggregate rate granted by the last fairness pass.
    pub fn speed(&self) -> f64 {
        self.granted_total
    }

    /// Running totals across all outputs.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Clears the counters. Telemetry only, between export windows.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    fn slot_key(&self, id: OutputId) -> Result<usize, Fail> {
        match self.ids.get(&id) {
            Some(key) if self.outputs.contains(key as usize) => Ok(key as usize),
            _ => {
                let cause: String = format!("unknown output (id={:?})", id);
                error!("slot_key(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }

    fn start_output(&mut self, id: OutputId, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let key: usize = self.slot_key(id)?;
        if let Some(slot) = self.outputs.get(key) {
            if let Some(ctx) = &slot.ctx {
                if ctx.state() != ResourceState::Stopped {
                    let cause: &str = "output already has a consumer";
                    error!("start_output(): {}", cause);
                    return Err(Fail::new(libc::EBUSY, cause));
                }
            }
        }
        let capacity: f64 = self.capacity;
        let logic: SharedBox<dyn ProviderLogic> = SharedBox::<dyn ProviderLogic>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        let mut ctx: SharedResourceContext = interpreter.new_context(consumer, logic);
        ctx.set_token(id.into());
        ctx.set_capacity(capacity)?;
        if let Some(slot) = self.outputs.get_mut(key) {
            slot.ctx = Some(ctx.clone());
            slot.limit = 0.0;
            slot.granted = 0.0;
            slot.finished = false;
        }
        ctx.start()
    }

    fn close_output(&mut self, id: OutputId) -> Result<(), Fail> {
        let key: usize = self.slot_key(id)?;
        let ctx: Option<SharedResourceContext> = self.outputs.get(key).and_then(|slot| slot.ctx.clone());
        if let Some(mut ctx) = ctx {
            if ctx.state() != ResourceState::Stopped {
                ctx.close()?;
            }
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        let flushable: SharedBox<dyn Flushable> = SharedBox::<dyn Flushable>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        interpreter.enqueue(flushable, false);
    }

    /// Propagates a capacity change of the input resource to every output.
    fn set_input_capacity(&mut self, capacity: f64) -> Result<(), Fail> {
        self.capacity = capacity;
        let ctxs: Vec<SharedResourceContext> = self
            .outputs
            .iter()
            .filter_map(|(_, slot)| slot.ctx.clone())
            .collect();
        for mut ctx in ctxs {
            if ctx.state() != ResourceState::Stopped {
                ctx.set_capacity(capacity)?;
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Closes every output. Used when the input resource goes away.
    fn teardown_outputs(&mut self) -> Result<(), Fail> {
        let ctxs: Vec<SharedResourceContext> = self
            .outputs
            .iter()
            .filter_map(|(_, slot)| slot.ctx.clone())
            .collect();
        let mut first_failure: Option<Fail> = None;
        for mut ctx in ctxs {
            if ctx.state() != ResourceState::Stopped {
                if let Err(e) = ctx.close() {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }
        self.outputs.clear();
        self.ids.clear();
        self.capacity = 0.0;
        self.granted_total = 0.0;
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// One fairness pass: re-pull, sweep, sort, water-fill, push upstream.
    fn rebalance(&mut self) -> Result<(), Fail> {
        let mut first_failure: Option<Fail> = None;

        // Pull every active output so its requested rate is fresh.
        let entries: Vec<(usize, SharedResourceContext)> = self
            .outputs
            .iter()
            .filter_map(|(key, slot)| slot.ctx.clone().map(|ctx| (key, ctx)))
            .collect();
        for (key, mut ctx) in entries {
            if ctx.state() == ResourceState::Active {
                if let Err(e) = ctx.repull() {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
            if ctx.state() == ResourceState::Stopped {
                if let Some(slot) = self.outputs.get_mut(key) {
                    slot.finished = true;
                }
            }
        }

        // Sweep finished slots. Two-phase: never remove while iterating.
        let finished: Vec<usize> = self
            .outputs
            .iter()
            .filter(|(_, slot)| slot.finished)
            .map(|(key, _)| key)
            .collect();
        for key in finished {
            let slot: OutputSlot = self.outputs.remove(key);
            self.ids.remove(&slot.id);
        }

        // Sort by ascending allowed rate; ties break on slot index so the
        // pass stays deterministic.
        let capacity: f64 = self.capacity;
        let mut order: Vec<(usize, f64)> = self
            .outputs
            .iter()
            .filter(|(_, slot)| slot.ctx.is_some())
            .map(|(key, slot)| (key, slot.limit.min(capacity)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        // Water-fill.
        let mut avail: f64 = capacity;
        let mut remaining: usize = order.len();
        for (key, allowed) in order {
            let granted: f64 = allowed.min(avail / remaining as f64);
            let ctx: Option<SharedResourceContext> = self.outputs.get(key).and_then(|slot| slot.ctx.clone());
            if let Some(mut ctx) = ctx {
                ctx.set_speed(granted);
            }
            if let Some(slot) = self.outputs.get_mut(key) {
                slot.granted = granted;
            }
            avail = (avail - granted).max(0.0);
            remaining -= 1;
        }
        self.granted_total = capacity - avail;

        // Push the aggregate demand upstream.
        let aggregate: f64 = self.granted_total;
        let input: Option<SharedResourceContext> = self.input.clone();
        if let Some(mut ctx) = input {
            if ctx.state() == ResourceState::Active {
                if let Err(e) = ctx.push(Command::consume(aggregate, None)?) {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Associate Functions for Distributor Outputs
impl DistributorOutput {
    pub fn id(&self) -> OutputId {
        self.id
    }

    fn slot<R>(&self, f: impl FnOnce(&OutputSlot) -> R) -> Option<R> {
        let key: usize = self.node.slot_key(self.id).ok()?;
        self.node.outputs.get(key).map(f)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// The distributor consumes its input resource: it forwards the aggregate
/// demand of its outputs and reacts to capacity changes.
impl ResourceConsumer for SharedMaxMinDistributor {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        _now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        let aggregate: f64 = self.granted_total;
        ctx.push(Command::consume(aggregate, None)?)?;
        Ok(None)
    }

    fn on_event(&mut self, ctx: &mut SharedResourceContext, event: Event) -> Result<(), Fail> {
        match event {
            Event::Start => {
                self.input = Some(ctx.clone());
                self.set_input_capacity(ctx.capacity())
            },
            Event::Capacity => self.set_input_capacity(ctx.capacity()),
            Event::Exit => {
                self.input = None;
                self.attached = false;
                self.teardown_outputs()
            },
        }
    }

    fn on_failure(&mut self, cause: &Fail) {
        warn!("on_failure(): input resource failed (cause={:?})", cause);
        self.input = None;
        self.attached = false;
        if let Err(e) = self.teardown_outputs() {
            warn!("on_failure(): teardown failed (error={:?})", e);
        }
    }
}

/// The distributor provides every output context: it records fresh demand,
/// accumulates counters and sweeps finished outputs.
impl ProviderLogic for SharedMaxMinDistributor {
    fn on_push(&mut self, ctx: &mut SharedResourceContext, limit: f64) {
        let id: OutputId = OutputId::from(ctx.token());
        let key: usize = match self.slot_key(id) {
            Ok(key) => key,
            Err(_) => return,
        };
        let changed: bool = match self.outputs.get_mut(key) {
            Some(slot) => {
                let changed: bool = slot.limit != limit;
                slot.limit = limit;
                changed
            },
            None => false,
        };
        if changed && !self.in_flush {
            self.invalidate();
        }
    }

    fn on_update(&mut self, ctx: &mut SharedResourceContext, demand_delta: f64, actual_delta: f64) {
        self.counters.add(demand_delta, actual_delta);
        let id: OutputId = OutputId::from(ctx.token());
        let key: Option<InterferenceKey> = match self.slot_key(id) {
            Ok(key) => self.outputs.get(key).and_then(|slot| slot.key),
            Err(_) => None,
        };
        let domain: Option<SharedBox<dyn InterferenceDomain>> = self.domain.clone();
        if let (Some(mut domain), Some(key)) = (domain, key) {
            let load: f64 = if self.capacity > 0.0 {
                self.granted_total / self.capacity
            } else {
                0.0
            };
            let perf: f64 = domain.apply(key, load).clamp(0.0, 1.0);
            self.counters.add_interference(actual_delta * (1.0 - perf));
        }
    }

    fn on_finish(&mut self, ctx: &mut SharedResourceContext) {
        let id: OutputId = OutputId::from(ctx.token());
        if let Ok(key) = self.slot_key(id) {
            if let Some(slot) = self.outputs.get_mut(key) {
                slot.finished = true;
            }
        }
        if !self.in_flush {
            self.invalidate();
        }
    }
}

impl Flushable for SharedMaxMinDistributor {
    fn id(&self) -> FlushId {
        self.flush_id
    }

    fn flush(&mut self, intermediate: bool) -> Result<(), Fail> {
        if intermediate {
            let ctxs: Vec<SharedResourceContext> = self
                .outputs
                .iter()
                .filter_map(|(_, slot)| slot.ctx.clone())
                .collect();
            for mut ctx in ctxs {
                ctx.flush(true)?;
            }
            return Ok(());
        }
        if self.in_flush {
            return Ok(());
        }
        self.in_flush = true;
        let result: Result<(), Fail> = self.rebalance();
        self.in_flush = false;
        result
    }
}

impl ResourceProvider for DistributorOutput {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let mut node: SharedMaxMinDistributor = self.node.clone();
        node.start_output(self.id, consumer)
    }

    fn capacity(&self) -> f64 {
        self.node.capacity
    }

    fn speed(&self) -> f64 {
        self.slot(|slot| slot.granted).unwrap_or(0.0)
    }

    fn demand(&self) -> f64 {
        self.slot(|slot| slot.limit).unwrap_or(0.0)
    }

    fn state(&self) -> ResourceState {
        self.slot(|slot| slot.ctx.as_ref().map(|ctx| ctx.state()))
            .flatten()
            .unwrap_or(ResourceState::Pending)
    }

    fn interrupt(&mut self) -> Result<(), Fail> {
        let ctx: Option<SharedResourceContext> = self.slot(|slot| slot.ctx.clone()).flatten();
        match ctx {
            Some(mut ctx) => ctx.interrupt(),
            None => Ok(()),
        }
    }

    fn cancel(&mut self) -> Result<(), Fail> {
        let mut node: SharedMaxMinDistributor = self.node.clone();
        node.close_output(self.id)
    }
}

impl Deref for SharedMaxMinDistributor {
    type Target = MaxMinDistributor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedMaxMinDistributor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.deref_mut()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

#[cfg(test)]
mod tests {
    use super::{
        DistributorOutput,
        SharedMaxMinDistributor,
    };
    use crate::{
        resource::{
            interference::{
                InterferenceDomain,
                InterferenceKey,
            },
            provider::ResourceProvider,
            source::SharedResourceSource,
        },
        runtime::{
            SharedBox,
            SharedInterpreter,
        },
        workload::FlatWorkload,
    };
    use ::anyhow::Result;
    use ::std::time::{
        Duration,
        Instant,
    };

    fn new_distributor(
        interpreter: &SharedInterpreter,
        capacity: f64,
        domain: Option<SharedBox<dyn InterferenceDomain>>,
    ) -> Result<(SharedResourceSource, SharedMaxMinDistributor)> {
        let mut source: SharedResourceSource = SharedResourceSource::new(interpreter, capacity)?;
        let mut distributor: SharedMaxMinDistributor = SharedMaxMinDistributor::new(interpreter, domain);
        distributor.attach(&mut source)?;
        Ok((source, distributor))
    }

    /// Tests that two outputs whose combined demand exceeds the capacity are
    /// granted the equal share.
    #[test]
    fn over_demanders_split_equally() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let (source, mut distributor) = new_distributor(&interpreter, 4000.0, None)?;

        let mut first: DistributorOutput = distributor.new_output();
        let mut second: DistributorOutput = distributor.new_output();
        first.start_consumer(Box::new(FlatWorkload::new(6000.0, Duration::from_secs(600))?))?;
        second.start_consumer(Box::new(FlatWorkload::new(5000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(first.speed(), 2000.0);
        crate::ensure_eq!(second.speed(), 2000.0);
        crate::ensure_eq!(distributor.speed(), 4000.0);
        crate::ensure_eq!(source.speed(), 4000.0);

        Ok(())
    }

    /// Tests that an under-demanding output is fully satisfied and the
    /// surplus goes to the other output.
    #[test]
    fn under_demander_keeps_surplus() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let (_source, mut distributor) = new_distributor(&interpreter, 4000.0, None)?;

        let mut small: DistributorOutput = distributor.new_output();
        let mut large: DistributorOutput = distributor.new_output();
        small.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(600))?))?;
        large.start_consumer(Box::new(FlatWorkload::new(3000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(small.speed(), 1000.0);
        crate::ensure_eq!(large.speed(), 3000.0);
        crate::ensure_eq!(distributor.speed(), 4000.0);

        Ok(())
    }

    /// Tests that the sum of granted rates never exceeds the input capacity
    /// and that freed capacity is redistributed when an output finishes.
    #[test]
    fn finished_output_frees_capacity() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let (_source, mut distributor) = new_distributor(&interpreter, 4000.0, None)?;

        let mut short: DistributorOutput = distributor.new_output();
        let mut long: DistributorOutput = distributor.new_output();
        short.start_consumer(Box::new(FlatWorkload::new(4000.0, Duration::from_secs(100))?))?;
        long.start_consumer(Box::new(FlatWorkload::new(4000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(short.speed(), 2000.0);
        crate::ensure_eq!(long.speed(), 2000.0);

        interpreter.advance_clock(now + Duration::from_secs(100))?;
        crate::ensure_eq!(long.speed(), 4000.0);

        Ok(())
    }

    /// Tests that counters accumulate demand, grants and overcommit across
    /// outputs.
    #[test]
    fn counters_accumulate_across_outputs() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let (_source, mut distributor) = new_distributor(&interpreter, 4000.0, None)?;

        let mut first: DistributorOutput = distributor.new_output();
        let mut second: DistributorOutput = distributor.new_output();
        first.start_consumer(Box::new(FlatWorkload::new(6000.0, Duration::from_secs(10))?))?;
        second.start_consumer(Box::new(FlatWorkload::new(5000.0, Duration::from_secs(10))?))?;

        interpreter.advance_clock(now + Duration::from_secs(10))?;

        crate::ensure_eq!(distributor.counters().demand(), 110000.0);
        crate::ensure_eq!(distributor.counters().actual(), 40000.0);
        crate::ensure_eq!(distributor.counters().overcommit(), 70000.0);

        Ok(())
    }

    /// Tests that granted work lost to interference is accounted separately.
    #[test]
    fn interference_discounts_granted_work() -> Result<()> {
        struct HalfDomain;

        impl InterferenceDomain for HalfDomain {
            fn apply(&mut self, _key: InterferenceKey, load: f64) -> f64 {
                if load >= 1.0 {
                    0.5
                } else {
                    1.0
                }
            }
        }

        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let domain: SharedBox<dyn InterferenceDomain> =
            SharedBox::<dyn InterferenceDomain>::new(Box::new(HalfDomain));
        let (_source, mut distributor) = new_distributor(&interpreter, 4000.0, Some(domain))?;

        let mut output: DistributorOutput =
            distributor.new_output_with_key(Some(InterferenceKey::from(1)));
        output.start_consumer(Box::new(FlatWorkload::new(6000.0, Duration::from_secs(10))?))?;

        interpreter.advance_clock(now + Duration::from_secs(10))?;

        // The node is fully loaded, so half of the granted work is lost.
        crate::ensure_eq!(distributor.counters().actual(), 40000.0);
        crate::ensure_eq!(distributor.counters().interference(), 20000.0);

        Ok(())
    }

    /// Tests that a stale output handle is rejected after removal.
    #[test]
    fn stale_output_handle_is_rejected() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let (_source, mut distributor) = new_distributor(&interpreter, 4000.0, None)?;

        let mut output: DistributorOutput = distributor.new_output();
        distributor.remove_output(output.id())?;

        let result = output.start_consumer(Box::new(FlatWorkload::new(100.0, Duration::from_secs(1))?));
        crate::ensure_eq!(result.is_err(), true);
        crate::ensure_eq!(distributor.remove_output(output.id()).is_err(), true);

        Ok(())
    }
}
