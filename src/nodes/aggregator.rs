// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the max-min aggregator: many input resources merged into
//! one logical capacity, work fanned back out proportionally.
//!
//! The inverse composition of the distributor: the aggregator exposes a
//! single output whose capacity is the sum of the input capacities. A demand
//! pushed on the output is divided across the inputs proportionally to each
//! input's capacity fraction of the total; there is only one logical consumer
//! to satisfy, so no fairness ranking is involved.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::id_map::IdMap,
    nodes::InputId,
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

/// One merged input of the aggregator.
struct InputSlot {
    id: InputId,
    ctx: Option<SharedResourceContext>,
    capacity: f64,
    /// Rate assigned by the last proportional division.
    assigned: f64,
    finished: bool,
}

/// Max-Min Aggregator
pub struct MaxMinAggregator {
    interpreter: SharedInterpreter,
    inputs: Slab<InputSlot>,
    input_ids: IdMap<InputId, u64>,
    /// Context of the single downstream consumer, if one is attached.
    output: Option<SharedResourceContext>,
    /// Sum of the capacities of all active inputs.
    capacity: f64,
    counters: Counters,
}

#[derive(Clone)]
pub struct SharedMaxMinAggregator(SharedObject<MaxMinAggregator>);

/// Consumer proxy the aggregator starts on each input resource.
struct AggregatorInput {
    node: SharedMaxMinAggregator,
    id: InputId,
}

/// Provider handle for the single logical output of a
/// [SharedMaxMinAggregator].
pub struct AggregatorOutput {
    node: SharedMaxMinAggregator,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Max-Min Aggregators
impl SharedMaxMinAggregator {
    pub fn new(interpreter: &SharedInterpreter) -> Self {
        Self(SharedObject::<MaxMinAggregator>::new(MaxMinAggregator {
            interpreter: interpreter.clone(),
            inputs: Slab::<InputSlot>::new(),
            input_ids: IdMap::<InputId, u64>::default(),
            output: None,
            capacity: 0.0,
            counters: Counters::default(),
        }))
    }

    /// Merges an input resource into the aggregate by starting a consumer
    /// proxy on it.
    pub fn add_input(&mut self, provider: &mut dyn ResourceProvider) -> Result<InputId, Fail> {
        let slot_key: usize = self.inputs.insert(InputSlot {
            id: InputId::from(0),
            ctx: None,
            capacity: 0.0,
            assigned: 0.0,
            finished: false,
        });
        let id: InputId = self.input_ids.insert_with_new_id(slot_key as u64);
        self.inputs
            .get_mut(slot_key)
            .expect("just allocated!")
            .id = id;
        trace!("add_input(): id={:?}, slot={:?}", id, slot_key);
        let proxy: AggregatorInput = AggregatorInput {
            node: self.clone(),
            id,
        };
        match provider.start_consumer(Box::new(proxy)) {
            Ok(()) => Ok(id),
            Err(e) => {
                self.input_ids.remove(&id);
                self.inputs.remove(slot_key);
                Err(e)
            },
        }
    }

    /// The provider handle of the merged capacity. At most one consumer at a
    /// time.
    pub fn output(&self) -> AggregatorOutput {
        AggregatorOutput { node: self.clone() }
    }

    /// Sum of the capacities of all merged inputs.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Rate currently granted to the downstream consumer.
    pub fn speed(&self) -> f64 {
        match &self.output {
            Some(ctx) => ctx.speed(),
            None => 0.0,
        }
    }

    /// Running totals of the downstream consumer.
    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Clears the counters. Telemetry only, between export windows.
    pub fn reset_counters(&mut self) {
        self.counters.reset();
    }

    fn input_slot_key(&self, id: InputId) -> Result<usize, Fail> {
        match self.input_ids.get(&id) {
            Some(key) if self.inputs.contains(key as usize) => Ok(key as usize),
            _ => {
                let cause: String = format!("unknown input (id={:?})", id);
                error!("input_slot_key(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }

    /// Recomputes the advertised capacity, sweeps retired inputs and
    /// interrupts the downstream consumer so it can react.
    fn recompute_capacity(&mut self) -> Result<(), Fail> {
        let finished: Vec<usize> = self
            .inputs
            .iter()
            .filter(|(_, slot)| slot.finished)
            .map(|(key, _)| key)
            .collect();
        for key in finished {
            let slot: InputSlot = self.inputs.remove(key);
            self.input_ids.remove(&slot.id);
        }
        let capacity: f64 = self
            .inputs
            .iter()
            .filter(|(_, slot)| slot.ctx.is_some())
            .map(|(_, slot)| slot.capacity)
            .sum();
        self.capacity = capacity;
        let output: Option<SharedResourceContext> = self.output.clone();
        if let Some(mut ctx) = output {
            if ctx.state() == ResourceState::Active {
                ctx.set_capacity(capacity)?;
                ctx.interrupt()?;
            }
        }
        Ok(())
    }

    fn input_started(&mut self, id: InputId, ctx: &SharedResourceContext) -> Result<(), Fail> {
        let key: usize = self.input_slot_key(id)?;
        if let Some(slot) = self.inputs.get_mut(key) {
            slot.ctx = Some(ctx.clone());
            slot.capacity = ctx.capacity();
        }
        self.recompute_capacity()
    }

    fn input_capacity_changed(&mut self, id: InputId, capacity: f64) -> Result<(), Fail> {
        let key: usize = self.input_slot_key(id)?;
        if let Some(slot) = self.inputs.get_mut(key) {
            slot.capacity = capacity;
        }
        self.recompute_capacity()
    }

    fn input_finished(&mut self, id: InputId) -> Result<(), Fail> {
        if let Ok(key) = self.input_slot_key(id) {
            if let Some(slot) = self.inputs.get_mut(key) {
                slot.finished = true;
            }
        }
        self.recompute_capacity()
    }

    fn input_assigned(&self, id: InputId) -> f64 {
        match self.input_slot_key(id) {
            Ok(key) => self.inputs.get(key).map(|slot| slot.assigned).unwrap_or(0.0),
            Err(_) => 0.0,
        }
    }

    /// Divides a demand pushed on the output across the inputs proportionally
    /// to capacity fraction, and grants back the sum of what each input can
    /// actually deliver.
    fn fan_out(&mut self, limit: f64, idle: bool, exit: bool) -> Result<(), Fail> {
        let capacity: f64 = self.capacity;
        let mut granted: f64 = 0.0;
        let mut first_failure: Option<Fail> = None;
        let entries: Vec<(usize, SharedResourceContext, f64)> = self
            .inputs
            .iter()
            .filter_map(|(key, slot)| {
                slot.ctx.clone().map(|ctx| {
                    let assigned: f64 = if capacity > 0.0 {
                        limit * slot.capacity / capacity
                    } else {
                        0.0
                    };
                    (key, ctx, assigned)
                })
            })
            .collect();
        for (key, mut ctx, assigned) in entries {
            let input_capacity: f64 = self.inputs.get(key).map(|slot| slot.capacity).unwrap_or(0.0);
            if let Some(slot) = self.inputs.get_mut(key) {
                slot.assigned = if exit || idle { 0.0 } else { assigned };
            }
            if ctx.state() != ResourceState::Active {
                continue;
            }
            let command: Command = if exit {
                Command::exit()
            } else if idle {
                Command::idle(None)
            } else {
                Command::consume(assigned, None)?
            };
            if let Err(e) = ctx.push(command) {
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
            granted += assigned.min(input_capacity);
        }
        let output: Option<SharedResourceContext> = self.output.clone();
        if let Some(mut ctx) = output {
            if ctx.state() == ResourceState::Active && !exit {
                ctx.set_speed(granted);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start_output_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        if let Some(ctx) = &self.output {
            if ctx.state() != ResourceState::Stopped {
                let cause: &str = "aggregator output already has a consumer";
                error!("start_output_consumer(): {}", cause);
                return Err(Fail::new(libc::EBUSY, cause));
            }
        }
        let capacity: f64 = self.capacity;
        let logic: SharedBox<dyn ProviderLogic> = SharedBox::<dyn ProviderLogic>::new(Box::new(self.clone()));
        let mut interpreter: SharedInterpreter = self.interpreter.clone();
        let mut ctx: SharedResourceContext = interpreter.new_context(consumer, logic);
        ctx.set_capacity(capacity)?;
        self.output = Some(ctx.clone());
        ctx.start()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// The per-input consumer proxy forwards the assigned share of the output
/// demand to its input resource.
impl ResourceConsumer for AggregatorInput {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        _now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        let assigned: f64 = self.node.input_assigned(self.id);
        ctx.push(Command::consume(assigned, None)?)?;
        Ok(None)
    }

    fn on_event(&mut self, ctx: &mut SharedResourceContext, event: Event) -> Result<(), Fail> {
        let mut node: SharedMaxMinAggregator = self.node.clone();
        match event {
            Event::Start => node.input_started(self.id, ctx),
            Event::Capacity => node.input_capacity_changed(self.id, ctx.capacity()),
            Event::Exit => node.input_finished(self.id),
        }
    }

    fn on_failure(&mut self, cause: &Fail) {
        warn!(
            "on_failure(): aggregator input failed (id={:?}, cause={:?})",
            self.id, cause
        );
        let mut node: SharedMaxMinAggregator = self.node.clone();
        if let Err(e) = node.input_finished(self.id) {
            warn!("on_failure(): could not retire input (error={:?})", e);
        }
    }
}

/// The aggregator provides the single output context: every command pushed by
/// the downstream consumer is fanned out across the inputs.
impl ProviderLogic for SharedMaxMinAggregator {
    fn on_push(&mut self, ctx: &mut SharedResourceContext, limit: f64) {
        let idle: bool = ctx.is_idle();
        if let Err(e) = self.fan_out(limit, idle, false) {
            warn!("on_push(): fan-out failed (error={:?})", e);
        }
    }

    fn on_update(&mut self, _ctx: &mut SharedResourceContext, demand_delta: f64, actual_delta: f64) {
        self.counters.add(demand_delta, actual_delta);
    }

    fn on_finish(&mut self, _ctx: &mut SharedResourceContext) {
        self.output = None;
        if let Err(e) = self.fan_out(0.0, false, true) {
            warn!("on_finish(): fan-out failed (error={:?})", e);
        }
    }
}

impl ResourceProvider for AggregatorOutput {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let mut node: SharedMaxMinAggregator = self.node.clone();
        node.start_output_consumer(consumer)
    }

    fn capacity(&self) -> f64 {
        self.node.capacity
    }

    fn speed(&self) -> f64 {
        self.node.speed()
    }

    fn demand(&self) -> f64 {
        match &self.node.output {
            Some(ctx) => ctx.demand(),
            None => 0.0,
        }
    }

    fn state(&self) -> ResourceState {
        match &self.node.output {
            Some(ctx) => ctx.state(),
            None => ResourceState::Pending,
        }
    }

    fn interrupt(&mut self) -> Result<(), Fail> {
        let ctx: Option<SharedResourceContext> = self.node.output.clone();
        match ctx {
            Some(mut ctx) => ctx.interrupt(),
            None => Ok(()),
        }
    }

    fn cancel(&mut self) -> Result<(), Fail> {
        let ctx: Option<SharedResourceContext> = self.node.output.clone();
        match ctx {
            Some(mut ctx) => ctx.cancel(),
            None => Ok(()),
        }
    }
}

impl Deref for SharedMaxMinAggregator {
    type Target = MaxMinAggregator;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedMaxMinAggregator {
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
        AggregatorOutput,
        SharedMaxMinAggregator,
    };
    use crate::{
        resource::{
            provider::ResourceProvider,
            source::SharedResourceSource,
        },
        runtime::SharedInterpreter,
        workload::FlatWorkload,
    };
    use ::anyhow::Result;
    use ::std::time::{
        Duration,
        Instant,
    };

    /// Tests that the advertised capacity is the sum of the inputs and that a
    /// demand divides proportionally to capacity fraction.
    #[test]
    fn demand_divides_proportionally() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut small: SharedResourceSource = SharedResourceSource::new(&interpreter, 1000.0)?;
        let mut large: SharedResourceSource = SharedResourceSource::new(&interpreter, 3000.0)?;
        let mut aggregator: SharedMaxMinAggregator = SharedMaxMinAggregator::new(&interpreter);

        aggregator.add_input(&mut small)?;
        aggregator.add_input(&mut large)?;
        crate::ensure_eq!(aggregator.capacity(), 4000.0);

        let mut output: AggregatorOutput = aggregator.output();
        output.start_consumer(Box::new(FlatWorkload::new(2000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(small.speed(), 500.0);
        crate::ensure_eq!(large.speed(), 1500.0);
        crate::ensure_eq!(aggregator.speed(), 2000.0);

        Ok(())
    }

    /// Tests that a demand above the merged capacity grants exactly the
    /// merged capacity.
    #[test]
    fn overload_grants_merged_capacity() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut first: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut second: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut aggregator: SharedMaxMinAggregator = SharedMaxMinAggregator::new(&interpreter);

        aggregator.add_input(&mut first)?;
        aggregator.add_input(&mut second)?;

        let mut output: AggregatorOutput = aggregator.output();
        output.start_consumer(Box::new(FlatWorkload::new(6000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(first.speed(), 2000.0);
        crate::ensure_eq!(second.speed(), 2000.0);
        crate::ensure_eq!(aggregator.speed(), 4000.0);

        Ok(())
    }

    /// Tests that the downstream consumer exiting broadcasts Exit to every
    /// input.
    #[test]
    fn output_exit_broadcasts_to_inputs() -> Result<()> {
        use crate::resource::context::ResourceState;

        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut aggregator: SharedMaxMinAggregator = SharedMaxMinAggregator::new(&interpreter);
        aggregator.add_input(&mut cpu)?;

        let mut output: AggregatorOutput = aggregator.output();
        output.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(10))?))?;
        crate::ensure_eq!(cpu.speed(), 1000.0);

        interpreter.advance_clock(now + Duration::from_secs(10))?;
        crate::ensure_eq!(cpu.state(), ResourceState::Stopped);
        crate::ensure_eq!(aggregator.speed(), 0.0);

        Ok(())
    }

    /// Tests that an aggregate with no inputs grants nothing instead of
    /// faulting on the degenerate division.
    #[test]
    fn empty_aggregate_grants_nothing() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut aggregator: SharedMaxMinAggregator = SharedMaxMinAggregator::new(&interpreter);

        let mut output: AggregatorOutput = aggregator.output();
        output.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(aggregator.capacity(), 0.0);
        crate::ensure_eq!(aggregator.speed(), 0.0);

        Ok(())
    }
}
