// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the max-min fair switch: many input resources pooled
//! behind many outputs.
//!
//! Allocation runs in two stages per pass. First the water-filling algorithm
//! of the distributor runs over the sum of all input capacities, granting
//! each output its fair rate. Second, the aggregate granted rate is fanned
//! back across the inputs proportionally to each input's capacity share:
//! inputs are scaled by size, never fairness-ranked against each other.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    collections::id_map::IdMap,
    nodes::{
        InputId,
        OutputId,
    },
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

/// One pooled input of the switch.
struct InputSlot {
    id: InputId,
    ctx: Option<SharedResourceContext>,
    capacity: f64,
    /// Rate assigned by the last proportional fan-out.
    share: f64,
    finished: bool,
}

/// One output of the switch.
struct OutputSlot {
    id: OutputId,
    ctx: Option<SharedResourceContext>,
    key: Option<InterferenceKey>,
    limit: f64,
    granted: f64,
    finished: bool,
}

/// Max-Min Switch
pub struct MaxMinSwitch {
    interpreter: SharedInterpreter,
    flush_id: FlushId,
    inputs: Slab<InputSlot>,
    input_ids: IdMap<InputId, u64>,
    outputs: Slab<OutputSlot>,
    output_ids: IdMap<OutputId, u64>,
    /// Sum of the capacities of all active inputs.
    capacity: f64,
    /// Aggregate rate granted by the last fairness pass.
    granted_total: f64,
    counters: Counters,
    domain: Option<SharedBox<dyn InterferenceDomain>>,
    in_flush: bool,
}

#[derive(Clone)]
pub struct SharedMaxMinSwitch(SharedObject<MaxMinSwitch>);

/// Consumer proxy the switch starts on each input resource.
struct SwitchInput {
    node: SharedMaxMinSwitch,
    id: InputId,
}

/// Provider handle for one output of a [SharedMaxMinSwitch].
pub struct SwitchOutput {
    node: SharedMaxMinSwitch,
    id: OutputId,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Max-Min Switches
impl SharedMaxMinSwitch {
    /// Creates a switch with an optional interference domain.
    pub fn new(interpreter: &SharedInterpreter, domain: Option<SharedBox<dyn InterferenceDomain>>) -> Self {
        let mut interpreter: SharedInterpreter = interpreter.clone();
        let flush_id: FlushId = interpreter.alloc_flush_id();
        Self(SharedObject::<MaxMinSwitch>::new(MaxMinSwitch {
            interpreter,
            flush_id,
            inputs: Slab::<InputSlot>::new(),
            input_ids: IdMap::<InputId, u64>::default(),
            outputs: Slab::<OutputSlot>::new(),
            output_ids: IdMap::<OutputId, u64>::default(),
            capacity: 0.0,
            granted_total: 0.0,
            counters: Counters::default(),
            domain,
            in_flush: false,
        }))
    }

    /// Pools an input resource into the switch by starting a consumer proxy
    /// on it.
    pub fn add_input(&mut self, provider: &mut dyn ResourceProvider) -> Result<InputId, Fail> {
        let slot_key: usize = self.inputs.insert(InputSlot {
            id: InputId::from(0),
            ctx: None,
            capacity: 0.0,
            share: 0.0,
            finished: false,
        });
        let id: InputId = self.input_ids.insert_with_new_id(slot_key as u64);
        self.inputs
            .get_mut(slot_key)
            .expect("just allocated!")
            .id = id;
        trace!("add_input(): id={:?}, slot={:?}", id, slot_key);
        let proxy: SwitchInput = SwitchInput {
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

    /// Adds an output backed by the pooled input capacity.
    pub fn new_output(&mut self) -> SwitchOutput {
        self.new_output_with_key(None)
    }

    /// Adds an output tagged with an interference key.
    pub fn new_output_with_key(&mut self, key: Option<InterferenceKey>) -> SwitchOutput {
        let slot_key: usize = self.outputs.insert(OutputSlot {
            id: OutputId::from(0),
            ctx: None,
            key,
            limit: 0.0,
            granted: 0.0,
            finished: false,
        });
        let id: OutputId = self.output_ids.insert_with_new_id(slot_key as u64);
        self.outputs
            .get_mut(slot_key)
            .expect("just allocated!")
            .id = id;
        trace!("new_output(): id={:?}, slot={:?}", id, slot_key);
        SwitchOutput {
            node: self.clone(),
            id,
        }
    }

    /// Removes an output, closing its context if one is active.
    pub fn remove_output(&mut self, id: OutputId) -> Result<(), Fail> {
        let key: usize = self.output_slot_key(id)?;
        self.output_ids.remove(&id);
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

    /// Detaches every input and closes every output.
    pub fn clear(&mut self) -> Result<(), Fail> {
        let mut first_failure: Option<Fail> = None;
        let output_ctxs: Vec<SharedResourceContext> = self
            .outputs
            .iter()
            .filter_map(|(_, slot)| slot.ctx.clone())
            .collect();
        let input_ctxs: Vec<SharedResourceContext> = self
            .inputs
            .iter()
            .filter_map(|(_, slot)| slot.ctx.clone())
            .collect();
        for mut ctx in output_ctxs.into_iter().chain(input_ctxs.into_iter()) {
            if ctx.state() != ResourceState::Stopped {
                if let Err(e) = ctx.close() {
                    if first_failure.is_none() {
                        first_failure = Some(e);
                    }
                }
            }
        }
        self.outputs.clear();
        self.output_ids.clear();
        self.inputs.clear();
        self.input_ids.clear();
        self.capacity = 0.0;
        self.granted_total = 0.0;
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Sum of the capacities of all pooled inputs.
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

    fn output_slot_key(&self, id: OutputId) -> Result<usize, Fail> {
        match self.output_ids.get(&id) {
            Some(key) if self.outputs.contains(key as usize) => Ok(key as usize),
            _ => {
                let cause: String = format!("unknown output (id={:?})", id);
                error!("output_slot_key(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
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

    fn start_output(&mut self, id: OutputId, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let key: usize = self.output_slot_key(id)?;
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
        let key: usize = self.output_slot_key(id)?;
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

    /// Recomputes the pooled capacity and pushes it to every output. Runs
    /// whenever the active input set or any input capacity changes.
    fn recompute_capacity(&mut self) -> Result<(), Fail> {
        let capacity: f64 = self
            .inputs
            .iter()
            .filter(|(_, slot)| !slot.finished && slot.ctx.is_some())
            .map(|(_, slot)| slot.capacity)
            .sum();
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

    fn input_share(&self, id: InputId) -> f64 {
        match self.input_slot_key(id) {
            Ok(key) => self.inputs.get(key).map(|slot| slot.share).unwrap_or(0.0),
            Err(_) => 0.0,
        }
    }

    /// One allocation pass: water-fill the outputs against the pooled
    /// capacity, then fan the aggregate back across the inputs proportionally
    /// to capacity share.
    fn rebalance(&mut self) -> Result<(), Fail> {
        let mut first_failure: Option<Fail> = None;

        // Stage one: the distributor algorithm over the pooled capacity.
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
        let finished_outputs: Vec<usize> = self
            .outputs
            .iter()
            .filter(|(_, slot)| slot.finished)
            .map(|(key, _)| key)
            .collect();
        for key in finished_outputs {
            let slot: OutputSlot = self.outputs.remove(key);
            self.output_ids.remove(&slot.id);
        }
        let finished_inputs: Vec<usize> = self
            .inputs
            .iter()
            .filter(|(_, slot)| slot.finished)
            .map(|(key, _)| key)
            .collect();
        for key in finished_inputs {
            let slot: InputSlot = self.inputs.remove(key);
            self.input_ids.remove(&slot.id);
        }

        let capacity: f64 = self.capacity;
        let mut order: Vec<(usize, f64)> = self
            .outputs
            .iter()
            .filter(|(_, slot)| slot.ctx.is_some())
            .map(|(key, slot)| (key, slot.limit.min(capacity)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

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

        // Stage two: proportional fan-out across the inputs.
        let aggregate: f64 = self.granted_total;
        let shares: Vec<(usize, SharedResourceContext, f64)> = self
            .inputs
            .iter()
            .filter_map(|(key, slot)| {
                slot.ctx.clone().map(|ctx| {
                    let share: f64 = if capacity > 0.0 {
                        aggregate * slot.capacity / capacity
                    } else {
                        0.0
                    };
                    (key, ctx, share)
                })
            })
            .collect();
        for (key, mut ctx, share) in shares {
            if let Some(slot) = self.inputs.get_mut(key) {
                slot.share = share;
            }
            if ctx.state() == ResourceState::Active {
                if let Err(e) = ctx.push(Command::consume(share, None)?) {
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

/// Associate Functions for Switch Outputs
impl SwitchOutput {
    pub fn id(&self) -> OutputId {
        self.id
    }

    fn slot<R>(&self, f: impl FnOnce(&OutputSlot) -> R) -> Option<R> {
        let key: usize = self.node.output_slot_key(self.id).ok()?;
        self.node.outputs.get(key).map(f)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// The per-input consumer proxy forwards events and the assigned share of the
/// aggregate demand to its input resource.
impl ResourceConsumer for SwitchInput {
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        _now: Instant,
        _delta: Duration,
    ) -> Result<Option<Duration>, Fail> {
        let share: f64 = self.node.input_share(self.id);
        ctx.push(Command::consume(share, None)?)?;
        Ok(None)
    }

    fn on_event(&mut self, ctx: &mut SharedResourceContext, event: Event) -> Result<(), Fail> {
        let mut node: SharedMaxMinSwitch = self.node.clone();
        match event {
            Event::Start => node.input_started(self.id, ctx),
            Event::Capacity => node.input_capacity_changed(self.id, ctx.capacity()),
            Event::Exit => node.input_finished(self.id),
        }
    }

    fn on_failure(&mut self, cause: &Fail) {
        warn!("on_failure(): switch input failed (id={:?}, cause={:?})", self.id, cause);
        let mut node: SharedMaxMinSwitch = self.node.clone();
        if let Err(e) = node.input_finished(self.id) {
            warn!("on_failure(): could not retire input (error={:?})", e);
        }
    }
}

/// The switch provides every output context.
impl ProviderLogic for SharedMaxMinSwitch {
    fn on_push(&mut self, ctx: &mut SharedResourceContext, limit: f64) {
        let id: OutputId = OutputId::from(ctx.token());
        let key: usize = match self.output_slot_key(id) {
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
        let key: Option<InterferenceKey> = match self.output_slot_key(id) {
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
        if let Ok(key) = self.output_slot_key(id) {
            if let Some(slot) = self.outputs.get_mut(key) {
                slot.finished = true;
            }
        }
        if !self.in_flush {
            self.invalidate();
        }
    }
}

impl Flushable for SharedMaxMinSwitch {
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

impl ResourceProvider for SwitchOutput {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let mut node: SharedMaxMinSwitch = self.node.clone();
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
        let mut node: SharedMaxMinSwitch = self.node.clone();
        node.close_output(self.id)
    }
}

impl Deref for SharedMaxMinSwitch {
    type Target = MaxMinSwitch;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedMaxMinSwitch {
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
        SharedMaxMinSwitch,
        SwitchOutput,
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

    /// Tests that the pooled capacity is the sum of the input capacities and
    /// that load spreads across inputs proportionally to capacity share.
    #[test]
    fn load_spreads_proportionally_to_input_capacity() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut small: SharedResourceSource = SharedResourceSource::new(&interpreter, 1000.0)?;
        let mut large: SharedResourceSource = SharedResourceSource::new(&interpreter, 3000.0)?;
        let mut switch: SharedMaxMinSwitch = SharedMaxMinSwitch::new(&interpreter, None);

        switch.add_input(&mut small)?;
        switch.add_input(&mut large)?;
        crate::ensure_eq!(switch.capacity(), 4000.0);

        let mut output: SwitchOutput = switch.new_output();
        output.start_consumer(Box::new(FlatWorkload::new(2000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(output.speed(), 2000.0);
        // Aggregate of 2000 over a 1000+3000 pool: 500 and 1500.
        crate::ensure_eq!(small.speed(), 500.0);
        crate::ensure_eq!(large.speed(), 1500.0);

        Ok(())
    }

    /// Tests that outputs over a pooled capacity obey max-min fairness.
    #[test]
    fn outputs_share_pooled_capacity_fairly() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut first_cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut second_cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut switch: SharedMaxMinSwitch = SharedMaxMinSwitch::new(&interpreter, None);

        switch.add_input(&mut first_cpu)?;
        switch.add_input(&mut second_cpu)?;

        let mut greedy: SwitchOutput = switch.new_output();
        let mut modest: SwitchOutput = switch.new_output();
        greedy.start_consumer(Box::new(FlatWorkload::new(6000.0, Duration::from_secs(600))?))?;
        modest.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(modest.speed(), 1000.0);
        crate::ensure_eq!(greedy.speed(), 3000.0);
        crate::ensure_eq!(switch.speed(), 4000.0);

        Ok(())
    }

    /// Tests that removing an output redistributes the pool and leaves the
    /// remaining bindings intact.
    #[test]
    fn removed_output_releases_its_share() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut switch: SharedMaxMinSwitch = SharedMaxMinSwitch::new(&interpreter, None);
        switch.add_input(&mut cpu)?;

        let mut first: SwitchOutput = switch.new_output();
        let mut second: SwitchOutput = switch.new_output();
        first.start_consumer(Box::new(FlatWorkload::new(2000.0, Duration::from_secs(600))?))?;
        second.start_consumer(Box::new(FlatWorkload::new(2000.0, Duration::from_secs(600))?))?;
        crate::ensure_eq!(first.speed(), 1000.0);

        let second_id = second.id();
        switch.remove_output(second_id)?;
        crate::ensure_eq!(first.speed(), 2000.0);
        crate::ensure_eq!(switch.remove_output(second_id).is_err(), true);

        Ok(())
    }
}
