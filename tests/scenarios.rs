// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! End-to-end scheduling scenarios driven through the public surface of the
//! kernel: an interpreter, leaf sources, sharing nodes and workloads.

use ::anyhow::Result;
use ::flowkernel::{
    ensure_eq,
    Counters,
    DistributorOutput,
    ResourceProvider,
    SharedExclusiveSwitch,
    SharedInterpreter,
    SharedMaxMinAggregator,
    SharedMaxMinDistributor,
    SharedMaxMinSwitch,
    SharedResourceSource,
    SwitchOutput,
};
use ::flowkernel::workload::FlatWorkload;
use ::std::time::{
    Duration,
    Instant,
};

//======================================================================================================================
// Constants
//======================================================================================================================

const TEN_MINUTES: Duration = Duration::from_secs(600);

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// A single consumer whose demand fits the capacity is granted its full rate
/// for the whole interval and accrues no overcommit.
#[test]
fn single_fitting_consumer() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

    cpu.start_consumer(Box::new(FlatWorkload::new(1000.0, TEN_MINUTES)?))?;
    ensure_eq!(cpu.speed(), 1000.0);

    interpreter.advance_clock(t0 + TEN_MINUTES)?;
    let counters: Counters = cpu.sample()?;
    ensure_eq!(counters.demand(), 600000.0);
    ensure_eq!(counters.actual(), 600000.0);
    ensure_eq!(counters.overcommit(), 0.0);

    Ok(())
}

/// A single consumer demanding twice the capacity is granted the capacity and
/// overcommit accrues at the shortfall rate.
#[test]
fn single_overloaded_consumer() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;

    cpu.start_consumer(Box::new(FlatWorkload::new(4000.0, TEN_MINUTES)?))?;
    ensure_eq!(cpu.speed(), 2000.0);

    interpreter.advance_clock(t0 + TEN_MINUTES)?;
    let counters: Counters = cpu.sample()?;
    ensure_eq!(counters.demand(), 2400000.0);
    ensure_eq!(counters.actual(), 1200000.0);
    ensure_eq!(counters.overcommit(), 1200000.0);

    Ok(())
}

/// Two consumers whose combined demand exceeds the capacity both receive the
/// equal share, since both exceed it.
#[test]
fn two_consumers_over_capacity_split_equally() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 4000.0)?;
    let mut distributor: SharedMaxMinDistributor = SharedMaxMinDistributor::new(&interpreter, None);
    distributor.attach(&mut cpu)?;

    let mut first: DistributorOutput = distributor.new_output();
    let mut second: DistributorOutput = distributor.new_output();
    first.start_consumer(Box::new(FlatWorkload::new(6000.0, TEN_MINUTES)?))?;
    second.start_consumer(Box::new(FlatWorkload::new(5000.0, TEN_MINUTES)?))?;

    ensure_eq!(first.speed(), 2000.0);
    ensure_eq!(second.speed(), 2000.0);
    ensure_eq!(cpu.speed(), 4000.0);

    interpreter.advance_clock(t0 + TEN_MINUTES)?;
    let counters: Counters = distributor.counters();
    ensure_eq!(counters.actual(), 2400000.0);
    ensure_eq!(counters.overcommit(), counters.demand() - counters.actual());

    Ok(())
}

/// An under-demanding consumer is fully satisfied; the surplus flows to the
/// other consumer.
#[test]
fn under_demanding_consumer_is_satisfied() -> Result<()> {
    let t0: Instant = Instant::now();
    let interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 4000.0)?;
    let mut distributor: SharedMaxMinDistributor = SharedMaxMinDistributor::new(&interpreter, None);
    distributor.attach(&mut cpu)?;

    let mut small: DistributorOutput = distributor.new_output();
    let mut large: DistributorOutput = distributor.new_output();
    small.start_consumer(Box::new(FlatWorkload::new(1000.0, TEN_MINUTES)?))?;
    large.start_consumer(Box::new(FlatWorkload::new(3000.0, TEN_MINUTES)?))?;

    ensure_eq!(small.speed(), 1000.0);
    ensure_eq!(large.speed(), 3000.0);

    Ok(())
}

/// Adding an output when every input of an exclusive switch is bound raises a
/// capacity error and does not disturb the existing bindings.
#[test]
fn exclusive_switch_exhaustion() -> Result<()> {
    let t0: Instant = Instant::now();
    let interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
    let mut switch: SharedExclusiveSwitch = SharedExclusiveSwitch::new(&interpreter);
    switch.add_input(&mut cpu)?;

    let mut bound = switch.new_output()?;
    bound.start_consumer(Box::new(FlatWorkload::new(800.0, TEN_MINUTES)?))?;

    ensure_eq!(switch.new_output().is_err(), true);
    ensure_eq!(bound.speed(), 800.0);
    ensure_eq!(cpu.speed(), 800.0);

    Ok(())
}

/// The capacity bound holds through a composed topology: a switch pooling two
/// hosts never grants more than the pooled capacity, and load spreads across
/// inputs proportionally to capacity share.
#[test]
fn switch_preserves_capacity_bound_and_proportionality() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut small_host: SharedResourceSource = SharedResourceSource::new(&interpreter, 1000.0)?;
    let mut large_host: SharedResourceSource = SharedResourceSource::new(&interpreter, 3000.0)?;
    let mut switch: SharedMaxMinSwitch = SharedMaxMinSwitch::new(&interpreter, None);
    switch.add_input(&mut small_host)?;
    switch.add_input(&mut large_host)?;

    let mut first: SwitchOutput = switch.new_output();
    let mut second: SwitchOutput = switch.new_output();
    first.start_consumer(Box::new(FlatWorkload::new(3000.0, TEN_MINUTES)?))?;
    second.start_consumer(Box::new(FlatWorkload::new(3000.0, TEN_MINUTES)?))?;

    ensure_eq!(first.speed() + second.speed(), 4000.0);
    ensure_eq!(first.speed(), 2000.0);

    // Per unit of capacity, both hosts carry the same load.
    ensure_eq!(small_host.speed() / small_host.capacity(), large_host.speed() / large_host.capacity());

    interpreter.advance_clock(t0 + TEN_MINUTES)?;
    ensure_eq!(switch.counters().actual(), 2400000.0);

    Ok(())
}

/// An aggregator merges two hosts into one logical resource; a fitting demand
/// is spread proportionally and fully granted.
#[test]
fn aggregator_spreads_fitting_demand() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut small_host: SharedResourceSource = SharedResourceSource::new(&interpreter, 1000.0)?;
    let mut large_host: SharedResourceSource = SharedResourceSource::new(&interpreter, 3000.0)?;
    let mut aggregator: SharedMaxMinAggregator = SharedMaxMinAggregator::new(&interpreter);
    aggregator.add_input(&mut small_host)?;
    aggregator.add_input(&mut large_host)?;

    let mut output = aggregator.output();
    output.start_consumer(Box::new(FlatWorkload::new(2000.0, TEN_MINUTES)?))?;

    ensure_eq!(aggregator.capacity(), 4000.0);
    ensure_eq!(aggregator.speed(), 2000.0);
    ensure_eq!(small_host.speed(), 500.0);
    ensure_eq!(large_host.speed(), 1500.0);

    interpreter.advance_clock(t0 + TEN_MINUTES)?;
    ensure_eq!(aggregator.counters().actual(), 1200000.0);
    ensure_eq!(aggregator.counters().overcommit(), 0.0);

    Ok(())
}

/// Batching: starting several sibling consumers inside one batch coalesces
/// the recomputation, and the post-batch state matches the unbatched one.
#[test]
fn batched_attach_converges() -> Result<()> {
    let t0: Instant = Instant::now();
    let mut interpreter: SharedInterpreter = SharedInterpreter::new(t0);
    let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 4000.0)?;
    let mut distributor: SharedMaxMinDistributor = SharedMaxMinDistributor::new(&interpreter, None);
    distributor.attach(&mut cpu)?;

    let mut first: DistributorOutput = distributor.new_output();
    let mut second: DistributorOutput = distributor.new_output();

    interpreter.push_batch();
    first.start_consumer(Box::new(FlatWorkload::new(6000.0, TEN_MINUTES)?))?;
    second.start_consumer(Box::new(FlatWorkload::new(5000.0, TEN_MINUTES)?))?;
    interpreter.pop_batch()?;

    ensure_eq!(first.speed(), 2000.0);
    ensure_eq!(second.speed(), 2000.0);

    Ok(())
}
