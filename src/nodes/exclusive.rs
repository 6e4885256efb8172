// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Implementation of the exclusive switch: a static 1:1 binding between a
//! pool of input resources and a pool of outputs, with no sharing. Used when
//! isolation guarantees forbid multiplexing.
//!
//! Each input is wrapped in a pooled forwarder. Opening an output pops an
//! idle forwarder; closing it resets the forwarder and returns it to the
//! idle pool for reuse, never reallocation.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::{
    nodes::forward::SharedForwarder,
    resource::{
        consumer::ResourceConsumer,
        context::ResourceState,
        counters::Counters,
        provider::ResourceProvider,
    },
    runtime::{
        fail::Fail,
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

/// Exclusive Switch
pub struct ExclusiveSwitch {
    interpreter: SharedInterpreter,
    /// Forwarders not currently bound to an output.
    idle: Vec<SharedForwarder>,
    /// Number of inputs ever added, bound or idle.
    num_inputs: usize,
}

#[derive(Clone)]
pub struct SharedExclusiveSwitch(SharedObject<ExclusiveSwitch>);

/// One output of an [SharedExclusiveSwitch], bound 1:1 to an input resource.
pub struct ExclusiveOutput {
    switch: SharedExclusiveSwitch,
    /// Taken on close; a closed output rejects further use.
    forwarder: Option<SharedForwarder>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

/// Associate Functions for Exclusive Switches
impl SharedExclusiveSwitch {
    pub fn new(interpreter: &SharedInterpreter) -> Self {
        Self(SharedObject::<ExclusiveSwitch>::new(ExclusiveSwitch {
            interpreter: interpreter.clone(),
            idle: Vec::<SharedForwarder>::new(),
            num_inputs: 0,
        }))
    }

    /// Adds an input resource to the pool by wrapping it in a forwarder.
    pub fn add_input(&mut self, provider: &mut dyn ResourceProvider) -> Result<(), Fail> {
        let interpreter: SharedInterpreter = self.interpreter.clone();
        let forwarder: SharedForwarder = SharedForwarder::new(&interpreter, false);
        provider.start_consumer(Box::new(forwarder.clone()))?;
        self.idle.push(forwarder);
        self.num_inputs += 1;
        trace!("add_input(): pool now holds {:?} input(s)", self.num_inputs);
        Ok(())
    }

    /// Pops an idle input and binds it to a fresh output. Fails with ENOSPC
    /// when every input is bound; existing bindings are not disturbed.
    pub fn new_output(&mut self) -> Result<ExclusiveOutput, Fail> {
        match self.idle.pop() {
            Some(forwarder) => Ok(ExclusiveOutput {
                switch: self.clone(),
                forwarder: Some(forwarder),
            }),
            None => {
                let cause: &str = "no idle input available";
                error!("new_output(): {}", cause);
                Err(Fail::new(libc::ENOSPC, cause))
            },
        }
    }

    /// Number of inputs currently available for binding.
    pub fn num_idle(&self) -> usize {
        self.idle.len()
    }

    /// Number of inputs in the pool, bound or idle.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }
}

/// Associate Functions for Exclusive Outputs
impl ExclusiveOutput {
    /// Closes the output, resetting its forwarder and returning it to the
    /// idle pool. Using the output afterwards fails with EINVAL.
    pub fn close(&mut self) -> Result<(), Fail> {
        let mut forwarder: SharedForwarder = self.take_forwarder("close")?;
        forwarder.reset()?;
        let mut switch: SharedExclusiveSwitch = self.switch.clone();
        switch.idle.push(forwarder);
        Ok(())
    }

    /// Running totals of the bound forwarder.
    pub fn counters(&self) -> Result<Counters, Fail> {
        match &self.forwarder {
            Some(forwarder) => Ok(forwarder.counters()),
            None => Err(Fail::new(libc::EINVAL, "output is closed")),
        }
    }

    fn take_forwarder(&mut self, op: &str) -> Result<SharedForwarder, Fail> {
        match self.forwarder.take() {
            Some(forwarder) => Ok(forwarder),
            None => {
                let cause: String = format!("output is closed (op={:?})", op);
                error!("take_forwarder(): {}", cause);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }

    fn borrow_forwarder(&self) -> Result<&SharedForwarder, Fail> {
        match &self.forwarder {
            Some(forwarder) => Ok(forwarder),
            None => Err(Fail::new(libc::EINVAL, "output is closed")),
        }
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl ResourceProvider for ExclusiveOutput {
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail> {
        let mut forwarder: SharedForwarder = match &self.forwarder {
            Some(forwarder) => forwarder.clone(),
            None => {
                let cause: &str = "output is closed";
                error!("start_consumer(): {}", cause);
                return Err(Fail::new(libc::EINVAL, cause));
            },
        };
        forwarder.start_consumer(consumer)
    }

    fn capacity(&self) -> f64 {
        self.borrow_forwarder().map(|forwarder| forwarder.capacity()).unwrap_or(0.0)
    }

    fn speed(&self) -> f64 {
        self.borrow_forwarder().map(|forwarder| forwarder.speed()).unwrap_or(0.0)
    }

    fn demand(&self) -> f64 {
        self.borrow_forwarder().map(|forwarder| forwarder.demand()).unwrap_or(0.0)
    }

    fn state(&self) -> ResourceState {
        self.borrow_forwarder()
            .map(|forwarder| forwarder.state())
            .unwrap_or(ResourceState::Stopped)
    }

    fn interrupt(&mut self) -> Result<(), Fail> {
        let mut forwarder: SharedForwarder = self.borrow_forwarder()?.clone();
        forwarder.interrupt()
    }

    fn cancel(&mut self) -> Result<(), Fail> {
        let mut forwarder: SharedForwarder = self.borrow_forwarder()?.clone();
        forwarder.cancel()
    }
}

impl Deref for SharedExclusiveSwitch {
    type Target = ExclusiveSwitch;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SharedExclusiveSwitch {
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
        ExclusiveOutput,
        SharedExclusiveSwitch,
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

    /// Tests that opening more outputs than there are inputs fails with a
    /// capacity error and leaves existing bindings intact.
    #[test]
    fn exhausted_pool_rejects_new_output() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut switch: SharedExclusiveSwitch = SharedExclusiveSwitch::new(&interpreter);
        switch.add_input(&mut cpu)?;

        let mut output: ExclusiveOutput = switch.new_output()?;
        output.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(600))?))?;

        crate::ensure_eq!(switch.new_output().is_err(), true);
        crate::ensure_eq!(output.speed(), 1000.0);

        Ok(())
    }

    /// Tests that a closed output returns its input to the pool for reuse and
    /// rejects further use.
    #[test]
    fn closed_output_recycles_input() -> Result<()> {
        let now: Instant = Instant::now();
        let mut interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut switch: SharedExclusiveSwitch = SharedExclusiveSwitch::new(&interpreter);
        switch.add_input(&mut cpu)?;

        let mut first: ExclusiveOutput = switch.new_output()?;
        first.start_consumer(Box::new(FlatWorkload::new(1000.0, Duration::from_secs(600))?))?;
        interpreter.advance_clock(now + Duration::from_secs(10))?;
        first.close()?;
        crate::ensure_eq!(switch.num_idle(), 1);
        crate::ensure_eq!(first.start_consumer(Box::new(FlatWorkload::new(1.0, Duration::from_secs(1))?)).is_err(), true);

        // The recycled slot starts from pristine counters.
        let mut second: ExclusiveOutput = switch.new_output()?;
        crate::ensure_eq!(second.counters()?.actual(), 0.0);
        second.start_consumer(Box::new(FlatWorkload::new(500.0, Duration::from_secs(600))?))?;
        crate::ensure_eq!(second.speed(), 500.0);

        Ok(())
    }

    /// Tests that the 1:1 binding never shares an input between outputs.
    #[test]
    fn bindings_are_one_to_one() -> Result<()> {
        let now: Instant = Instant::now();
        let interpreter: SharedInterpreter = SharedInterpreter::new(now);
        let mut first_cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 1000.0)?;
        let mut second_cpu: SharedResourceSource = SharedResourceSource::new(&interpreter, 2000.0)?;
        let mut switch: SharedExclusiveSwitch = SharedExclusiveSwitch::new(&interpreter);
        switch.add_input(&mut first_cpu)?;
        switch.add_input(&mut second_cpu)?;

        let mut first: ExclusiveOutput = switch.new_output()?;
        let mut second: ExclusiveOutput = switch.new_output()?;
        first.start_consumer(Box::new(FlatWorkload::new(5000.0, Duration::from_secs(600))?))?;
        second.start_consumer(Box::new(FlatWorkload::new(5000.0, Duration::from_secs(600))?))?;

        // Each output is capped by its own input, not by the pool.
        let total: f64 = first.speed() + second.speed();
        crate::ensure_eq!(total, 3000.0);
        crate::ensure_eq!(switch.num_idle(), 0);

        Ok(())
    }
}
