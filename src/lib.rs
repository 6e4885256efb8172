// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Resource-sharing kernel for datacenter simulation.
//!
//! A discrete-event engine that models how a finite, time-varying processing
//! capacity (a CPU, a GPU, a link) is shared among competing consumers
//! running in virtual time. The kernel is single-threaded and deterministic:
//! time only moves when the embedding driver advances the interpreter's
//! clock, and every scheduling pass visits resources in a stable order.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

pub mod collections;
pub mod config;
pub mod nodes;
pub mod resource;
pub mod runtime;
pub mod workload;

pub use self::{
    config::Config,
    nodes::{
        AggregatorOutput,
        DistributorOutput,
        ExclusiveOutput,
        InputId,
        OutputId,
        SharedExclusiveSwitch,
        SharedForwarder,
        SharedMaxMinAggregator,
        SharedMaxMinDistributor,
        SharedMaxMinSwitch,
        SwitchOutput,
        Transform,
    },
    resource::{
        Command,
        Counters,
        Event,
        InterferenceDomain,
        InterferenceKey,
        ProviderLogic,
        ResourceConsumer,
        ResourceProvider,
        ResourceState,
        SharedResourceContext,
        SharedResourceSource,
    },
    runtime::{
        fail::Fail,
        SharedBox,
        SharedInterpreter,
        SharedObject,
    },
};

/// Ensures that two expressions are equal. As [assert_eq], but returns an
/// error instead of panicking, so test functions can use `?`.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => {{
        let left = $left;
        let right = $right;
        if left != right {
            ::anyhow::bail!(
                "ensure_eq failed: `{:?}` != `{:?}` ({}:{})",
                left,
                right,
                file!(),
                line!()
            );
        }
    }};
}

/// Ensures that two expressions are not equal.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => {{
        let left = $left;
        let right = $right;
        if left == right {
            ::anyhow::bail!(
                "ensure_neq failed: `{:?}` == `{:?}` ({}:{})",
                left,
                right,
                file!(),
                line!()
            );
        }
    }};
}
