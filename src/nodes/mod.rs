// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Composite sharing nodes. Every node is itself a provider and a consumer,
//! so nodes compose recursively: a host's CPU distributor output can be the
//! input of a cluster-level aggregator.

pub mod aggregator;
pub mod distributor;
pub mod exclusive;
pub mod forward;
pub mod switch;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::{
    aggregator::{
        AggregatorOutput,
        SharedMaxMinAggregator,
    },
    distributor::{
        DistributorOutput,
        SharedMaxMinDistributor,
    },
    exclusive::{
        ExclusiveOutput,
        SharedExclusiveSwitch,
    },
    forward::{
        SharedForwarder,
        Transform,
    },
    switch::{
        SharedMaxMinSwitch,
        SwitchOutput,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Identifies an output of a sharing node. Obfuscated: a stale handle held
/// after removal never aliases a recycled slot.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct OutputId(u64);

/// Identifies an input of a sharing node.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct InputId(u64);

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl From<u64> for OutputId {
    /// Converts a [u64] to an [OutputId].
    fn from(val: u64) -> Self {
        OutputId(val)
    }
}

impl From<OutputId> for u64 {
    /// Converts an [OutputId] to a [u64].
    fn from(val: OutputId) -> Self {
        val.0
    }
}

impl From<u64> for InputId {
    /// Converts a [u64] to an [InputId].
    fn from(val: u64) -> Self {
        InputId(val)
    }
}

impl From<InputId> for u64 {
    /// Converts an [InputId] to a [u64].
    fn from(val: InputId) -> Self {
        val.0
    }
}
