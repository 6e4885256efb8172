// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod command;
pub mod consumer;
pub mod context;
pub mod counters;
pub mod interference;
pub mod provider;
pub mod source;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::{
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
    source::SharedResourceSource,
};
