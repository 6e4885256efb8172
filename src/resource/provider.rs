// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    resource::{
        consumer::ResourceConsumer,
        context::{
            ResourceState,
            SharedResourceContext,
        },
    },
    runtime::fail::Fail,
};

//==============================================================================
// Traits
//==============================================================================

/// Provider-side hooks invoked by a context. The provider behind a context
/// implements this to learn about fresh demand, elapsed-work updates and
/// termination; it grants rates back through
/// [SharedResourceContext::set_speed].
pub trait ProviderLogic {
    /// The consumer pushed a fresh command; `limit` is its requested rate. A
    /// leaf provider typically grants immediately, a fair-sharing node records
    /// the demand and schedules a re-balance.
    fn on_push(&mut self, ctx: &mut SharedResourceContext, limit: f64);

    /// One update interval worth of requested/granted work was materialized.
    fn on_update(&mut self, ctx: &mut SharedResourceContext, demand_delta: f64, actual_delta: f64) {
        let _ = (ctx, demand_delta, actual_delta);
    }

    /// The context reached Stopped (consumer exit, cancellation or failure).
    fn on_finish(&mut self, ctx: &mut SharedResourceContext);
}

/// Outward capability of a resource: the surface the placement layer uses to
/// attach consumers and the telemetry layer samples.
pub trait ResourceProvider {
    /// Attaches `consumer` and starts its context. A provider mediates at most
    /// one consumer at a time; attaching to an occupied provider fails with
    /// EBUSY.
    fn start_consumer(&mut self, consumer: Box<dyn ResourceConsumer>) -> Result<(), Fail>;

    /// Current capacity of the resource, in units/s.
    fn capacity(&self) -> f64;

    /// Rate currently granted to the consumer, in units/s.
    fn speed(&self) -> f64;

    /// Rate currently requested by the consumer, in units/s.
    fn demand(&self) -> f64;

    /// State of the mediated context, or Pending when no consumer is attached.
    fn state(&self) -> ResourceState;

    /// Asks the provider to re-evaluate and re-pull its consumer now instead
    /// of waiting for the declared deadline.
    fn interrupt(&mut self) -> Result<(), Fail>;

    /// Stops the mediated context immediately and synchronously.
    fn cancel(&mut self) -> Result<(), Fail>;
}
