// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    resource::context::SharedResourceContext,
    runtime::fail::Fail,
};
use ::std::time::{
    Duration,
    Instant,
};

//==============================================================================
// Structures
//==============================================================================

/// Events delivered to a consumer by its context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    /// The context became Active.
    Start,
    /// The provider changed the capacity of the resource. The consumer may
    /// respond by pushing a new rate.
    Capacity,
    /// The context stopped and no further events will be delivered.
    Exit,
}

//==============================================================================
// Traits
//==============================================================================

/// Consumer side of the capability pair: the party that demands work from a
/// resource (a task on a CPU, a downstream sharing node on an upstream one).
pub trait ResourceConsumer {
    /// Pulled by the context on every scheduling pass. `delta` is the virtual
    /// time elapsed since the previous pull. The consumer pushes its desired
    /// command through `ctx` and returns the delay until the next required
    /// pull, or `None` to be pulled only on external interrupt.
    fn on_next(
        &mut self,
        ctx: &mut SharedResourceContext,
        now: Instant,
        delta: Duration,
    ) -> Result<Option<Duration>, Fail>;

    /// Invoked on lifecycle and capacity events.
    fn on_event(&mut self, ctx: &mut SharedResourceContext, event: Event) -> Result<(), Fail> {
        let _ = (ctx, event);
        Ok(())
    }

    /// Invoked exactly once when the context is force-stopped with `cause`.
    fn on_failure(&mut self, cause: &Fail) {
        warn!("on_failure(): consumer stopped (cause={:?})", cause);
    }
}
