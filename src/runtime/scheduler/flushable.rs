// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::fail::Fail;

//==============================================================================
// Structures
//==============================================================================

/// Identifies a flushable object in the scheduler. Every resource context and
/// every composite sharing node holds one, allocated by the interpreter. The
/// trampoline uses it to de-duplicate queued flush requests.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct FlushId(u64);

//==============================================================================
// Traits
//==============================================================================

/// An object whose scheduling state can be materialized on demand.
///
/// An intermediate flush only brings elapsed-time bookkeeping up to date; a
/// full flush additionally re-evaluates the object (re-pulling consumers,
/// re-running a fairness pass). Flushing an already-stopped object is a no-op.
pub trait Flushable {
    /// Returns the identifier of this flushable.
    fn id(&self) -> FlushId;

    /// Synchronously materializes this object's pending state.
    fn flush(&mut self, intermediate: bool) -> Result<(), Fail>;
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl From<u64> for FlushId {
    /// Converts a [u64] to a [FlushId].
    fn from(val: u64) -> Self {
        FlushId(val)
    }
}

impl From<FlushId> for u64 {
    /// Converts a [FlushId] to a [u64].
    fn from(val: FlushId) -> Self {
        val.0
    }
}
