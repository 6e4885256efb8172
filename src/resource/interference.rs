// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Structures
//==============================================================================

/// Opaque tenant/workload tag consumed by the fair-sharing nodes. The meaning
/// of a key is owned by whoever implements the [InterferenceDomain].
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
pub struct InterferenceKey(u64);

//==============================================================================
// Traits
//==============================================================================

/// Noisy-neighbor model plugged into the fair-sharing nodes.
///
/// `apply` maps a workload tag and the instantaneous load of the sharing node
/// (granted speed over capacity) to a performance multiplier in `[0, 1]`; a
/// multiplier below one means part of the granted work is lost to contention.
/// The kernel clamps out-of-range results.
pub trait InterferenceDomain {
    fn apply(&mut self, key: InterferenceKey, load: f64) -> f64;
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl From<u64> for InterferenceKey {
    /// Converts a [u64] to an [InterferenceKey].
    fn from(val: u64) -> Self {
        InterferenceKey(val)
    }
}

impl From<InterferenceKey> for u64 {
    /// Converts an [InterferenceKey] to a [u64].
    fn from(val: InterferenceKey) -> Self {
        val.0
    }
}
