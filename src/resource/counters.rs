// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Structures
//==============================================================================

/// Per-entity running totals of requested and granted work, in work units.
///
/// Counters are mutated only by the context or sharing node that owns them, on
/// every non-zero-duration update. Telemetry reads them between updates and
/// may [reset](Counters::reset) them between export windows; nothing else
/// resets them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counters {
    /// Work requested.
    demand: f64,
    /// Work granted.
    actual: f64,
    /// Demand not granted due to capacity shortfall.
    overcommit: f64,
    /// Granted work discounted by a co-location performance penalty.
    interference: f64,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Counters
impl Counters {
    /// Records one update interval worth of requested and granted work.
    pub fn add(&mut self, demand_delta: f64, actual_delta: f64) {
        self.demand += demand_delta;
        self.actual += actual_delta;
        self.overcommit += (demand_delta - actual_delta).max(0.0);
    }

    /// Records granted work lost to interference.
    pub fn add_interference(&mut self, interference_delta: f64) {
        self.interference += interference_delta;
    }

    /// Clears all totals. Only telemetry calls this, between export windows.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn demand(&self) -> f64 {
        self.demand
    }

    pub fn actual(&self) -> f64 {
        self.actual
    }

    pub fn overcommit(&self) -> f64 {
        self.overcommit
    }

    pub fn interference(&self) -> f64 {
        self.interference
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::Counters;
    use ::anyhow::Result;

    /// Tests that overcommit accrues only when demand exceeds the grant.
    #[test]
    fn overcommit_accrues_on_shortfall() -> Result<()> {
        let mut counters: Counters = Counters::default();

        counters.add(1000.0, 1000.0);
        crate::ensure_eq!(counters.overcommit(), 0.0);

        counters.add(4000.0, 2000.0);
        crate::ensure_eq!(counters.demand(), 5000.0);
        crate::ensure_eq!(counters.actual(), 3000.0);
        crate::ensure_eq!(counters.overcommit(), 2000.0);

        Ok(())
    }

    /// Tests that a reset clears every total.
    #[test]
    fn reset_clears_all_totals() -> Result<()> {
        let mut counters: Counters = Counters::default();
        counters.add(10.0, 5.0);
        counters.add_interference(1.0);
        counters.reset();
        crate::ensure_eq!(counters, Counters::default());
        Ok(())
    }
}
