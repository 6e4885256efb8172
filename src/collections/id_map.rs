// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::rand::{
    rngs::SmallRng,
    RngCore,
    SeedableRng,
};
use ::std::{
    collections::HashMap,
    hash::Hash,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// This flag controls how the ids are allocated, either randomly or in a Fibonacci sequence. Randomized ids surface
/// stale-handle bugs early in debug builds; the Fibonacci sequence is cheaper.
#[cfg(debug_assertions)]
const RANDOMIZE: bool = true;
#[cfg(not(debug_assertions))]
const RANDOMIZE: bool = false;

/// Arbitrary size chosen to pre-allocate the hashmap.
const DEFAULT_SIZE: usize = 64;

/// Seed for the random number generator used to generate ids.
/// This value was chosen arbitrarily.
const ID_MAP_SEED: u64 = 42;
const MAX_RETRIES_ID_ALLOC: usize = 500;

//======================================================================================================================
// Structures
//======================================================================================================================

/// This data structure is a general-purpose map for obfuscating ids from external modules. It takes an external id
/// type and an internal id type and translates between the two. The ID types must be basic types that can be converted
/// back and forth between u64 and therefore each other. Handing out obfuscated ids means a stale external handle can
/// never alias a recycled internal slot: the lookup simply fails.
pub struct IdMap<E: Eq + Hash + From<u64> + Into<u64> + Copy, I: From<u64> + Into<u64> + Copy> {
    /// Map between external and internal ids.
    ids: HashMap<E, I>,
    /// Small random number generator for external ids.
    rng: SmallRng,
    /// For non-random id generation, we keep the last 2 id numbers for a Fibonacci calculation.
    last_id: u64,
    current_id: u64,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl<E: Eq + Hash + From<u64> + Into<u64> + Copy, I: From<u64> + Into<u64> + Copy> IdMap<E, I> {
    /// Retrieve the mapping for this external id if it exists.
    pub fn get(&self, external_id: &E) -> Option<I> {
        self.ids.get(external_id).copied()
    }

    /// Remove a mapping for the specified external id. If the mapping exists, then return the internal id mapped to
    /// the external id.
    pub fn remove(&mut self, external_id: &E) -> Option<I> {
        self.ids.remove(external_id)
    }

    /// Generate a new id and insert the mapping to the internal id. If the id is currently in use, keep generating
    /// until we find an unused id (up to a maximum number of tries).
    pub fn insert_with_new_id(&mut self, internal_id: I) -> E {
        if RANDOMIZE {
            for _ in 0..MAX_RETRIES_ID_ALLOC {
                let external_id: E = E::from(self.rng.next_u64());
                if !self.ids.contains_key(&external_id) {
                    self.ids.insert(external_id, internal_id);
                    return external_id;
                }
            }
            panic!("Could not find a valid external id");
        } else {
            // Use a Fibonacci sequence.
            let id: u64 = self.current_id;
            // Roll around.
            self.current_id = if self.current_id < u64::MAX - self.last_id {
                self.current_id + self.last_id
            } else {
                self.last_id - (u64::MAX - self.current_id)
            };
            self.last_id = id;
            let external_id: E = E::from(id);
            if self.ids.insert(external_id, internal_id).is_some() {
                panic!("Should not have a previous mapping with this id");
            }
            external_id
        }
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no mappings are live.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drops every mapping.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

/// A default implementation for the external to internal id map.
impl<E: Eq + Hash + From<u64> + Into<u64> + Copy, I: From<u64> + Into<u64> + Copy> Default for IdMap<E, I> {
    fn default() -> Self {
        Self {
            ids: HashMap::<E, I>::with_capacity(DEFAULT_SIZE),
            rng: SmallRng::seed_from_u64(ID_MAP_SEED),
            last_id: 1,
            current_id: 2,
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================

#[cfg(test)]
mod tests {
    use super::IdMap;
    use ::anyhow::Result;

    #[derive(Debug, Eq, PartialEq, Hash, Copy, Clone)]
    struct TestId(u64);

    impl From<u64> for TestId {
        fn from(val: u64) -> Self {
            TestId(val)
        }
    }

    impl From<TestId> for u64 {
        fn from(val: TestId) -> Self {
            val.0
        }
    }

    /// Tests that a removed mapping stops resolving.
    #[test]
    fn removed_id_stops_resolving() -> Result<()> {
        let mut ids: IdMap<TestId, u64> = IdMap::default();

        let id: TestId = ids.insert_with_new_id(7);
        crate::ensure_eq!(ids.get(&id), Some(7));
        crate::ensure_eq!(ids.remove(&id), Some(7));
        crate::ensure_eq!(ids.get(&id), None);
        crate::ensure_eq!(ids.len(), 0);

        Ok(())
    }

    /// Tests that successive allocations produce distinct external ids.
    #[test]
    fn allocated_ids_are_distinct() -> Result<()> {
        let mut ids: IdMap<TestId, u64> = IdMap::default();

        let first: TestId = ids.insert_with_new_id(0);
        let second: TestId = ids.insert_with_new_id(1);
        crate::ensure_neq!(first, second);
        crate::ensure_eq!(ids.len(), 2);

        Ok(())
    }
}
