//! Registry of worlds and the kingdom founded in each
//!
//! Each world holds at most one kingdom. Slots share no mutable state, so
//! `tick_all` advances them in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::config::KingdomConfig;
use crate::core::error::{KingdomError, Result};
use crate::core::types::{Point3, Tick};
use crate::kingdom::state::{TerritoryState, TickReport};
use crate::world::WorldPort;

/// Name of a world (dimension, map, shard)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorldKey(pub String);

impl WorldKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for WorldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A world and its kingdom, if one was founded
#[derive(Debug)]
pub struct WorldSlot<W> {
    pub world: W,
    pub kingdom: Option<TerritoryState>,
}

/// Owns every world slot of a running simulation
#[derive(Debug)]
pub struct KingdomRegistry<W> {
    slots: BTreeMap<WorldKey, WorldSlot<W>>,
}

impl<W> Default for KingdomRegistry<W> {
    fn default() -> Self {
        Self { slots: BTreeMap::new() }
    }
}

impl<W: WorldPort> KingdomRegistry<W> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Register a world; replaces (and returns) any previous slot under the same key
    pub fn insert_world(&mut self, key: WorldKey, world: W) -> Option<WorldSlot<W>> {
        self.slots.insert(key, WorldSlot { world, kingdom: None })
    }

    pub fn slot(&self, key: &WorldKey) -> Option<&WorldSlot<W>> {
        self.slots.get(key)
    }

    pub fn slot_mut(&mut self, key: &WorldKey) -> Option<&mut WorldSlot<W>> {
        self.slots.get_mut(key)
    }

    pub fn kingdom(&self, key: &WorldKey) -> Option<&TerritoryState> {
        self.slots.get(key)?.kingdom.as_ref()
    }

    /// Found a kingdom in a registered world and draw its border
    pub fn found(
        &mut self,
        key: &WorldKey,
        name: impl Into<String>,
        center: Point3,
        config: KingdomConfig,
    ) -> Result<&mut TerritoryState> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| KingdomError::UnknownWorld(key.clone()))?;
        if slot.kingdom.is_some() {
            return Err(KingdomError::AlreadyFounded(key.clone()));
        }

        let state = TerritoryState::found(name, center, config);
        state.mark_border(&mut slot.world);
        tracing::info!(world = %key, kingdom = %state.territory().name(), "kingdom founded");
        Ok(slot.kingdom.insert(state))
    }

    /// Install a previously loaded kingdom
    pub fn restore(&mut self, key: &WorldKey, state: TerritoryState) -> Result<()> {
        let slot = self
            .slots
            .get_mut(key)
            .ok_or_else(|| KingdomError::UnknownWorld(key.clone()))?;
        if slot.kingdom.is_some() {
            return Err(KingdomError::AlreadyFounded(key.clone()));
        }
        slot.kingdom = Some(state);
        Ok(())
    }

    /// Kingdom whose territory contains `point` in the given world
    pub fn territory_at(&self, key: &WorldKey, point: &Point3) -> Option<&TerritoryState> {
        self.kingdom(key).filter(|k| k.territory().contains(point))
    }
}

impl<W: WorldPort + Send> KingdomRegistry<W> {
    /// Tick every founded kingdom, one worker per slot
    pub fn tick_all(&mut self, now: Tick) -> BTreeMap<WorldKey, TickReport> {
        self.slots
            .par_iter_mut()
            .filter_map(|(key, slot)| {
                let kingdom = slot.kingdom.as_mut()?;
                Some((key.clone(), kingdom.tick(now, &mut slot.world)))
            })
            .collect()
    }
}
