//! Revenge memory: actors who killed kingdom units are hunted while they are remembered
//!
//! Per actor: Unknown → Remembered(expiry) → forgotten (expiry reached).
//! Retaliation happens on the kill itself and again whenever a remembered
//! actor is seen back inside the territory.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::config::RevengeConfig;
use crate::core::types::{EntityId, Tick};
use crate::kingdom::territory::Territory;
use crate::kingdom::units::Roster;
use crate::world::{UnitHandle, WorldPort};

/// A remembered actor, as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevengeRecord {
    pub actor: EntityId,
    pub expires_at: Tick,
}

/// Actor → tick at which the kingdom forgets it
#[derive(Debug, Clone, Default)]
pub struct RevengeTracker {
    memory: AHashMap<EntityId, Tick>,
}

impl RevengeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    pub fn is_remembered(&self, actor: EntityId) -> bool {
        self.memory.contains_key(&actor)
    }

    pub fn expiry_of(&self, actor: EntityId) -> Option<Tick> {
        self.memory.get(&actor).copied()
    }

    /// Remember `actor` until `now + memory_duration`
    pub fn remember(&mut self, actor: EntityId, now: Tick, config: &RevengeConfig) {
        self.memory.insert(actor, now + config.memory_duration);
    }

    /// Remember the killer and send every unit in the territory after it
    ///
    /// Returns the number of units ordered to retaliate. An unresolvable
    /// killer is still remembered so a later return can be answered.
    pub fn on_unit_killed<W: WorldPort>(
        &mut self,
        killer: EntityId,
        now: Tick,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        config: &RevengeConfig,
    ) -> usize {
        self.remember(killer, now, config);

        let Some(actor) = world.resolve_actor(killer).filter(|a| a.alive) else {
            tracing::debug!(kingdom = %territory.name(), %killer, "killer out of reach, remembered only");
            return 0;
        };

        let units: Vec<UnitHandle> = world
            .find_friendly_units(territory.center(), f64::from(territory.radius()), None)
            .into_iter()
            .filter(|u| u.alive)
            .collect();

        for unit in &units {
            world.set_target(unit.id, Some(actor.id));
            roster.record_target(unit.id, Some(actor.id));
        }

        territory.record(format!("Revenge: {} units sent after a killer", units.len()));
        tracing::warn!(
            kingdom = %territory.name(),
            %killer,
            units = units.len(),
            expires_at = now + config.memory_duration,
            "retaliating against killer"
        );
        units.len()
    }

    /// Forget every actor whose expiry is at or before `now`
    pub fn sweep(&mut self, now: Tick) -> usize {
        let before = self.memory.len();
        self.memory.retain(|_, expiry| *expiry > now);
        let removed = before - self.memory.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.memory.len(), "revenge memory swept");
        }
        removed
    }

    /// Dispatch squads against remembered actors that are back inside the border
    ///
    /// Squads are built from the nearest unassigned units; the size is
    /// clamp(available, min_squad, max_squad), never more than available.
    /// Returns the number of units dispatched.
    pub fn check_returnees<W: WorldPort>(
        &mut self,
        now: Tick,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        config: &RevengeConfig,
    ) -> usize {
        self.sweep(now);
        if self.memory.is_empty() {
            return 0;
        }

        let mut actors: Vec<EntityId> = self.memory.keys().copied().collect();
        actors.sort();

        let mut free: Vec<UnitHandle> = world
            .find_friendly_units(territory.center(), f64::from(territory.radius()), None)
            .into_iter()
            .filter(UnitHandle::is_free)
            .collect();
        let mut dispatched = 0;

        for actor_id in actors {
            let Some(actor) = world.resolve_actor(actor_id).filter(|a| a.alive) else {
                continue;
            };
            if !territory.contains(&actor.position) {
                continue;
            }

            if free.is_empty() {
                tracing::debug!(kingdom = %territory.name(), actor = %actor_id, "returnee spotted, no free units");
                continue;
            }

            let size = squad_size(free.len(), config);
            free.sort_by_key(|u| OrderedFloat(u.position.distance_sq(&actor.position)));
            let squad: Vec<UnitHandle> = free.drain(..size).collect();

            for unit in &squad {
                world.set_target(unit.id, Some(actor.id));
                roster.record_target(unit.id, Some(actor.id));
            }
            dispatched += squad.len();

            territory.record(format!("Returning enemy spotted, {} units dispatched", squad.len()));
            tracing::warn!(
                kingdom = %territory.name(),
                actor = %actor_id,
                squad = squad.len(),
                "remembered enemy returned"
            );
        }

        dispatched
    }

    /// Remembered actors sorted by id
    pub fn records(&self) -> Vec<RevengeRecord> {
        let mut records: Vec<RevengeRecord> = self
            .memory
            .iter()
            .map(|(actor, expires_at)| RevengeRecord {
                actor: *actor,
                expires_at: *expires_at,
            })
            .collect();
        records.sort_by_key(|r| r.actor);
        records
    }

    pub fn restore(records: &[RevengeRecord]) -> Self {
        Self {
            memory: records.iter().map(|r| (r.actor, r.expires_at)).collect(),
        }
    }
}

/// clamp(available, min, max), bounded by what is actually available
pub fn squad_size(available: usize, config: &RevengeConfig) -> usize {
    available
        .clamp(config.min_squad, config.max_squad.max(config.min_squad))
        .min(available)
}

/// Leash a unit that chased its target past the border
///
/// Clears the target and sends the unit toward the center. Returns whether
/// the unit was leashed.
pub fn check_bounds<W: WorldPort>(unit: EntityId, territory: &Territory, roster: &mut Roster, world: &mut W) -> bool {
    let Some(handle) = world.resolve_unit(unit).filter(|u| u.alive) else {
        return false;
    };
    if handle.target.is_none() || territory.contains(&handle.position) {
        return false;
    }

    world.set_target(unit, None);
    world.move_to(unit, territory.center());
    roster.record_leash(unit);
    tracing::debug!(kingdom = %territory.name(), %unit, "unit leashed back to territory");
    true
}
