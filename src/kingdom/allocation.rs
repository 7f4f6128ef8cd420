//! Target allocation: who fights what, and where idle units stand
//!
//! Branches on the current threat level:
//! - Critical: every unit piles onto the hostiles nearest the castle, round-robin
//! - Medium: capped, score-based matching (or strength-aware matching)
//! - Low / None: no combat orders; unanchored units get posts and patrol sectors

use ahash::AHashMap;
use ordered_float::OrderedFloat;

use crate::core::config::{AllocationConfig, ThreatConfig};
use crate::core::types::{EntityId, Point3, Role};
use crate::kingdom::territory::Territory;
use crate::kingdom::threat::ThreatLevel;
use crate::kingdom::units::{Anchor, Roster, Unit};
use crate::world::{HostileHandle, WorldPort};

/// Hostile → committed units for the current allocation cycle
#[derive(Debug, Clone)]
pub struct TargetAssignment {
    attackers: AHashMap<EntityId, Vec<EntityId>>,
    cap: usize,
}

impl TargetAssignment {
    pub fn new(cap: usize) -> Self {
        Self {
            attackers: AHashMap::new(),
            cap,
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn clear(&mut self) {
        self.attackers.clear();
    }

    pub fn attackers(&self, target: EntityId) -> &[EntityId] {
        self.attackers.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, target: EntityId) -> usize {
        self.attackers(target).len()
    }

    pub fn has_room(&self, target: EntityId) -> bool {
        self.count(target) < self.cap
    }

    /// Commit `unit` to `target` unless the target is already at the cap
    pub fn try_assign(&mut self, target: EntityId, unit: EntityId) -> bool {
        let attackers = self.attackers.entry(target).or_default();
        if attackers.contains(&unit) {
            return true;
        }
        if attackers.len() >= self.cap {
            return false;
        }
        attackers.push(unit);
        true
    }

    pub fn target_of(&self, unit: EntityId) -> Option<EntityId> {
        self.attackers
            .iter()
            .find(|(_, units)| units.contains(&unit))
            .map(|(target, _)| *target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &[EntityId])> {
        self.attackers.iter().map(|(t, u)| (*t, u.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.attackers.values().all(Vec::is_empty)
    }
}

/// What one allocation cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocationOutcome {
    /// Units given a combat target
    pub engaged: usize,
    /// Units given a post or patrol anchor
    pub anchored: usize,
}

/// Matches units to hostiles and hands out idle positions
#[derive(Debug, Clone)]
pub struct TargetAllocator {
    assignments: TargetAssignment,
}

impl TargetAllocator {
    pub fn new(config: &AllocationConfig) -> Self {
        Self {
            assignments: TargetAssignment::new(config.max_attackers_per_target),
        }
    }

    pub fn assignments(&self) -> &TargetAssignment {
        &self.assignments
    }

    /// Run one allocation cycle for the given threat level
    pub fn assign<W: WorldPort>(
        &mut self,
        level: ThreatLevel,
        territory: &Territory,
        roster: &mut Roster,
        world: &mut W,
        threat: &ThreatConfig,
        config: &AllocationConfig,
    ) -> AllocationOutcome {
        self.assignments.clear();
        let units: Vec<Unit> = roster.ordered(None).into_iter().cloned().collect();
        if units.is_empty() {
            return AllocationOutcome::default();
        }

        let center = territory.center();
        let engaged = match level {
            ThreatLevel::Critical => {
                let hostiles = sorted_hostiles(world.find_hostiles(center, threat.critical_radius), center);
                self.assign_all_hands(&units, &hostiles, roster, world)
            }
            ThreatLevel::Medium => {
                let radius = f64::from(territory.radius());
                let hostiles = sorted_hostiles(world.find_hostiles(center, radius), center);
                let engaged = if config.strength_aware {
                    self.assign_by_strength(&units, &hostiles, roster, world, config)
                } else {
                    self.assign_weighted(&units, &hostiles, center, roster, world, config)
                };
                self.release_uncommitted(&units, roster, world);
                engaged
            }
            ThreatLevel::Low | ThreatLevel::None => 0,
        };

        let anchored = if engaged == 0 {
            distribute_idle(territory, roster, world, config)
        } else {
            0
        };

        tracing::debug!(
            kingdom = %territory.name(),
            ?level,
            engaged,
            anchored,
            "allocation cycle"
        );

        AllocationOutcome { engaged, anchored }
    }

    /// Every unit gets a target, cycling through hostiles closest to the castle first
    fn assign_all_hands<W: WorldPort>(
        &mut self,
        units: &[Unit],
        hostiles: &[HostileHandle],
        roster: &mut Roster,
        world: &mut W,
    ) -> usize {
        if hostiles.is_empty() {
            return 0;
        }

        for (index, unit) in units.iter().enumerate() {
            let target = hostiles[index % hostiles.len()].id;
            issue_target(unit.id, target, roster, world);
        }

        tracing::info!(units = units.len(), hostiles = hostiles.len(), "all hands to the castle");
        units.len()
    }

    /// Capped matching minimizing distance_to_unit + weight * distance_to_center
    fn assign_weighted<W: WorldPort>(
        &mut self,
        units: &[Unit],
        hostiles: &[HostileHandle],
        center: Point3,
        roster: &mut Roster,
        world: &mut W,
        config: &AllocationConfig,
    ) -> usize {
        let mut engaged = 0;

        for unit in units {
            let mut best: Option<(f64, EntityId)> = None;

            for hostile in hostiles {
                if !self.assignments.has_room(hostile.id) {
                    continue;
                }
                let score = unit.position.distance(&hostile.position)
                    + config.center_weight * hostile.position.distance(&center);
                // Strict comparison keeps the earlier hostile on ties
                if best.map_or(true, |(best_score, _)| score < best_score) {
                    best = Some((score, hostile.id));
                }
            }

            if let Some((_, target)) = best {
                if self.assignments.try_assign(target, unit.id) {
                    issue_target(unit.id, target, roster, world);
                    engaged += 1;
                }
            }
        }

        engaged
    }

    /// Health-aware matching with ally reinforcement as the fallback
    fn assign_by_strength<W: WorldPort>(
        &mut self,
        units: &[Unit],
        hostiles: &[HostileHandle],
        roster: &mut Roster,
        world: &mut W,
        config: &AllocationConfig,
    ) -> usize {
        let health_of: AHashMap<EntityId, f32> = units.iter().map(|u| (u.id, u.health)).collect();
        let hostile_health: AHashMap<EntityId, f32> = hostiles.iter().map(|h| (h.id, h.health)).collect();
        let mut current_target: AHashMap<EntityId, EntityId> = units
            .iter()
            .filter_map(|u| u.target.filter(|t| hostile_health.contains_key(t)).map(|t| (u.id, t)))
            .collect();
        let mut engaged = 0;

        for unit in units {
            let mut by_distance: Vec<&HostileHandle> = hostiles.iter().collect();
            by_distance.sort_by_key(|h| OrderedFloat(unit.position.distance_sq(&h.position)));

            let chosen = by_distance.into_iter().find(|hostile| {
                let committed: Vec<f32> = self
                    .assignments
                    .attackers(hostile.id)
                    .iter()
                    .filter_map(|id| health_of.get(id).copied())
                    .collect();
                self.assignments.has_room(hostile.id)
                    && should_engage(hostile.health, unit.health, &committed, config)
            });

            let target = match chosen {
                Some(hostile) => Some(hostile.id),
                None => self.ally_target(unit, units, &current_target, &hostile_health, config),
            };

            if let Some(target) = target {
                if self.assignments.try_assign(target, unit.id) {
                    issue_target(unit.id, target, roster, world);
                    current_target.insert(unit.id, target);
                    engaged += 1;
                }
            }
        }

        engaged
    }

    /// Clear leftover targets of units this cycle did not commit, so no
    /// hostile keeps more attackers than the assignment allows
    fn release_uncommitted<W: WorldPort>(&self, units: &[Unit], roster: &mut Roster, world: &mut W) {
        for unit in units {
            if unit.target.is_some() && self.assignments.target_of(unit.id).is_none() {
                world.set_target(unit.id, None);
                roster.record_target(unit.id, None);
            }
        }
    }

    /// Target of the nearest ally that still needs help with it
    fn ally_target(
        &self,
        unit: &Unit,
        units: &[Unit],
        current_target: &AHashMap<EntityId, EntityId>,
        hostile_health: &AHashMap<EntityId, f32>,
        config: &AllocationConfig,
    ) -> Option<EntityId> {
        let mut allies: Vec<(&Unit, EntityId)> = units
            .iter()
            .filter(|ally| ally.id != unit.id)
            .filter_map(|ally| current_target.get(&ally.id).map(|t| (ally, *t)))
            .collect();
        allies.sort_by_key(|(ally, _)| OrderedFloat(ally.position.distance_sq(&unit.position)));

        allies.into_iter().find_map(|(_, target)| {
            let health = *hostile_health.get(&target)?;
            let required = required_attackers(health, unit.health, config);
            let attackers = committed_on(target, current_target);
            (attackers < required && self.assignments.has_room(target)).then_some(target)
        })
    }
}

fn committed_on(target: EntityId, current_target: &AHashMap<EntityId, EntityId>) -> usize {
    current_target.values().filter(|t| **t == target).count()
}

/// Squad size needed against a hostile: clamp(ceil(hp * factor / unit_hp), min_squad, cap)
pub fn required_attackers(hostile_health: f32, unit_health: f32, config: &AllocationConfig) -> usize {
    let cap = config.max_attackers_per_target;
    if unit_health <= 0.0 {
        return cap;
    }
    let needed = (f64::from(hostile_health) * config.squad_health_factor / f64::from(unit_health)).ceil();
    let needed = if needed.is_finite() && needed > 0.0 { needed as usize } else { 0 };
    needed.clamp(config.min_squad.min(cap), cap)
}

/// Whether a unit should join the units already committed to a hostile
///
/// Weak hostiles (within `solo_health_ratio` of the unit) are fought alone.
/// Stronger ones take a squad, stopping once committed health would reach
/// `overkill_ratio` times the hostile's health.
pub fn should_engage(hostile_health: f32, unit_health: f32, committed: &[f32], config: &AllocationConfig) -> bool {
    if f64::from(hostile_health) <= f64::from(unit_health) * config.solo_health_ratio {
        return committed.is_empty();
    }

    if committed.len() >= required_attackers(hostile_health, unit_health, config) {
        return false;
    }

    let total: f64 = f64::from(unit_health) + committed.iter().map(|h| f64::from(*h)).sum::<f64>();
    total < f64::from(hostile_health) * config.overkill_ratio
}

/// Posts for guards and patrol sectors for unanchored, idle knights
///
/// Guard posts stay evenly spaced: when the guard count changes, guards
/// whose post no longer matches their slot are moved to it.
pub fn distribute_idle<W: WorldPort>(
    territory: &Territory,
    roster: &mut Roster,
    world: &mut W,
    config: &AllocationConfig,
) -> usize {
    let center = territory.center();
    let mut anchored = 0;

    let guards: Vec<(EntityId, Option<Anchor>)> = roster
        .ordered(Some(Role::Guard))
        .iter()
        .map(|u| (u.id, u.anchor))
        .collect();
    let guard_count = guards.len();
    for (index, (id, anchor)) in guards.into_iter().enumerate() {
        let post = guard_post(center, index, guard_count, config);
        if anchor == Some(Anchor::Post(post)) {
            continue;
        }
        world.set_guard_post(id, post);
        roster.record_anchor(id, Anchor::Post(post));
        anchored += 1;
    }

    let knights: Vec<(EntityId, bool)> = roster
        .ordered(Some(Role::Knight))
        .iter()
        .map(|u| (u.id, u.anchor.is_none() && u.target.is_none()))
        .collect();
    let patrol_radius = config.patrol_radius.min(Role::Knight.profile().max_patrol_radius);
    for (index, (id, eligible)) in knights.into_iter().enumerate() {
        if !eligible {
            continue;
        }
        let sector = index % config.sector_count;
        let anchor_point = sector_anchor(center, territory.radius(), sector, config);
        world.set_patrol_anchor(id, anchor_point, patrol_radius);
        roster.record_anchor(
            id,
            Anchor::Patrol {
                center: anchor_point,
                radius: patrol_radius,
            },
        );
        anchored += 1;
    }

    anchored
}

/// Patrol anchor of a sector: on the ring at `patrol_ring_fraction` of the radius
pub fn sector_anchor(center: Point3, radius: u32, sector: usize, config: &AllocationConfig) -> Point3 {
    let angle = std::f64::consts::TAU / config.sector_count as f64 * sector as f64;
    center
        .on_ring(angle, f64::from(radius) * config.patrol_ring_fraction)
        .block()
}

/// Guard post `index` of `count`, evenly spaced on the guard ring
pub fn guard_post(center: Point3, index: usize, count: usize, config: &AllocationConfig) -> Point3 {
    let angle = std::f64::consts::TAU * index as f64 / count.max(1) as f64;
    center.on_ring(angle, config.guard_ring_radius).block()
}

fn sorted_hostiles(hostiles: Vec<HostileHandle>, center: Point3) -> Vec<HostileHandle> {
    let mut hostiles: Vec<HostileHandle> = hostiles.into_iter().filter(|h| h.alive).collect();
    hostiles.sort_by_key(|h| OrderedFloat(h.position.distance_sq(&center)));
    hostiles
}

fn issue_target<W: WorldPort>(unit: EntityId, target: EntityId, roster: &mut Roster, world: &mut W) {
    world.set_target(unit, Some(target));
    roster.record_target(unit, Some(target));
}
