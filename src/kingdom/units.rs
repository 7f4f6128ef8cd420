//! Kingdom units: role profiles, per-unit state machine and the roster
//!
//! Guards and knights share one record. Role-specific behavior comes from
//! the profile table and from the kind of anchor a unit holds (a fixed post
//! for guards, a patrol circle for knights).

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Point3, Role};
use crate::world::{UnitHandle, WorldSensor};

/// Role-specific constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleProfile {
    pub max_health: f32,
    pub armor: f32,
    pub attack_damage: f32,
    pub movement_speed: f64,
    pub follow_range: f64,
    /// How far a unit may drift from its post or patrol circle while idle
    pub tether: f64,
    /// Largest patrol radius the role accepts (0 for post-bound roles)
    pub max_patrol_radius: f64,
}

const GUARD_PROFILE: RoleProfile = RoleProfile {
    max_health: 25.0,
    armor: 15.0,
    attack_damage: 5.0,
    movement_speed: 0.35,
    follow_range: 48.0,
    tether: 5.0,
    max_patrol_radius: 0.0,
};

const KNIGHT_PROFILE: RoleProfile = RoleProfile {
    max_health: 30.0,
    armor: 20.0,
    attack_damage: 12.0,
    movement_speed: 0.32,
    follow_range: 48.0,
    tether: 5.0,
    max_patrol_radius: 30.0,
};

impl Role {
    pub fn profile(self) -> &'static RoleProfile {
        match self {
            Role::Guard => &GUARD_PROFILE,
            Role::Knight => &KNIGHT_PROFILE,
        }
    }

    /// The role preferred when recruiting under pressure
    pub fn strongest() -> Role {
        Role::Knight
    }

    /// Whether the role is distributed over patrol sectors (vs. fixed posts)
    pub fn patrols(self) -> bool {
        self.profile().max_patrol_radius > 0.0
    }
}

/// Where an idle unit belongs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    Post(Point3),
    Patrol { center: Point3, radius: f64 },
}

/// Explicit per-unit behavior state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitState {
    #[default]
    Idle,
    Assigned(EntityId),
    Returning,
    Patrolling,
}

/// Inputs to the unit state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitEvent {
    TargetAssigned(EntityId),
    TargetCleared,
    LeftTerritory,
    AnchorAssigned,
    ReachedHome,
}

impl UnitState {
    /// Deterministic transition function
    pub fn on(self, event: UnitEvent) -> UnitState {
        match (self, event) {
            (_, UnitEvent::TargetAssigned(target)) => UnitState::Assigned(target),
            (UnitState::Assigned(_), UnitEvent::TargetCleared) => UnitState::Returning,
            (_, UnitEvent::LeftTerritory) => UnitState::Returning,
            (UnitState::Returning, UnitEvent::ReachedHome) => UnitState::Patrolling,
            (UnitState::Idle, UnitEvent::AnchorAssigned) => UnitState::Patrolling,
            (state, _) => state,
        }
    }

    pub fn target(self) -> Option<EntityId> {
        match self {
            UnitState::Assigned(target) => Some(target),
            _ => None,
        }
    }
}

/// A unit known to the kingdom
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub id: EntityId,
    pub role: Role,
    pub position: Point3,
    pub health: f32,
    pub target: Option<EntityId>,
    pub anchor: Option<Anchor>,
    pub state: UnitState,
    /// Enlistment order, used for stable iteration
    pub ordinal: u64,
}

impl Unit {
    pub fn new(id: EntityId, role: Role, position: Point3, ordinal: u64) -> Self {
        Self {
            id,
            role,
            position,
            health: role.profile().max_health,
            target: None,
            anchor: None,
            state: UnitState::Idle,
            ordinal,
        }
    }

    /// Home point and the radius within which the unit counts as home
    pub fn home(&self, fallback: Point3) -> (Point3, f64) {
        match self.anchor {
            Some(Anchor::Post(post)) => (post, self.role.profile().tether),
            Some(Anchor::Patrol { center, radius }) => (center, radius),
            None => (fallback, self.role.profile().tether * 2.0),
        }
    }

    pub fn is_home(&self, fallback: Point3) -> bool {
        let (home, radius) = self.home(fallback);
        self.position.distance(&home) <= radius
    }

    fn apply(&mut self, event: UnitEvent) {
        self.state = self.state.on(event);
    }
}

/// All units the kingdom currently commands
#[derive(Debug, Clone, Default)]
pub struct Roster {
    units: AHashMap<EntityId, Unit>,
    next_ordinal: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.units.contains_key(&id)
    }

    /// Register a freshly spawned unit
    pub fn enlist(&mut self, id: EntityId, role: Role, position: Point3) -> &Unit {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        self.units.entry(id).or_insert_with(|| Unit::new(id, role, position, ordinal))
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Units in enlistment order, guards first when `role` is `None`
    pub fn ordered(&self, role: Option<Role>) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self
            .units
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .collect();
        units.sort_by_key(|u| (u.role, u.ordinal));
        units
    }

    pub fn count(&self, role: Role) -> usize {
        self.units.values().filter(|u| u.role == role).count()
    }

    /// Refresh the roster from the tick snapshot
    ///
    /// `handles` are the units inside the territory. Known units missing from
    /// it are resolved individually (they may be pursuing outside the border)
    /// and dropped once the world no longer reports them alive.
    pub fn sync(&mut self, handles: &[UnitHandle], sensor: &impl WorldSensor, home_fallback: Point3) {
        for handle in handles.iter().filter(|h| h.alive) {
            if !self.units.contains_key(&handle.id) {
                self.enlist(handle.id, handle.role, handle.position);
            }
            if let Some(unit) = self.units.get_mut(&handle.id) {
                refresh(unit, handle, home_fallback);
            }
        }

        let missing: Vec<EntityId> = self
            .units
            .keys()
            .filter(|id| !handles.iter().any(|h| h.id == **id && h.alive))
            .copied()
            .collect();

        for id in missing {
            match sensor.resolve_unit(id).filter(|h| h.alive) {
                Some(handle) => {
                    if let Some(unit) = self.units.get_mut(&id) {
                        refresh(unit, &handle, home_fallback);
                    }
                }
                None => {
                    self.units.remove(&id);
                }
            }
        }
    }

    /// Record a target order issued this tick
    pub fn record_target(&mut self, id: EntityId, target: Option<EntityId>) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.target = target;
            unit.apply(match target {
                Some(t) => UnitEvent::TargetAssigned(t),
                None => UnitEvent::TargetCleared,
            });
        }
    }

    pub fn record_anchor(&mut self, id: EntityId, anchor: Anchor) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.anchor = Some(anchor);
            unit.apply(UnitEvent::AnchorAssigned);
        }
    }

    /// Record that a unit was leashed back from outside the border
    pub fn record_leash(&mut self, id: EntityId) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.target = None;
            unit.apply(UnitEvent::LeftTerritory);
        }
    }

    /// Drop every anchor (used when the territory grows and sectors move)
    pub fn clear_anchors(&mut self) {
        for unit in self.units.values_mut() {
            unit.anchor = None;
        }
    }
}

fn refresh(unit: &mut Unit, handle: &UnitHandle, home_fallback: Point3) {
    unit.position = handle.position;
    unit.health = handle.health;

    if handle.target != unit.target {
        unit.target = handle.target;
        unit.apply(match handle.target {
            Some(t) => UnitEvent::TargetAssigned(t),
            None => UnitEvent::TargetCleared,
        });
    }

    if unit.state == UnitState::Returning && unit.is_home(home_fallback) {
        unit.apply(UnitEvent::ReachedHome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> EntityId {
        EntityId::from_raw(n)
    }

    #[test]
    fn test_knight_is_stronger() {
        assert!(Role::Knight.profile().max_health > Role::Guard.profile().max_health);
        assert_eq!(Role::strongest(), Role::Knight);
        assert!(Role::Knight.patrols());
        assert!(!Role::Guard.patrols());
    }

    #[test]
    fn test_state_transitions() {
        let t = id(99);
        let s = UnitState::Idle.on(UnitEvent::AnchorAssigned);
        assert_eq!(s, UnitState::Patrolling);
        let s = s.on(UnitEvent::TargetAssigned(t));
        assert_eq!(s, UnitState::Assigned(t));
        let s = s.on(UnitEvent::TargetCleared);
        assert_eq!(s, UnitState::Returning);
        let s = s.on(UnitEvent::AnchorAssigned);
        assert_eq!(s, UnitState::Returning);
        let s = s.on(UnitEvent::ReachedHome);
        assert_eq!(s, UnitState::Patrolling);
    }

    #[test]
    fn test_leash_overrides_assignment() {
        let s = UnitState::Assigned(id(1)).on(UnitEvent::LeftTerritory);
        assert_eq!(s, UnitState::Returning);
        assert_eq!(s.target(), None);
    }

    #[test]
    fn test_ordered_puts_guards_first() {
        let mut roster = Roster::new();
        roster.enlist(id(1), Role::Knight, Point3::default());
        roster.enlist(id(2), Role::Guard, Point3::default());
        roster.enlist(id(3), Role::Knight, Point3::default());
        let order: Vec<EntityId> = roster.ordered(None).iter().map(|u| u.id).collect();
        assert_eq!(order, vec![id(2), id(1), id(3)]);
        assert_eq!(roster.count(Role::Knight), 2);
    }

    #[test]
    fn test_home_uses_anchor_radius() {
        let mut unit = Unit::new(id(1), Role::Knight, Point3::new(10.0, 0.0, 0.0), 0);
        unit.anchor = Some(Anchor::Patrol { center: Point3::default(), radius: 20.0 });
        assert!(unit.is_home(Point3::new(500.0, 0.0, 0.0)));
        unit.anchor = Some(Anchor::Patrol { center: Point3::default(), radius: 5.0 });
        assert!(!unit.is_home(Point3::default()));
    }
}
