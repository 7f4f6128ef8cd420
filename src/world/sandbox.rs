//! In-memory world for tests, benchmarks and the demo binary
//!
//! Flat ground at a fixed height. Columns can be blocked to make spawn
//! searches fail. `advance` runs a crude movement and melee step so a demo
//! can watch the kingdom react; nothing in the core depends on it.

use ahash::AHashSet;

use crate::core::types::{EntityId, Point3, Role};
use crate::world::control::UnitController;
use crate::world::placement::{BorderMarkers, SpawnSurface};
use crate::world::sensor::{HostileHandle, UnitHandle, WorldSensor};

/// Number of border markers around a territory
pub const MARKER_COUNT: usize = 8;

/// Spawn columns with this many units within `CROWD_RADIUS` are rejected
const CROWD_LIMIT: usize = 2;
const CROWD_RADIUS: f64 = 3.0;
const MELEE_RANGE: f64 = 2.0;
const HOSTILE_SPEED: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxHostile {
    pub id: EntityId,
    pub position: Point3,
    pub health: f32,
    pub max_health: f32,
    pub attack: f32,
    pub is_player: bool,
    /// Where the hostile walks when nothing is in reach
    pub goal: Option<Point3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SandboxUnit {
    pub id: EntityId,
    pub role: Role,
    pub position: Point3,
    pub health: f32,
    pub target: Option<EntityId>,
    pub destination: Option<Point3>,
    pub post: Option<Point3>,
    pub patrol: Option<(Point3, f64)>,
}

/// Something `advance` resolved that the kingdom should hear about
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SandboxEvent {
    HostileSlain { hostile: EntityId, max_health: f32 },
    UnitKilled {
        unit: EntityId,
        position: Point3,
        killer: EntityId,
        is_player: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    ground_y: f64,
    blocked: AHashSet<(i64, i64)>,
    hostiles: Vec<SandboxHostile>,
    units: Vec<SandboxUnit>,
    markers: Vec<Point3>,
    next_id: u128,
}

impl SandboxWorld {
    pub fn new(ground_y: f64) -> Self {
        Self {
            ground_y,
            next_id: 1,
            ..Default::default()
        }
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn ground_y(&self) -> f64 {
        self.ground_y
    }

    /// Make the column at (x, z) unusable for spawning
    pub fn block_column(&mut self, x: f64, z: f64) {
        self.blocked.insert((x.floor() as i64, z.floor() as i64));
    }

    pub fn add_hostile(&mut self, position: Point3, health: f32) -> EntityId {
        self.insert_hostile(position, health, false)
    }

    /// A hostile that counts as a player for revenge purposes
    pub fn add_player(&mut self, position: Point3, health: f32) -> EntityId {
        self.insert_hostile(position, health, true)
    }

    fn insert_hostile(&mut self, position: Point3, health: f32, is_player: bool) -> EntityId {
        let id = self.allocate_id();
        self.hostiles.push(SandboxHostile {
            id,
            position,
            health,
            max_health: health,
            attack: 4.0,
            is_player,
            goal: None,
        });
        id
    }

    pub fn set_hostile_goal(&mut self, id: EntityId, goal: Point3) {
        if let Some(h) = self.hostiles.iter_mut().find(|h| h.id == id) {
            h.goal = Some(goal);
        }
    }

    pub fn move_hostile(&mut self, id: EntityId, position: Point3) {
        if let Some(h) = self.hostiles.iter_mut().find(|h| h.id == id) {
            h.position = position;
        }
    }

    /// Remove a hostile and drop every unit target pointing at it
    pub fn remove_hostile(&mut self, id: EntityId) -> Option<SandboxHostile> {
        let index = self.hostiles.iter().position(|h| h.id == id)?;
        for unit in self.units.iter_mut().filter(|u| u.target == Some(id)) {
            unit.target = None;
        }
        Some(self.hostiles.remove(index))
    }

    pub fn add_unit(&mut self, role: Role, position: Point3) -> EntityId {
        let id = self.allocate_id();
        self.units.push(SandboxUnit {
            id,
            role,
            position,
            health: role.profile().max_health,
            target: None,
            destination: None,
            post: None,
            patrol: None,
        });
        id
    }

    pub fn kill_unit(&mut self, id: EntityId) -> Option<SandboxUnit> {
        let index = self.units.iter().position(|u| u.id == id)?;
        Some(self.units.remove(index))
    }

    pub fn move_unit(&mut self, id: EntityId, position: Point3) {
        if let Some(u) = self.unit_mut(id) {
            u.position = position;
        }
    }

    pub fn clear_targets(&mut self) {
        for unit in &mut self.units {
            unit.target = None;
        }
    }

    pub fn unit(&self, id: EntityId) -> Option<&SandboxUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    fn unit_mut(&mut self, id: EntityId) -> Option<&mut SandboxUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn hostile(&self, id: EntityId) -> Option<&SandboxHostile> {
        self.hostiles.iter().find(|h| h.id == id)
    }

    pub fn units(&self) -> &[SandboxUnit] {
        &self.units
    }

    pub fn hostiles(&self) -> &[SandboxHostile] {
        &self.hostiles
    }

    pub fn markers(&self) -> &[Point3] {
        &self.markers
    }

    /// One step of movement and melee
    pub fn advance(&mut self) -> Vec<SandboxEvent> {
        let mut events = Vec::new();

        // Units close on their targets or walk to their destination
        for i in 0..self.units.len() {
            let unit = &self.units[i];
            let profile = unit.role.profile();
            let target = unit
                .target
                .and_then(|t| self.hostiles.iter().position(|h| h.id == t));

            match target {
                Some(h) => {
                    let goal = self.hostiles[h].position;
                    if self.units[i].position.distance(&goal) <= MELEE_RANGE {
                        self.hostiles[h].health -= profile.attack_damage;
                    } else {
                        let next = step_toward(self.units[i].position, goal, profile.movement_speed);
                        self.units[i].position = next;
                    }
                }
                None => {
                    if let Some(goal) = self.units[i].destination {
                        let next = step_toward(self.units[i].position, goal, profile.movement_speed);
                        self.units[i].position = next;
                    }
                }
            }
        }

        let slain: Vec<SandboxHostile> = self.hostiles.iter().filter(|h| h.health <= 0.0).cloned().collect();
        for hostile in slain {
            self.remove_hostile(hostile.id);
            events.push(SandboxEvent::HostileSlain {
                hostile: hostile.id,
                max_health: hostile.max_health,
            });
        }

        // Hostiles strike the nearest unit in reach, otherwise walk to their goal
        for h in 0..self.hostiles.len() {
            let position = self.hostiles[h].position;
            let victim = self
                .units
                .iter()
                .position(|u| u.position.distance(&position) <= MELEE_RANGE);

            match victim {
                Some(u) => {
                    self.units[u].health -= self.hostiles[h].attack;
                    if self.units[u].health <= 0.0 {
                        let dead = self.units.remove(u);
                        events.push(SandboxEvent::UnitKilled {
                            unit: dead.id,
                            position: dead.position,
                            killer: self.hostiles[h].id,
                            is_player: self.hostiles[h].is_player,
                        });
                    }
                }
                None => {
                    if let Some(goal) = self.hostiles[h].goal {
                        self.hostiles[h].position = step_toward(position, goal, HOSTILE_SPEED);
                    }
                }
            }
        }

        events
    }

    fn hostile_handle(h: &SandboxHostile) -> HostileHandle {
        HostileHandle {
            id: h.id,
            position: h.position,
            health: h.health,
            max_health: h.max_health,
            alive: h.health > 0.0,
        }
    }

    fn unit_handle(u: &SandboxUnit) -> UnitHandle {
        UnitHandle {
            id: u.id,
            role: u.role,
            position: u.position,
            health: u.health,
            target: u.target,
            alive: u.health > 0.0,
        }
    }
}

fn step_toward(from: Point3, to: Point3, speed: f64) -> Point3 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    let distance = (dx * dx + dz * dz).sqrt();
    if distance <= speed {
        return Point3::new(to.x, from.y, to.z);
    }
    Point3::new(from.x + dx / distance * speed, from.y, from.z + dz / distance * speed)
}

fn marker_ring(center: Point3, radius: u32) -> impl Iterator<Item = Point3> {
    (0..MARKER_COUNT).map(move |i| {
        let angle = std::f64::consts::TAU * i as f64 / MARKER_COUNT as f64;
        center.on_ring(angle, f64::from(radius)).block()
    })
}

impl WorldSensor for SandboxWorld {
    fn find_hostiles(&self, center: Point3, radius: f64) -> Vec<HostileHandle> {
        let limit = radius * radius;
        self.hostiles
            .iter()
            .filter(|h| h.health > 0.0 && h.position.distance_sq(&center) <= limit)
            .map(Self::hostile_handle)
            .collect()
    }

    fn find_friendly_units(&self, center: Point3, radius: f64, role: Option<Role>) -> Vec<UnitHandle> {
        let limit = radius * radius;
        self.units
            .iter()
            .filter(|u| u.health > 0.0 && u.position.distance_sq(&center) <= limit)
            .filter(|u| role.map_or(true, |r| u.role == r))
            .map(Self::unit_handle)
            .collect()
    }

    fn resolve_actor(&self, id: EntityId) -> Option<HostileHandle> {
        self.hostile(id).filter(|h| h.health > 0.0).map(Self::hostile_handle)
    }

    fn resolve_unit(&self, id: EntityId) -> Option<UnitHandle> {
        self.unit(id).filter(|u| u.health > 0.0).map(Self::unit_handle)
    }
}

impl UnitController for SandboxWorld {
    fn set_target(&mut self, unit: EntityId, target: Option<EntityId>) {
        if let Some(u) = self.unit_mut(unit) {
            u.target = target;
        }
    }

    fn set_patrol_anchor(&mut self, unit: EntityId, center: Point3, radius: f64) {
        if let Some(u) = self.unit_mut(unit) {
            u.patrol = Some((center, radius));
            u.destination = Some(center);
        }
    }

    fn set_guard_post(&mut self, unit: EntityId, post: Point3) {
        if let Some(u) = self.unit_mut(unit) {
            u.post = Some(post);
            u.destination = Some(post);
        }
    }

    fn move_to(&mut self, unit: EntityId, destination: Point3) {
        if let Some(u) = self.unit_mut(unit) {
            u.destination = Some(destination);
        }
    }

    fn spawn_unit(&mut self, role: Role, position: Point3) -> Option<EntityId> {
        Some(self.add_unit(role, position))
    }
}

impl SpawnSurface for SandboxWorld {
    fn surface_at(&self, x: f64, z: f64) -> Option<Point3> {
        if self.blocked.contains(&(x.floor() as i64, z.floor() as i64)) {
            return None;
        }
        let spot = Point3::new(x, self.ground_y, z);
        let crowd = self
            .units
            .iter()
            .filter(|u| u.position.distance(&spot) <= CROWD_RADIUS)
            .count();
        (crowd < CROWD_LIMIT).then_some(spot)
    }
}

impl BorderMarkers for SandboxWorld {
    fn clear_markers(&mut self, center: Point3, radius: u32) {
        let ring: Vec<Point3> = marker_ring(center, radius).collect();
        self.markers.retain(|m| !ring.iter().any(|r| r.distance_sq(m) < 1e-6));
    }

    fn place_markers(&mut self, center: Point3, radius: u32) {
        self.markers.extend(marker_ring(center, radius));
    }
}
