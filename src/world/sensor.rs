//! Read-only view of the world for one tick

use crate::core::types::{EntityId, Point3, Role};

/// A hostile entity as seen by the kingdom
#[derive(Debug, Clone, PartialEq)]
pub struct HostileHandle {
    pub id: EntityId,
    pub position: Point3,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
}

/// A friendly unit as reported by the world
#[derive(Debug, Clone, PartialEq)]
pub struct UnitHandle {
    pub id: EntityId,
    pub role: Role,
    pub position: Point3,
    pub health: f32,
    pub target: Option<EntityId>,
    pub alive: bool,
}

impl UnitHandle {
    pub fn is_free(&self) -> bool {
        self.alive && self.target.is_none()
    }
}

/// Sensing queries the core needs from the world
///
/// Results must reflect the snapshot valid for the current tick. Order is
/// significant: callers rely on it for stable tie-breaking.
pub trait WorldSensor {
    /// Live hostiles within `radius` of `center`
    fn find_hostiles(&self, center: Point3, radius: f64) -> Vec<HostileHandle>;

    /// Live friendly units within `radius` of `center`, optionally filtered by role
    fn find_friendly_units(&self, center: Point3, radius: f64, role: Option<Role>) -> Vec<UnitHandle>;

    /// Resolve a tracked actor anywhere in the world; `None` if gone or dead
    fn resolve_actor(&self, id: EntityId) -> Option<HostileHandle>;

    /// Resolve a friendly unit anywhere in the world
    fn resolve_unit(&self, id: EntityId) -> Option<UnitHandle>;
}
