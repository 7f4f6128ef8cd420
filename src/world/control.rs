//! Commands the core issues to the world

use crate::core::types::{EntityId, Point3, Role};

/// Unit-side command surface
///
/// Every call is a synchronous, non-blocking command against the current
/// tick's snapshot. Movement and combat execution belong to the implementor.
pub trait UnitController {
    fn set_target(&mut self, unit: EntityId, target: Option<EntityId>);

    fn set_patrol_anchor(&mut self, unit: EntityId, center: Point3, radius: f64);

    fn set_guard_post(&mut self, unit: EntityId, post: Point3);

    /// Plain move order, used for leashing and reinforcement rally points
    fn move_to(&mut self, unit: EntityId, destination: Point3);

    /// Spawn a unit; `None` if the world refused the spawn
    fn spawn_unit(&mut self, role: Role, position: Point3) -> Option<EntityId>;
}
