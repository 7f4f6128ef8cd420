//! Collaborator boundary between the kingdom core and the host world
//!
//! The core only decides; everything that touches terrain, entities or
//! movement goes through these traits.

pub mod control;
pub mod placement;
pub mod sandbox;
pub mod sensor;

pub use control::UnitController;
pub use placement::{BorderMarkers, SpawnSearch, SpawnSurface};
pub use sandbox::{SandboxEvent, SandboxWorld};
pub use sensor::{HostileHandle, UnitHandle, WorldSensor};

/// Everything a territory needs from its world during a tick
pub trait WorldPort: WorldSensor + UnitController + SpawnSurface + BorderMarkers {}

impl<T> WorldPort for T where T: WorldSensor + UnitController + SpawnSurface + BorderMarkers {}
