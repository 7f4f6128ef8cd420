pub mod config;
pub mod error;
pub mod types;

pub use config::KingdomConfig;
pub use error::{KingdomError, Result};
pub use types::{ChunkCoord, EntityId, Point3, Role, Tick};
