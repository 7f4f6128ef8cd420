//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for entities (units, hostiles, tracked actors)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id, used by the sandbox world and tests
    pub fn from_raw(raw: u128) -> Self {
        Self(Uuid::from_u128(raw))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Side length of a controlled cell, in world units
pub const CELL_SIZE: i32 = 16;

/// 3D world position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_sq(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Point on the horizontal ring of `distance` around `self` at `angle` radians
    pub fn on_ring(&self, angle: f64, distance: f64) -> Self {
        Self {
            x: self.x + angle.cos() * distance,
            y: self.y,
            z: self.z + angle.sin() * distance,
        }
    }

    /// Snap to the containing block (floor on every axis)
    pub fn block(&self) -> Self {
        Self {
            x: self.x.floor(),
            y: self.y.floor(),
            z: self.z.floor(),
        }
    }
}

/// Horizontal cell coordinate (16x16 column of the world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn containing(point: &Point3) -> Self {
        Self {
            x: (point.x.floor() as i32).div_euclid(CELL_SIZE),
            z: (point.z.floor() as i32).div_euclid(CELL_SIZE),
        }
    }
}

/// Combat role of a kingdom unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Guard,
    Knight,
}

impl Role {
    pub fn name(self) -> &'static str {
        match self {
            Role::Guard => "guard",
            Role::Knight => "knight",
        }
    }
}
