//! Save records for kingdoms
//!
//! Only durable state is saved: name, center, radius, treasury, reserve,
//! activity log and revenge memory. Roster, assignments, threat level and
//! interval counters are rebuilt from the world after loading.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::config::KingdomConfig;
use crate::core::error::{KingdomError, Result};
use crate::core::types::Point3;
use crate::kingdom::revenge::{RevengeRecord, RevengeTracker};
use crate::kingdom::state::TerritoryState;
use crate::kingdom::territory::Territory;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// Serialized form of one kingdom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    pub version: u32,
    pub name: String,
    pub center: Point3,
    pub radius: u32,
    pub points: u32,
    pub reserve_units: u32,
    pub log: Vec<String>,
    #[serde(default)]
    pub revenge: Vec<RevengeRecord>,
}

impl TerritoryRecord {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a record, rejecting versions this build does not understand
    pub fn decode(json: &str) -> Result<Self> {
        let record: TerritoryRecord = serde_json::from_str(json)?;
        if record.version != SAVE_VERSION {
            return Err(KingdomError::UnsupportedVersion {
                found: record.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(record)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.encode()?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::decode(&json)
    }
}

impl TerritoryState {
    pub fn save(&self) -> TerritoryRecord {
        let territory = &self.territory;
        TerritoryRecord {
            version: SAVE_VERSION,
            name: territory.name().to_string(),
            center: territory.center(),
            radius: territory.radius(),
            points: territory.points(),
            reserve_units: territory.reserve_units(),
            log: territory.activity_log().map(str::to_string).collect(),
            revenge: self.revenge.records(),
        }
    }

    /// Rebuild a kingdom from a record; controlled cells are recomputed
    pub fn load(record: TerritoryRecord, config: KingdomConfig) -> Self {
        let territory = Territory::restore(
            record.name,
            record.center,
            record.radius,
            record.points,
            record.reserve_units,
            record.log,
            config.territory.log_capacity,
        );
        let revenge = RevengeTracker::restore(&record.revenge);
        tracing::info!(
            kingdom = %territory.name(),
            points = territory.points(),
            tracked = revenge.len(),
            "kingdom loaded"
        );
        TerritoryState::from_parts(territory, revenge, config)
    }
}
