//! Threat assessment around the territory center

use serde::{Deserialize, Serialize};

use crate::core::config::ThreatConfig;
use crate::core::types::Tick;
use crate::kingdom::territory::Territory;
use crate::world::WorldSensor;

/// Discrete threat classification, ordered from calm to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ThreatLevel {
    #[default]
    None,
    Low,
    Medium,
    Critical,
}

/// Hostile counts at the three nested radii
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreatSnapshot {
    pub castle: usize,
    pub critical: usize,
    pub territory: usize,
}

impl ThreatSnapshot {
    /// Highest-priority rule wins
    pub fn classify(&self) -> ThreatLevel {
        if self.castle > 0 {
            ThreatLevel::Critical
        } else if self.critical > 0 {
            ThreatLevel::Medium
        } else if self.territory > 0 {
            ThreatLevel::Low
        } else {
            ThreatLevel::None
        }
    }
}

/// Samples hostile presence and remembers the last classification
#[derive(Debug, Clone, Default)]
pub struct ThreatAssessor {
    current: ThreatLevel,
    last_snapshot: ThreatSnapshot,
    last_check: Option<Tick>,
}

impl ThreatAssessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ThreatLevel {
        self.current
    }

    pub fn last_snapshot(&self) -> ThreatSnapshot {
        self.last_snapshot
    }

    pub fn last_check(&self) -> Option<Tick> {
        self.last_check
    }

    pub fn is_due(&self, now: Tick, interval: Tick) -> bool {
        match self.last_check {
            None => true,
            Some(last) => now >= last + interval,
        }
    }

    /// Count hostiles at each radius without touching assessor state
    pub fn sample(territory: &Territory, sensor: &impl WorldSensor, config: &ThreatConfig) -> ThreatSnapshot {
        let center = territory.center();
        let count = |radius: f64| sensor.find_hostiles(center, radius).iter().filter(|h| h.alive).count();

        ThreatSnapshot {
            castle: count(config.castle_radius),
            critical: count(config.critical_radius),
            territory: count(f64::from(territory.radius())),
        }
    }

    /// Recompute the threat level from the current snapshot
    pub fn update(
        &mut self,
        territory: &Territory,
        sensor: &impl WorldSensor,
        config: &ThreatConfig,
        now: Tick,
    ) -> ThreatLevel {
        let snapshot = Self::sample(territory, sensor, config);
        let level = snapshot.classify();

        if level != self.current {
            tracing::warn!(
                kingdom = %territory.name(),
                from = ?self.current,
                to = ?level,
                castle = snapshot.castle,
                critical = snapshot.critical,
                territory = snapshot.territory,
                "threat level changed"
            );
        }

        self.current = level;
        self.last_snapshot = snapshot;
        self.last_check = Some(now);
        level
    }
}
