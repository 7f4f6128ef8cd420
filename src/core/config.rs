//! Kingdom configuration with documented constants
//!
//! All tuning numbers live here. Every section deserializes with defaults,
//! so a TOML file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{KingdomError, Result};
use crate::core::types::Tick;

/// Complete kingdom configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KingdomConfig {
    pub territory: TerritoryConfig,
    pub threat: ThreatConfig,
    pub allocation: AllocationConfig,
    pub economy: EconomyConfig,
    pub revenge: RevengeConfig,
    pub reinforcement: ReinforcementConfig,
    pub schedule: ScheduleConfig,
}

/// Territory shape and bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryConfig {
    /// Radius of a freshly founded territory (world units)
    pub initial_radius: u32,
    /// Radius gained per successful expansion
    pub expansion_step: u32,
    /// Maximum activity log entries; oldest entries are evicted first
    pub log_capacity: usize,
}

impl Default for TerritoryConfig {
    fn default() -> Self {
        Self {
            initial_radius: 50,
            expansion_step: 10,
            log_capacity: 50,
        }
    }
}

/// Threat assessment radii and cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Hostiles inside this radius of the center make the threat Critical
    pub castle_radius: f64,
    /// Hostiles inside this radius (but outside the castle radius) make it Medium
    pub critical_radius: f64,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            castle_radius: 16.0,
            critical_radius: 32.0,
        }
    }
}

/// Target allocation and idle distribution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Upper bound on units committed to one hostile per allocation cycle
    pub max_attackers_per_target: usize,
    /// Weight of a hostile's distance to the center in the Medium score
    ///
    /// score = distance_to_unit + center_weight * distance_to_center
    pub center_weight: f64,
    /// Use health-aware engagement instead of the weighted score
    pub strength_aware: bool,
    /// A hostile at most this multiple of a unit's health is fought solo
    pub solo_health_ratio: f64,
    /// Committed health must stay below this multiple of the hostile's health
    pub overkill_ratio: f64,
    /// Health margin used to size a squad against a stronger hostile
    pub squad_health_factor: f64,
    /// Smallest squad sent against a stronger hostile
    pub min_squad: usize,
    /// Number of patrol sectors around the center
    pub sector_count: usize,
    /// Patrol anchors sit at this fraction of the territory radius
    pub patrol_ring_fraction: f64,
    /// Patrol radius handed to knights by sector distribution
    pub patrol_radius: f64,
    /// Radius of the ring of guard posts around the center
    pub guard_ring_radius: f64,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            max_attackers_per_target: 3,
            center_weight: 0.5,
            strength_aware: false,
            solo_health_ratio: 1.2,
            overkill_ratio: 1.5,
            squad_health_factor: 1.3,
            min_squad: 2,
            sector_count: 8,
            patrol_ring_fraction: 0.7,
            patrol_radius: 20.0,
            guard_ring_radius: 8.0,
        }
    }
}

/// Point economy, recruitment and expansion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub guard_cost: u32,
    pub knight_cost: u32,
    /// Balance that normal recruitment and expansion never dip below
    pub reserve_fund: u32,
    /// Surplus above the reserve that triggers opportunistic recruitment
    pub auto_recruit_threshold: u32,
    /// Hard cap on concurrently live units; recruitment past it is deferred
    pub max_active_troops: u32,
    /// Radius units per point of passive income
    pub blocks_per_point: u32,
    /// Floor of the required-unit formula
    pub min_required_units: u32,
    /// Required units per unit of radius
    pub units_per_radius: f64,
    /// Multiplier on required units under the Defensive strategy
    pub defensive_required_factor: f64,
    /// Live/required ratio below which recruitment becomes an emergency
    pub emergency_fraction: f64,
    /// Target share of knights among required units
    pub knight_ratio: f64,
    /// Surplus recruitment stops once knights reach this multiple of required
    pub surplus_knight_factor: f64,
    pub expansion_base_cost: u32,
    pub expansion_cost_per_radius: u32,
    /// Hostile max health per bounty point
    pub bounty_health_per_point: f64,
    /// Placement attempts per recruitment
    pub spawn_attempts: u32,
    /// Guards spawn in [guard_spawn_min, guard_spawn_max] from the center
    pub guard_spawn_min: f64,
    pub guard_spawn_max: f64,
    /// Guards only spawn within this height of the center
    pub guard_spawn_max_height_delta: f64,
    /// Knights spawn at least this far out, up to this plus knight_spawn_spread * radius
    pub knight_spawn_min: f64,
    pub knight_spawn_spread: f64,
    /// Minimum ticks between strategy changes
    pub strategy_cooldown: Tick,
    /// Threat score above which the strategy switches to Defensive immediately
    pub critical_threat_score: u32,
    /// Threat score below which the kingdom considers itself at peace
    pub low_threat_score: u32,
    /// Balance above which the economy counts as healthy
    pub healthy_balance: u32,
    /// Knights / required ratio for a healthy economy
    pub healthy_knight_fraction: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            guard_cost: 50,
            knight_cost: 70,
            reserve_fund: 250,
            auto_recruit_threshold: 150,
            max_active_troops: 50,
            blocks_per_point: 50,
            min_required_units: 10,
            units_per_radius: 0.1,
            defensive_required_factor: 1.5,
            emergency_fraction: 0.3,
            knight_ratio: 0.8,
            surplus_knight_factor: 1.2,
            expansion_base_cost: 100,
            expansion_cost_per_radius: 2,
            bounty_health_per_point: 10.0,
            spawn_attempts: 30,
            guard_spawn_min: 5.0,
            guard_spawn_max: 20.0,
            guard_spawn_max_height_delta: 5.0,
            knight_spawn_min: 20.0,
            knight_spawn_spread: 0.8,
            strategy_cooldown: 1200,
            critical_threat_score: 70,
            low_threat_score: 20,
            healthy_balance: 300,
            healthy_knight_fraction: 0.5,
        }
    }
}

/// Killer memory and retaliation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevengeConfig {
    /// How long a killer is remembered after the last kill (ticks)
    pub memory_duration: Tick,
    pub min_squad: usize,
    pub max_squad: usize,
}

impl Default for RevengeConfig {
    fn default() -> Self {
        Self {
            memory_duration: 12_000,
            min_squad: 3,
            max_squad: 5,
        }
    }
}

/// Reinforcements sent after a unit dies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementConfig {
    /// Deaths closer than this to the center send half of the free units
    pub near_radius: f64,
    /// Deaths closer than this send up to `mid_squad` units
    pub mid_radius: f64,
    pub near_min_squad: usize,
    pub mid_squad: usize,
    pub far_squad: usize,
}

impl Default for ReinforcementConfig {
    fn default() -> Self {
        Self {
            near_radius: 30.0,
            mid_radius: 60.0,
            near_min_squad: 3,
            mid_squad: 5,
            far_squad: 3,
        }
    }
}

/// Per-tick schedule. All values are intervals in ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Threat assessment + target allocation cadence
    pub assessment_interval: Tick,
    /// Strategy, recruitment and expansion cadence
    pub economy_interval: Tick,
    /// Passive income cadence
    pub income_interval: Tick,
    /// Reserve materialization cadence
    pub reinforcement_interval: Tick,
    /// Returning-killer check cadence
    pub returnee_interval: Tick,
    /// Seed for spawn search and any other randomized choice
    pub seed: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            assessment_interval: 40,
            economy_interval: 100,
            income_interval: 1200,
            reinforcement_interval: 40,
            returnee_interval: 20,
            seed: 42,
        }
    }
}

impl KingdomConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: KingdomConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Reject values that would break the tick schedule or the economy invariants
    pub fn validate(&self) -> Result<()> {
        let s = &self.schedule;
        let intervals = [
            ("assessment_interval", s.assessment_interval),
            ("economy_interval", s.economy_interval),
            ("income_interval", s.income_interval),
            ("reinforcement_interval", s.reinforcement_interval),
            ("returnee_interval", s.returnee_interval),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(invalid(format!("schedule.{name} must be positive")));
            }
        }
        if self.economy.blocks_per_point == 0 {
            return Err(invalid("economy.blocks_per_point must be positive".into()));
        }
        if self.threat.castle_radius > self.threat.critical_radius {
            return Err(invalid("threat.castle_radius exceeds threat.critical_radius".into()));
        }
        if self.allocation.max_attackers_per_target == 0 {
            return Err(invalid("allocation.max_attackers_per_target must be positive".into()));
        }
        if self.allocation.sector_count == 0 {
            return Err(invalid("allocation.sector_count must be positive".into()));
        }
        if self.revenge.min_squad > self.revenge.max_squad {
            return Err(invalid("revenge.min_squad exceeds revenge.max_squad".into()));
        }
        if self.economy.guard_spawn_min > self.economy.guard_spawn_max {
            return Err(invalid("economy.guard_spawn_min exceeds economy.guard_spawn_max".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> KingdomError {
    KingdomError::InvalidConfig(message)
}
