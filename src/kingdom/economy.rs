//! Point economy: income, recruitment, expansion and strategy
//!
//! # Strategy
//!
//! threat_score = 3 * nearby_hostiles + 2 * max(0, required - live), clamped to [0, 100]
//!
//! - above `critical_threat_score`: Defensive, immediately
//! - below `low_threat_score`: Expansion if the economy is healthy, else Peaceful
//! - in between: keep the current strategy
//!
//! Non-forced changes wait out `strategy_cooldown` ticks since the last change.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::config::EconomyConfig;
use crate::core::types::{EntityId, Point3, Role, Tick};
use crate::kingdom::territory::Territory;
use crate::kingdom::units::Roster;
use crate::world::{SpawnSearch, WorldPort, WorldSensor};

/// Coarse economic posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    #[default]
    Peaceful,
    Expansion,
    Defensive,
}

/// Strategy with hysteresis and a cool-down
#[derive(Debug, Clone, Default)]
pub struct StrategyController {
    current: Strategy,
    last_change: Option<Tick>,
    last_score: u32,
}

impl StrategyController {
    pub fn current(&self) -> Strategy {
        self.current
    }

    pub fn last_score(&self) -> u32 {
        self.last_score
    }

    pub fn threat_score(nearby_hostiles: usize, required: u32, live: u32) -> u32 {
        let shortfall = required.saturating_sub(live) as usize;
        let score = nearby_hostiles.saturating_mul(3).saturating_add(shortfall * 2);
        score.min(100) as u32
    }

    pub fn update(&mut self, score: u32, economy_healthy: bool, now: Tick, config: &EconomyConfig) -> Strategy {
        self.last_score = score;
        let forced = score > config.critical_threat_score;

        let desired = if forced {
            Strategy::Defensive
        } else if score < config.low_threat_score {
            if economy_healthy {
                Strategy::Expansion
            } else {
                Strategy::Peaceful
            }
        } else {
            self.current
        };

        if desired == self.current {
            return self.current;
        }

        let cooled_down = self
            .last_change
            .map_or(true, |last| now >= last + config.strategy_cooldown);

        if forced || cooled_down {
            tracing::info!(from = ?self.current, to = ?desired, score, forced, "strategy changed");
            self.current = desired;
            self.last_change = Some(now);
        } else {
            tracing::debug!(current = ?self.current, wanted = ?desired, score, "strategy change suppressed by cool-down");
        }

        self.current
    }
}

/// Live units by role inside the territory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForceCounts {
    pub guards: u32,
    pub knights: u32,
}

impl ForceCounts {
    pub fn sense(territory: &Territory, sensor: &impl WorldSensor) -> Self {
        let units = sensor.find_friendly_units(territory.center(), f64::from(territory.radius()), None);
        let mut counts = ForceCounts::default();
        for unit in units.iter().filter(|u| u.alive) {
            match unit.role {
                Role::Guard => counts.guards += 1,
                Role::Knight => counts.knights += 1,
            }
        }
        counts
    }

    pub fn live(&self) -> u32 {
        self.guards + self.knights
    }
}

/// Whether recruitment respects the reserve floor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruitMode {
    Normal,
    /// Reserve floor waived; always recruits the strongest role
    Emergency,
}

/// Result of one recruitment decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecruitAction {
    Spawned(Role, EntityId),
    /// Paid for, parked in the reserve until there is room under the cap
    Deferred,
}

/// What one economy cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EconomyOutcome {
    pub strategy: Strategy,
    pub recruited: Option<RecruitAction>,
    pub expanded: bool,
}

/// Treasury rules and recruitment policy
#[derive(Debug, Clone, Default)]
pub struct EconomyManager {
    strategy: StrategyController,
}

impl EconomyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy.current()
    }

    pub fn strategy_controller(&self) -> &StrategyController {
        &self.strategy
    }

    pub fn cost(role: Role, config: &EconomyConfig) -> u32 {
        match role {
            Role::Guard => config.guard_cost,
            Role::Knight => config.knight_cost,
        }
    }

    /// Passive income per income interval
    pub fn income(radius: u32, config: &EconomyConfig) -> u32 {
        radius / config.blocks_per_point.max(1)
    }

    /// Radius still needed before income goes up by one point
    pub fn blocks_to_next_income(radius: u32, config: &EconomyConfig) -> u32 {
        let step = config.blocks_per_point.max(1);
        step - radius % step
    }

    pub fn expansion_cost(radius: u32, config: &EconomyConfig) -> u32 {
        config
            .expansion_base_cost
            .saturating_add(radius.saturating_mul(config.expansion_cost_per_radius))
    }

    /// max(min_required_units, radius * units_per_radius)
    pub fn base_required_units(radius: u32, config: &EconomyConfig) -> u32 {
        let scaled = (f64::from(radius) * config.units_per_radius) as u32;
        scaled.max(config.min_required_units)
    }

    /// Required units under the current strategy
    pub fn required_units(&self, radius: u32, config: &EconomyConfig) -> u32 {
        let base = Self::base_required_units(radius, config);
        match self.strategy() {
            Strategy::Defensive => (f64::from(base) * config.defensive_required_factor).ceil() as u32,
            Strategy::Expansion | Strategy::Peaceful => base,
        }
    }

    pub fn is_emergency(live: u32, required: u32, config: &EconomyConfig) -> bool {
        f64::from(live) < f64::from(required) * config.emergency_fraction
    }

    /// Points awarded for a hostile slain by a kingdom unit
    pub fn kill_bounty(max_health: f32, config: &EconomyConfig) -> u32 {
        let points = f64::from(max_health) / config.bounty_health_per_point.max(f64::EPSILON);
        (points as u32).max(1)
    }

    /// Add one interval's passive income; returns the amount
    pub fn accrue_passive_income(&self, territory: &mut Territory, config: &EconomyConfig) -> u32 {
        let income = Self::income(territory.radius(), config);
        if income > 0 {
            territory.add_points(income, "territory income");
        } else {
            tracing::debug!(
                kingdom = %territory.name(),
                radius = territory.radius(),
                "territory too small for income"
            );
        }
        income
    }

    /// Whether `role` is affordable in `mode`
    pub fn can_afford(territory: &Territory, role: Role, mode: RecruitMode, config: &EconomyConfig) -> bool {
        let floor = match mode {
            RecruitMode::Normal => config.reserve_fund,
            RecruitMode::Emergency => 0,
        };
        territory.points() >= Self::cost(role, config).saturating_add(floor)
    }

    /// Recruit one unit, charging only after the spawn succeeded
    #[allow(clippy::too_many_arguments)]
    pub fn recruit<W: WorldPort, R: Rng + ?Sized>(
        &self,
        role: Role,
        mode: RecruitMode,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        rng: &mut R,
        config: &EconomyConfig,
    ) -> Option<EntityId> {
        let role = match mode {
            RecruitMode::Normal => role,
            RecruitMode::Emergency => Role::strongest(),
        };

        if !Self::can_afford(territory, role, mode, config) {
            tracing::debug!(
                kingdom = %territory.name(),
                role = role.name(),
                points = territory.points(),
                "cannot afford recruit"
            );
            return None;
        }

        let (id, spot) = spawn(role, territory, world, rng, config)?;
        let cost = Self::cost(role, config);
        if !territory.try_spend(cost) {
            // Affordability was checked above and nothing spends in between
            tracing::warn!(kingdom = %territory.name(), "recruit charge failed after spawn");
        }
        roster.enlist(id, role, spot);

        let note = match mode {
            RecruitMode::Normal => "",
            RecruitMode::Emergency => " [emergency]",
        };
        territory.record(format!("Recruited {} (-{} points){}", role.name(), cost, note));
        tracing::info!(
            kingdom = %territory.name(),
            role = role.name(),
            ?mode,
            x = spot.x,
            z = spot.z,
            points = territory.points(),
            "unit recruited"
        );
        Some(id)
    }

    /// Grow the territory by one step if troops and treasury allow
    pub fn expand_territory<W: WorldPort>(
        &self,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        step: u32,
        config: &EconomyConfig,
    ) -> bool {
        let live = ForceCounts::sense(territory, world).live();
        let required = self.required_units(territory.radius(), config);
        if live < required {
            tracing::debug!(kingdom = %territory.name(), live, required, "not enough troops to expand");
            return false;
        }

        let old_radius = territory.radius();
        let cost = Self::expansion_cost(old_radius, config);
        if territory.points() < cost.saturating_add(config.reserve_fund) {
            tracing::debug!(kingdom = %territory.name(), cost, points = territory.points(), "cannot afford expansion");
            return false;
        }

        if !territory.try_spend(cost) {
            return false;
        }
        let new_radius = old_radius + step;
        territory.set_radius(new_radius);
        world.clear_markers(territory.center(), old_radius);
        world.place_markers(territory.center(), new_radius);
        // Sector anchors scale with the radius
        roster.clear_anchors();

        territory.record(format!("Territory expanded from {old_radius} to {new_radius}"));
        tracing::info!(kingdom = %territory.name(), old_radius, new_radius, cost, "territory expanded");
        true
    }

    /// Spawn one deferred unit if there is room under the cap and below required
    pub fn materialize_reserve<W: WorldPort, R: Rng + ?Sized>(
        &self,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        rng: &mut R,
        config: &EconomyConfig,
    ) -> Option<EntityId> {
        if territory.reserve_units() == 0 {
            return None;
        }

        let live = ForceCounts::sense(territory, world).live();
        let required = self.required_units(territory.radius(), config);
        if live >= config.max_active_troops || live >= required {
            return None;
        }

        let (id, spot) = spawn(Role::Knight, territory, world, rng, config)?;
        territory.take_reserve_unit();
        roster.enlist(id, Role::Knight, spot);
        territory.record(format!(
            "Reserve knight joined the field, {} left in reserve",
            territory.reserve_units()
        ));
        tracing::info!(kingdom = %territory.name(), reserve = territory.reserve_units(), "reserve unit deployed");
        Some(id)
    }

    /// Strategy update, recruitment and (when peaceful and healthy) expansion
    #[allow(clippy::too_many_arguments)]
    pub fn run_cycle<W: WorldPort, R: Rng + ?Sized>(
        &mut self,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        rng: &mut R,
        nearby_hostiles: usize,
        calm: bool,
        now: Tick,
        expansion_step: u32,
        config: &EconomyConfig,
    ) -> EconomyOutcome {
        let forces = ForceCounts::sense(territory, world);
        let base_required = Self::base_required_units(territory.radius(), config);
        let score = StrategyController::threat_score(nearby_hostiles, base_required, forces.live());
        let healthy = territory.points() > config.healthy_balance
            && f64::from(forces.knights) >= f64::from(base_required) * config.healthy_knight_fraction;
        let strategy = self.strategy.update(score, healthy, now, config);

        let recruited = self.recruit_by_priority(forces, territory, roster, world, rng, config);

        let expanded = strategy == Strategy::Expansion
            && calm
            && self.expand_territory(territory, roster, world, expansion_step, config);

        EconomyOutcome {
            strategy,
            recruited,
            expanded,
        }
    }

    fn recruit_by_priority<W: WorldPort, R: Rng + ?Sized>(
        &self,
        forces: ForceCounts,
        territory: &mut Territory,
        roster: &mut Roster,
        world: &mut W,
        rng: &mut R,
        config: &EconomyConfig,
    ) -> Option<RecruitAction> {
        let live = forces.live();
        let required = self.required_units(territory.radius(), config);

        if live >= config.max_active_troops {
            return self.defer_recruit(live, required, territory, config);
        }

        let spawned = |role: Role, id: EntityId| RecruitAction::Spawned(role, id);

        if live < required {
            if Self::is_emergency(live, required, config) {
                let role = Role::strongest();
                return self
                    .recruit(role, RecruitMode::Emergency, territory, roster, world, rng, config)
                    .map(|id| spawned(role, id));
            }

            let role = self.preferred_role(forces, required, territory, config)?;
            return self
                .recruit(role, RecruitMode::Normal, territory, roster, world, rng, config)
                .map(|id| spawned(role, id));
        }

        let surplus = territory.points() >= config.auto_recruit_threshold.saturating_add(config.reserve_fund);
        let knights_wanted = f64::from(forces.knights) < f64::from(required) * config.surplus_knight_factor;
        if surplus && knights_wanted {
            return self
                .recruit(Role::Knight, RecruitMode::Normal, territory, roster, world, rng, config)
                .map(|id| spawned(Role::Knight, id));
        }

        None
    }

    /// Role to recruit when short of required units, if any is affordable
    fn preferred_role(
        &self,
        forces: ForceCounts,
        required: u32,
        territory: &Territory,
        config: &EconomyConfig,
    ) -> Option<Role> {
        let affordable = |role| Self::can_afford(territory, role, RecruitMode::Normal, config);

        match self.strategy() {
            Strategy::Defensive => [Role::Knight, Role::Guard].into_iter().find(|r| affordable(*r)),
            Strategy::Peaceful | Strategy::Expansion => {
                let target_knights = (f64::from(required) * config.knight_ratio) as u32;
                let target_guards = required.saturating_sub(target_knights);
                if forces.guards < target_guards && affordable(Role::Guard) {
                    Some(Role::Guard)
                } else if forces.knights < target_knights && affordable(Role::Knight) {
                    Some(Role::Knight)
                } else {
                    None
                }
            }
        }
    }

    /// At the live cap: buy a knight into the reserve if still short overall
    fn defer_recruit(
        &self,
        live: u32,
        required: u32,
        territory: &mut Territory,
        config: &EconomyConfig,
    ) -> Option<RecruitAction> {
        if live + territory.reserve_units() >= required {
            return None;
        }
        if !Self::can_afford(territory, Role::Knight, RecruitMode::Normal, config) {
            return None;
        }
        if !territory.try_spend(config.knight_cost) {
            return None;
        }
        territory.add_reserve_unit();
        territory.record(format!(
            "Knight recruited into reserve (-{} points), reserve {}",
            config.knight_cost,
            territory.reserve_units()
        ));
        tracing::info!(kingdom = %territory.name(), reserve = territory.reserve_units(), "knight deferred to reserve");
        Some(RecruitAction::Deferred)
    }
}

/// Spawn search for a role followed by the spawn command
fn spawn<W: WorldPort, R: Rng + ?Sized>(
    role: Role,
    territory: &Territory,
    world: &mut W,
    rng: &mut R,
    config: &EconomyConfig,
) -> Option<(EntityId, Point3)> {
    let search = spawn_search(role, territory, config);
    let Some(spot) = search.run(world, rng) else {
        tracing::warn!(
            kingdom = %territory.name(),
            role = role.name(),
            attempts = search.attempts,
            "no valid spawn point found"
        );
        return None;
    };

    match world.spawn_unit(role, spot) {
        Some(id) => Some((id, spot)),
        None => {
            tracing::warn!(kingdom = %territory.name(), role = role.name(), "world refused spawn");
            None
        }
    }
}

/// Guards spawn close to the castle; knights anywhere across the territory
///
/// Every spot stays inside the border so the new unit counts as live.
pub fn spawn_search(role: Role, territory: &Territory, config: &EconomyConfig) -> SpawnSearch {
    let radius = f64::from(territory.radius());
    match role {
        Role::Guard => SpawnSearch {
            center: territory.center(),
            min_distance: config.guard_spawn_min,
            max_distance: config.guard_spawn_max.min(radius),
            attempts: config.spawn_attempts,
            max_height_delta: Some(config.guard_spawn_max_height_delta),
            bound: Some(radius),
        },
        Role::Knight => SpawnSearch {
            center: territory.center(),
            min_distance: config.knight_spawn_min,
            max_distance: (config.knight_spawn_min + radius * config.knight_spawn_spread).min(radius),
            attempts: config.spawn_attempts,
            max_height_delta: None,
            bound: Some(radius),
        },
    }
}
