//! Per-territory simulation state and the tick entry point
//!
//! One `TerritoryState` owns everything a kingdom remembers between ticks.
//! The tick body is strictly sequential:
//!
//! 1. roster sync and leashing of units that chased past the border
//! 2. revenge memory sweep
//! 3. passive income (every `income_interval`)
//! 4. threat assessment and target allocation (every `assessment_interval`)
//! 5. economy cycle (every `economy_interval`)
//! 6. reserve materialization (every `reinforcement_interval`)
//! 7. returning-enemy check (every `returnee_interval`)

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::core::config::KingdomConfig;
use crate::core::types::{EntityId, Point3, Role, Tick};
use crate::kingdom::allocation::{AllocationOutcome, TargetAllocator};
use crate::kingdom::economy::{EconomyManager, EconomyOutcome, RecruitMode, Strategy};
use crate::kingdom::reinforcement::{dispatch_reinforcements, Dispatch};
use crate::kingdom::revenge::{check_bounds, RevengeTracker};
use crate::kingdom::territory::Territory;
use crate::kingdom::threat::{ThreatAssessor, ThreatLevel};
use crate::kingdom::units::Roster;
use crate::world::WorldPort;

/// Who landed the killing blow on a kingdom unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Killer {
    pub id: EntityId,
    /// Player killers are remembered for revenge
    pub is_player: bool,
}

/// A kingdom unit died
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDeath {
    pub unit: EntityId,
    pub position: Point3,
    pub killer: Option<Killer>,
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    pub leashed: usize,
    pub forgotten: usize,
    pub income: u32,
    /// Set when the threat assessment ran this tick
    pub threat: Option<ThreatLevel>,
    pub allocation: Option<AllocationOutcome>,
    pub economy: Option<EconomyOutcome>,
    pub reserve_deployed: Option<EntityId>,
    pub returnees_dispatched: usize,
}

/// Summary for administrators and the demo CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KingdomStatus {
    pub name: String,
    pub radius: u32,
    pub points: u32,
    pub income_per_cycle: u32,
    pub blocks_to_next_income: u32,
    pub expansion_cost: u32,
    pub required_units: u32,
    pub live_units: usize,
    pub reserve_units: u32,
    pub strategy: Strategy,
    pub threat: ThreatLevel,
    pub tracked_actors: usize,
    pub controlled_cells: usize,
}

/// Fixed-interval gate, as in "run at most once every N ticks"
#[derive(Debug, Clone, Copy, Default)]
struct Cadence {
    last: Option<Tick>,
}

impl Cadence {
    /// First call fires; afterwards fires once `interval` ticks have passed
    fn ready(&mut self, now: Tick, interval: Tick) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now >= last + interval,
        };
        if due {
            self.last = Some(now);
        }
        due
    }

    /// Start counting from `now` without firing
    fn arm(&mut self, now: Tick) {
        if self.last.is_none() {
            self.last = Some(now);
        }
    }
}

/// Everything one kingdom remembers between ticks
#[derive(Debug, Clone)]
pub struct TerritoryState {
    pub(crate) territory: Territory,
    pub(crate) roster: Roster,
    pub(crate) threat: ThreatAssessor,
    pub(crate) allocator: TargetAllocator,
    pub(crate) economy: EconomyManager,
    pub(crate) revenge: RevengeTracker,
    pub(crate) config: KingdomConfig,
    rng: ChaCha8Rng,
    income: Cadence,
    economy_cycle: Cadence,
    reserve: Cadence,
    returnees: Cadence,
}

impl TerritoryState {
    /// Found a new kingdom around `center`
    pub fn found(name: impl Into<String>, center: Point3, config: KingdomConfig) -> Self {
        let territory = Territory::found(name, center, &config.territory);
        Self::from_parts(territory, RevengeTracker::new(), config)
    }

    pub(crate) fn from_parts(territory: Territory, revenge: RevengeTracker, config: KingdomConfig) -> Self {
        tracing::info!(
            kingdom = %territory.name(),
            radius = territory.radius(),
            cells = territory.controlled_cells().len(),
            "kingdom ready"
        );
        Self {
            territory,
            roster: Roster::new(),
            threat: ThreatAssessor::new(),
            allocator: TargetAllocator::new(&config.allocation),
            economy: EconomyManager::new(),
            revenge,
            rng: ChaCha8Rng::seed_from_u64(config.schedule.seed),
            config,
            income: Cadence::default(),
            economy_cycle: Cadence::default(),
            reserve: Cadence::default(),
            returnees: Cadence::default(),
        }
    }

    pub fn territory(&self) -> &Territory {
        &self.territory
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn config(&self) -> &KingdomConfig {
        &self.config
    }

    pub fn threat_level(&self) -> ThreatLevel {
        self.threat.current()
    }

    pub fn strategy(&self) -> Strategy {
        self.economy.strategy()
    }

    pub fn allocator(&self) -> &TargetAllocator {
        &self.allocator
    }

    pub fn revenge(&self) -> &RevengeTracker {
        &self.revenge
    }

    /// Draw the border markers for the current radius
    pub fn mark_border<W: WorldPort>(&self, world: &mut W) {
        world.place_markers(self.territory.center(), self.territory.radius());
    }

    /// Advance the kingdom by one tick
    pub fn tick<W: WorldPort>(&mut self, now: Tick, world: &mut W) -> TickReport {
        let mut report = TickReport::default();
        let schedule = self.config.schedule.clone();

        self.sync_roster(world);
        report.leashed = self.leash_strays(world);
        report.forgotten = self.revenge.sweep(now);

        self.income.arm(now);
        if self.income.ready(now, schedule.income_interval) {
            report.income = self.economy.accrue_passive_income(&mut self.territory, &self.config.economy);
        }

        if self.threat.is_due(now, schedule.assessment_interval) {
            let level = self.threat.update(&self.territory, world, &self.config.threat, now);
            let outcome = self.allocator.assign(
                level,
                &self.territory,
                &mut self.roster,
                world,
                &self.config.threat,
                &self.config.allocation,
            );
            report.threat = Some(level);
            report.allocation = Some(outcome);
        }

        if self.economy_cycle.ready(now, schedule.economy_interval) {
            let nearby = self.threat.last_snapshot().territory;
            let calm = self.threat.current() == ThreatLevel::None;
            report.economy = Some(self.economy.run_cycle(
                &mut self.territory,
                &mut self.roster,
                world,
                &mut self.rng,
                nearby,
                calm,
                now,
                self.config.territory.expansion_step,
                &self.config.economy,
            ));
        }

        if self.reserve.ready(now, schedule.reinforcement_interval) {
            report.reserve_deployed = self.economy.materialize_reserve(
                &mut self.territory,
                &mut self.roster,
                world,
                &mut self.rng,
                &self.config.economy,
            );
        }

        if self.returnees.ready(now, schedule.returnee_interval) {
            report.returnees_dispatched =
                self.revenge
                    .check_returnees(now, &mut self.territory, &mut self.roster, world, &self.config.revenge);
        }

        report
    }

    fn sync_roster<W: WorldPort>(&mut self, world: &W) {
        let center = self.territory.center();
        let handles = world.find_friendly_units(center, f64::from(self.territory.radius()), None);
        self.roster.sync(&handles, world, center);
    }

    fn leash_strays<W: WorldPort>(&mut self, world: &mut W) -> usize {
        let pursuing: Vec<EntityId> = self
            .roster
            .ordered(None)
            .iter()
            .filter(|u| u.target.is_some())
            .map(|u| u.id)
            .collect();

        pursuing
            .into_iter()
            .filter(|id| check_bounds(*id, &self.territory, &mut self.roster, world))
            .count()
    }

    /// Leash one unit if it pursued its target past the border
    pub fn check_unit_bounds<W: WorldPort>(&mut self, unit: EntityId, world: &mut W) -> bool {
        check_bounds(unit, &self.territory, &mut self.roster, world)
    }

    /// React to the death of a kingdom unit
    pub fn handle_unit_death<W: WorldPort>(&mut self, now: Tick, death: UnitDeath, world: &mut W) -> Dispatch {
        let role = self.roster.remove(death.unit).map(|u| u.role);
        self.territory.record(format!(
            "Lost a {} at ({:.0}, {:.0})",
            role.map_or("unit", Role::name),
            death.position.x,
            death.position.z
        ));

        let Some(killer) = death.killer else {
            return Dispatch::NoneAvailable;
        };

        let dispatch = dispatch_reinforcements(
            death.unit,
            death.position,
            Some(killer.id),
            &mut self.territory,
            &mut self.roster,
            world,
            &self.config.reinforcement,
        );

        if killer.is_player {
            self.revenge.on_unit_killed(
                killer.id,
                now,
                &mut self.territory,
                &mut self.roster,
                world,
                &self.config.revenge,
            );
        }

        dispatch
    }

    /// Award the kill bounty for a hostile slain by a kingdom unit, then try to grow
    pub fn handle_hostile_slain<W: WorldPort>(&mut self, max_health: f32, world: &mut W) -> u32 {
        let bounty = EconomyManager::kill_bounty(max_health, &self.config.economy);
        self.territory.add_points(bounty, "enemy slain");
        self.try_expand(world);
        bounty
    }

    pub fn add_points(&mut self, amount: u32, reason: &str) {
        self.territory.add_points(amount, reason);
    }

    /// Expand now, still subject to the troop and treasury checks
    pub fn try_expand<W: WorldPort>(&mut self, world: &mut W) -> bool {
        self.economy.expand_territory(
            &mut self.territory,
            &mut self.roster,
            world,
            self.config.territory.expansion_step,
            &self.config.economy,
        )
    }

    /// Recruit one unit of `role` outside the economy cycle
    pub fn recruit<W: WorldPort>(&mut self, role: Role, mode: RecruitMode, world: &mut W) -> Option<EntityId> {
        self.economy.recruit(
            role,
            mode,
            &mut self.territory,
            &mut self.roster,
            world,
            &mut self.rng,
            &self.config.economy,
        )
    }

    pub fn status(&self) -> KingdomStatus {
        let economy = &self.config.economy;
        let radius = self.territory.radius();
        KingdomStatus {
            name: self.territory.name().to_string(),
            radius,
            points: self.territory.points(),
            income_per_cycle: EconomyManager::income(radius, economy),
            blocks_to_next_income: EconomyManager::blocks_to_next_income(radius, economy),
            expansion_cost: EconomyManager::expansion_cost(radius, economy),
            required_units: self.economy.required_units(radius, economy),
            live_units: self.roster.len(),
            reserve_units: self.territory.reserve_units(),
            strategy: self.economy.strategy(),
            threat: self.threat.current(),
            tracked_actors: self.revenge.len(),
            controlled_cells: self.territory.controlled_cells().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_first_call_fires() {
        let mut c = Cadence::default();
        assert!(c.ready(0, 40));
        assert!(!c.ready(39, 40));
        assert!(c.ready(40, 40));
    }

    #[test]
    fn test_cadence_armed_waits() {
        let mut c = Cadence::default();
        c.arm(10);
        assert!(!c.ready(10, 1200));
        assert!(c.ready(1210, 1200));
        c.arm(5000);
        assert!(!c.ready(1211, 1200));
    }

    #[test]
    fn test_status_of_new_kingdom() {
        let state = TerritoryState::found("Test", Point3::new(0.0, 64.0, 0.0), KingdomConfig::default());
        let status = state.status();
        assert_eq!(status.radius, 50);
        assert_eq!(status.points, 0);
        assert_eq!(status.income_per_cycle, 1);
        assert_eq!(status.expansion_cost, 200);
        assert_eq!(status.required_units, 10);
        assert_eq!(status.threat, ThreatLevel::None);
        assert_eq!(status.strategy, Strategy::Peaceful);
    }
}
