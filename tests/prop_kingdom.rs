//! Property-based tests for kingdom invariants.
//!
//! Run with: cargo test --release prop_kingdom

#![allow(missing_docs)]

use proptest::prelude::*;

use kingdom_warden::core::config::{EconomyConfig, ThreatConfig, TerritoryConfig};
use kingdom_warden::core::{KingdomConfig, Point3, Role};
use kingdom_warden::kingdom::territory::{cells_within, Territory};
use kingdom_warden::kingdom::threat::ThreatAssessor;
use kingdom_warden::kingdom::{EconomyManager, RecruitMode, TerritoryState, ThreatLevel};
use kingdom_warden::world::SandboxWorld;

const CENTER: Point3 = Point3::new(0.0, 64.0, 0.0);

fn polar() -> impl Strategy<Value = (f64, f64)> {
    (0.0..std::f64::consts::TAU, 0.0..60.0f64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// A normal recruit either charges exactly the cost above the reserve floor or changes nothing.
    #[test]
    fn prop_recruit_never_breaks_floor(points in 0u32..2_000, knight in any::<bool>()) {
        let role = if knight { Role::Knight } else { Role::Guard };
        let mut world = SandboxWorld::new(64.0);
        let mut state = TerritoryState::found("Prop", CENTER, KingdomConfig::default());
        state.add_points(points, "grant");

        let cost = EconomyManager::cost(role, &EconomyConfig::default());
        match state.recruit(role, RecruitMode::Normal, &mut world) {
            Some(_) => {
                prop_assert!(points >= cost + 250);
                prop_assert_eq!(state.territory().points(), points - cost);
            }
            None => prop_assert_eq!(state.territory().points(), points),
        }
    }

    /// No hostile ever has more attackers than the cap after a medium-threat allocation.
    #[test]
    fn prop_attacker_cap_holds(
        hostiles in prop::collection::vec((0.0..std::f64::consts::TAU, 17.0..31.0f64), 1..6),
        units in prop::collection::vec(polar(), 0..25),
    ) {
        let mut world = SandboxWorld::new(64.0);
        for (angle, distance) in &units {
            world.add_unit(Role::Knight, CENTER.on_ring(*angle, *distance));
        }
        let ids: Vec<_> = hostiles
            .iter()
            .map(|(angle, distance)| world.add_hostile(CENTER.on_ring(*angle, *distance), 30.0))
            .collect();

        let mut state = TerritoryState::found("Prop", CENTER, KingdomConfig::default());
        let report = state.tick(0, &mut world);

        prop_assert_eq!(report.threat, Some(ThreatLevel::Medium));
        for id in ids {
            let attackers = world.units().iter().filter(|u| u.target == Some(id)).count();
            prop_assert!(attackers <= 3);
        }
    }

    /// Adding a hostile never lowers the threat level.
    #[test]
    fn prop_threat_monotonic(
        existing in prop::collection::vec(polar(), 0..8),
        extra in polar(),
    ) {
        let territory = Territory::found("Prop", CENTER, &TerritoryConfig::default());
        let config = ThreatConfig::default();
        let mut world = SandboxWorld::new(64.0);
        for (angle, distance) in &existing {
            world.add_hostile(CENTER.on_ring(*angle, *distance), 20.0);
        }

        let before = ThreatAssessor::sample(&territory, &world, &config).classify();
        world.add_hostile(CENTER.on_ring(extra.0, extra.1), 20.0);
        let after = ThreatAssessor::sample(&territory, &world, &config).classify();

        prop_assert!(after >= before);
    }

    /// Controlled cells are exactly the cells within the radius, however often they are recomputed.
    #[test]
    fn prop_controlled_cells_idempotent(
        x in -5_000.0..5_000.0f64,
        z in -5_000.0..5_000.0f64,
        radius in 0u32..300,
    ) {
        let center = Point3::new(x, 64.0, z);
        let mut territory = Territory::restore("Prop", center, radius, 0, 0, Vec::new(), 50);
        let first = territory.controlled_cells().clone();
        territory.recompute_controlled_cells();

        prop_assert_eq!(&first, territory.controlled_cells());
        prop_assert_eq!(first, cells_within(center, radius));
    }
}
