//! Kingdom integration tests against the sandbox world

use kingdom_warden::core::{EntityId, KingdomConfig, Point3, Role};
use kingdom_warden::kingdom::economy::RecruitAction;
use kingdom_warden::kingdom::reinforcement::Dispatch;
use kingdom_warden::kingdom::territory::cells_within;
use kingdom_warden::kingdom::*;
use kingdom_warden::world::{SandboxWorld, UnitController, WorldSensor};

const CENTER: Point3 = Point3::new(0.0, 64.0, 0.0);

fn kingdom() -> TerritoryState {
    TerritoryState::found("Testmark", CENTER, KingdomConfig::default())
}

/// `count` units spread on a ring of `distance` around the castle
fn garrison(world: &mut SandboxWorld, role: Role, count: usize, distance: f64) -> Vec<EntityId> {
    (0..count)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / count as f64;
            world.add_unit(role, CENTER.on_ring(angle, distance))
        })
        .collect()
}

#[test]
fn test_recruit_guard_charges_cost() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();
    state.add_points(500, "grant");

    let id = state.recruit(Role::Guard, RecruitMode::Normal, &mut world);

    assert!(id.is_some());
    assert_eq!(state.territory().points(), 450);
    assert_eq!(state.roster().count(Role::Guard), 1);
    assert_eq!(world.units().len(), 1);
    assert!(state.territory().activity_log().any(|e| e.starts_with("Recruited guard")));
}

#[test]
fn test_recruit_respects_reserve_floor() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();
    state.add_points(299, "grant");

    assert!(state.recruit(Role::Guard, RecruitMode::Normal, &mut world).is_none());
    assert_eq!(state.territory().points(), 299);

    // Emergency waives the floor and always brings a knight
    let id = state.recruit(Role::Guard, RecruitMode::Emergency, &mut world);
    assert!(id.is_some());
    assert_eq!(state.territory().points(), 229);
    assert_eq!(state.roster().count(Role::Knight), 1);
}

#[test]
fn test_spawn_failure_keeps_balance() {
    let mut config = KingdomConfig::default();
    config.economy.spawn_attempts = 0;
    let mut state = TerritoryState::found("Testmark", CENTER, config);
    let mut world = SandboxWorld::new(64.0);
    state.add_points(500, "grant");

    assert!(state.recruit(Role::Knight, RecruitMode::Normal, &mut world).is_none());
    assert_eq!(state.territory().points(), 500);
    assert!(world.units().is_empty());
}

#[test]
fn test_expansion_needs_required_troops() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 5, 20.0);
    let mut state = kingdom();
    state.add_points(10_000, "grant");

    assert!(!state.try_expand(&mut world));
    assert_eq!(state.territory().radius(), 50);
    assert_eq!(state.territory().points(), 10_000);
}

#[test]
fn test_expansion_moves_border() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 10, 20.0);
    let mut state = kingdom();
    state.mark_border(&mut world);
    state.add_points(1_000, "grant");

    assert!(state.try_expand(&mut world));

    assert_eq!(state.territory().radius(), 60);
    assert_eq!(state.territory().points(), 800);
    assert_eq!(state.territory().controlled_cells(), &cells_within(CENTER, 60));
    assert_eq!(world.markers().len(), 8);
    assert!(world.markers().iter().all(|m| (m.distance(&CENTER) - 60.0).abs() < 1.5));
}

#[test]
fn test_critical_threat_engages_everyone() {
    let mut world = SandboxWorld::new(64.0);
    let units = garrison(&mut world, Role::Knight, 8, 12.0);
    let hostile = world.add_hostile(Point3::new(10.0, 64.0, 0.0), 40.0);
    let mut state = kingdom();

    let report = state.tick(0, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::Critical));
    assert_eq!(report.allocation.map(|a| a.engaged), Some(8));
    for id in units {
        assert_eq!(world.unit(id).and_then(|u| u.target), Some(hostile));
    }
}

#[test]
fn test_medium_threat_respects_attacker_cap() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 10, 40.0);
    let a = world.add_hostile(Point3::new(25.0, 64.0, 0.0), 30.0);
    let b = world.add_hostile(Point3::new(-25.0, 64.0, 0.0), 30.0);
    let mut state = kingdom();

    let report = state.tick(0, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::Medium));
    for hostile in [a, b] {
        let on_target = world.units().iter().filter(|u| u.target == Some(hostile)).count();
        assert!(on_target <= 3, "{on_target} units on one hostile");
        assert_eq!(state.allocator().assignments().count(hostile), on_target);
    }
    assert_eq!(report.allocation.map(|a| a.engaged), Some(6));
}

#[test]
fn test_calm_kingdom_anchors_idle_units() {
    let mut world = SandboxWorld::new(64.0);
    let guards = garrison(&mut world, Role::Guard, 2, 10.0);
    let knights = garrison(&mut world, Role::Knight, 3, 30.0);
    let mut state = kingdom();

    let report = state.tick(0, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::None));
    assert_eq!(report.allocation.map(|a| a.anchored), Some(5));
    for id in guards {
        let post = world.unit(id).and_then(|u| u.post).expect("guard has a post");
        assert!((post.distance(&CENTER) - 8.0).abs() < 1.5);
    }
    for id in knights {
        let (anchor, radius) = world.unit(id).and_then(|u| u.patrol).expect("knight patrols");
        assert!((anchor.distance(&CENTER) - 35.0).abs() < 1.5);
        assert_eq!(radius, 20.0);
    }
}

#[test]
fn test_returning_killer_is_hunted_until_forgotten() {
    let mut world = SandboxWorld::new(64.0);
    let units = garrison(&mut world, Role::Knight, 6, 10.0);
    let player = world.add_player(Point3::new(400.0, 64.0, 0.0), 40.0);
    let mut state = kingdom();
    state.tick(0, &mut world);

    let fallen = units[0];
    let position = world.unit(fallen).map(|u| u.position).expect("unit exists");
    world.kill_unit(fallen);
    let dispatch = state.handle_unit_death(
        100,
        UnitDeath {
            unit: fallen,
            position,
            killer: Some(Killer { id: player, is_player: true }),
        },
        &mut world,
    );
    assert_eq!(dispatch, Dispatch::Engage { killer: player, units: 3 });
    assert_eq!(state.revenge().expiry_of(player), Some(12_100));

    // The garrison lost track of the player, who comes back later
    world.clear_targets();
    world.move_hostile(player, Point3::new(40.0, 64.0, 0.0));

    let report = state.tick(5_000, &mut world);
    assert_eq!(report.threat, Some(ThreatLevel::Low));
    assert!((3..=5).contains(&report.returnees_dispatched));
    let hunters = world.units().iter().filter(|u| u.target == Some(player)).count();
    assert_eq!(hunters, report.returnees_dispatched);

    world.clear_targets();
    let report = state.tick(20_000, &mut world);
    assert_eq!(report.returnees_dispatched, 0);
    assert!(!state.revenge().is_remembered(player));
    assert!(world.units().iter().all(|u| u.target.is_none()));
}

#[test]
fn test_reinforcements_engage_known_killer() {
    let mut world = SandboxWorld::new(64.0);
    let units = garrison(&mut world, Role::Knight, 8, 20.0);
    let killer = world.add_hostile(Point3::new(45.0, 64.0, 0.0), 30.0);
    let mut state = kingdom();

    let fallen = units[0];
    world.kill_unit(fallen);
    let dispatch = state.handle_unit_death(
        10,
        UnitDeath {
            unit: fallen,
            position: Point3::new(45.0, 64.0, 0.0),
            killer: Some(Killer { id: killer, is_player: false }),
        },
        &mut world,
    );

    assert_eq!(dispatch, Dispatch::Engage { killer, units: 5 });
    assert_eq!(world.units().iter().filter(|u| u.target == Some(killer)).count(), 5);
    assert!(!state.revenge().is_remembered(killer));
}

#[test]
fn test_player_kill_alerts_whole_garrison() {
    let mut world = SandboxWorld::new(64.0);
    let units = garrison(&mut world, Role::Guard, 6, 10.0);
    let player = world.add_player(Point3::new(20.0, 64.0, 0.0), 30.0);
    let mut state = kingdom();

    world.kill_unit(units[0]);
    state.handle_unit_death(
        10,
        UnitDeath {
            unit: units[0],
            position: Point3::new(10.0, 64.0, 0.0),
            killer: Some(Killer { id: player, is_player: true }),
        },
        &mut world,
    );

    assert!(state.revenge().is_remembered(player));
    assert!(world.units().iter().all(|u| u.target == Some(player)));
}

#[test]
fn test_unit_chasing_past_border_is_leashed() {
    let mut world = SandboxWorld::new(64.0);
    let unit = world.add_unit(Role::Knight, Point3::new(20.0, 64.0, 0.0));
    let hostile = world.add_hostile(Point3::new(90.0, 64.0, 0.0), 30.0);
    let mut state = kingdom();
    state.tick(0, &mut world);

    world.move_unit(unit, Point3::new(80.0, 64.0, 0.0));
    world.set_target(unit, Some(hostile));

    let report = state.tick(1, &mut world);

    assert_eq!(report.leashed, 1);
    let unit = world.unit(unit).expect("unit alive");
    assert_eq!(unit.target, None);
    assert_eq!(unit.destination, Some(CENTER));
}

#[test]
fn test_emergency_recruit_when_undermanned() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();
    state.add_points(100, "grant");

    let report = state.tick(0, &mut world);

    let economy = report.economy.expect("economy runs on the first tick");
    assert!(matches!(economy.recruited, Some(RecruitAction::Spawned(Role::Knight, _))));
    assert_eq!(state.territory().points(), 30);
    assert_eq!(world.units().len(), 1);
}

#[test]
fn test_reserve_deferred_at_cap_then_deployed() {
    let mut config = KingdomConfig::default();
    config.economy.max_active_troops = 2;
    let mut state = TerritoryState::found("Testmark", CENTER, config);
    let mut world = SandboxWorld::new(64.0);
    let units = garrison(&mut world, Role::Knight, 2, 15.0);
    state.add_points(1_000, "grant");

    let report = state.tick(0, &mut world);
    let economy = report.economy.expect("economy runs on the first tick");
    assert_eq!(economy.recruited, Some(RecruitAction::Deferred));
    assert_eq!(state.territory().reserve_units(), 1);
    assert_eq!(state.territory().points(), 930);
    assert!(report.reserve_deployed.is_none());

    world.kill_unit(units[0]);
    let report = state.tick(40, &mut world);
    assert!(report.reserve_deployed.is_some());
    assert_eq!(state.territory().reserve_units(), 0);
    assert_eq!(state.territory().points(), 930);
    assert_eq!(world.units().len(), 2);
}

#[test]
fn test_passive_income_every_interval() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();

    assert_eq!(state.tick(0, &mut world).income, 0);
    assert_eq!(state.tick(1_199, &mut world).income, 0);
    assert_eq!(state.tick(1_200, &mut world).income, 1);
    assert_eq!(state.territory().points(), 1);
}

#[test]
fn test_kill_bounty_awarded() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();

    assert_eq!(state.handle_hostile_slain(20.0, &mut world), 2);
    assert_eq!(state.handle_hostile_slain(3.0, &mut world), 1);
    assert_eq!(state.territory().points(), 3);
    assert_eq!(state.territory().radius(), 50);
}

#[test]
fn test_save_and_load_through_registry() {
    let key = WorldKey::new("overworld");
    let mut registry = KingdomRegistry::new();
    registry.insert_world(key.clone(), SandboxWorld::new(64.0));
    registry
        .found(&key, "Testmark", CENTER, KingdomConfig::default())
        .expect("world registered")
        .add_points(640, "grant");

    let json = registry
        .kingdom(&key)
        .expect("kingdom founded")
        .save()
        .encode()
        .expect("encodes");

    let mut other = KingdomRegistry::<SandboxWorld>::new();
    other.insert_world(key.clone(), SandboxWorld::new(64.0));
    let record = TerritoryRecord::decode(&json).expect("decodes");
    other
        .restore(&key, TerritoryState::load(record, KingdomConfig::default()))
        .expect("world registered");

    let restored = other.kingdom(&key).expect("restored");
    assert_eq!(restored.territory().points(), 640);
    assert_eq!(restored.territory().name(), "Testmark");
    assert!(other.territory_at(&key, &Point3::new(10.0, 64.0, 10.0)).is_some());
}

#[test]
fn test_sandbox_reports_only_living() {
    let mut world = SandboxWorld::new(64.0);
    let id = world.add_unit(Role::Guard, CENTER);
    world.kill_unit(id);
    assert!(world.resolve_unit(id).is_none());
    assert!(world.find_friendly_units(CENTER, 10.0, None).is_empty());
}

#[test]
fn test_medium_cycle_releases_all_hands_targets() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 8, 12.0);
    let hostile = world.add_hostile(Point3::new(10.0, 64.0, 0.0), 40.0);
    let mut state = kingdom();

    let report = state.tick(0, &mut world);
    assert_eq!(report.threat, Some(ThreatLevel::Critical));
    assert_eq!(world.units().iter().filter(|u| u.target == Some(hostile)).count(), 8);

    world.move_hostile(hostile, Point3::new(25.0, 64.0, 0.0));
    let report = state.tick(40, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::Medium));
    assert_eq!(report.allocation.map(|a| a.engaged), Some(3));
    let on_target = world.units().iter().filter(|u| u.target == Some(hostile)).count();
    assert_eq!(on_target, 3);
    assert_eq!(state.allocator().assignments().count(hostile), 3);
}

#[test]
fn test_recruited_units_stay_inside_border() {
    let mut world = SandboxWorld::new(64.0);
    let mut state = kingdom();
    state.add_points(100_000, "grant");

    for _ in 0..40 {
        state.recruit(Role::Knight, RecruitMode::Normal, &mut world);
    }

    assert!(!world.units().is_empty());
    for unit in world.units() {
        assert!(state.territory().contains(&unit.position), "{:?} outside", unit.position);
    }
    let live = world.find_friendly_units(CENTER, 50.0, None).len();
    assert_eq!(live, state.roster().len());
    assert_eq!(live, world.units().len());
}

fn strength_aware_kingdom() -> TerritoryState {
    let mut config = KingdomConfig::default();
    config.allocation.strength_aware = true;
    TerritoryState::found("Testmark", CENTER, config)
}

#[test]
fn test_strength_aware_squad_against_strong_hostile() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 5, 40.0);
    // 80 hp against 30 hp knights needs more than the cap allows
    let hostile = world.add_hostile(Point3::new(25.0, 64.0, 0.0), 80.0);
    let mut state = strength_aware_kingdom();

    let report = state.tick(0, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::Medium));
    assert_eq!(report.allocation.map(|a| a.engaged), Some(3));
    assert_eq!(world.units().iter().filter(|u| u.target == Some(hostile)).count(), 3);
    assert_eq!(world.units().iter().filter(|u| u.target.is_none()).count(), 2);
}

#[test]
fn test_strength_aware_ally_fills_required_squad() {
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 3, 40.0);
    // 40 hp: a second knight would reach the overkill limit, but two are required
    let hostile = world.add_hostile(Point3::new(25.0, 64.0, 0.0), 40.0);
    let mut state = strength_aware_kingdom();

    let report = state.tick(0, &mut world);

    assert_eq!(report.threat, Some(ThreatLevel::Medium));
    assert_eq!(report.allocation.map(|a| a.engaged), Some(2));
    assert_eq!(world.units().iter().filter(|u| u.target == Some(hostile)).count(), 2);
    assert_eq!(state.allocator().assignments().count(hostile), 2);
}

#[test]
fn test_unresolvable_killer_remembered_but_not_hunted() {
    let config = KingdomConfig::default();
    let mut world = SandboxWorld::new(64.0);
    garrison(&mut world, Role::Knight, 4, 10.0);
    let vanished = world.add_player(Point3::new(20.0, 64.0, 0.0), 30.0);
    world.remove_hostile(vanished);

    let mut territory = Territory::found("Testmark", CENTER, &config.territory);
    let mut roster = Roster::new();
    let mut tracker = RevengeTracker::new();

    let alerted = tracker.on_unit_killed(vanished, 100, &mut territory, &mut roster, &mut world, &config.revenge);
    assert_eq!(alerted, 0);

    let dispatched = tracker.check_returnees(5_000, &mut territory, &mut roster, &mut world, &config.revenge);
    assert_eq!(dispatched, 0);
    assert!(tracker.is_remembered(vanished));
    assert_eq!(tracker.expiry_of(vanished), Some(12_100));
    assert!(world.units().iter().all(|u| u.target.is_none()));

    tracker.check_returnees(12_100, &mut territory, &mut roster, &mut world, &config.revenge);
    assert!(!tracker.is_remembered(vanished));
}
