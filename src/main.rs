//! Kingdom Warden demo
//!
//! Founds one kingdom in a sandbox world, sends waves of hostiles at it and
//! prints the final status as JSON.

use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use kingdom_warden::core::error::Result;
use kingdom_warden::core::{KingdomConfig, Point3, Tick};
use kingdom_warden::kingdom::{Killer, KingdomRegistry, TerritoryState, UnitDeath, WorldKey};
use kingdom_warden::world::{SandboxEvent, SandboxWorld};

/// Run a seeded sandbox siege against one kingdom
#[derive(Parser, Debug)]
#[command(name = "kingdom-warden")]
#[command(about = "Simulate an autonomous kingdom defending and growing its territory")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 6000)]
    ticks: u64,

    /// Seed for the kingdom and for hostile waves (overrides the config seed)
    #[arg(long)]
    seed: Option<u64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Points granted at founding
    #[arg(long, default_value_t = 600)]
    starting_points: u32,

    /// Ticks between hostile waves
    #[arg(long, default_value_t = 400)]
    wave_interval: u64,

    /// Hostiles per wave
    #[arg(long, default_value_t = 3)]
    wave_size: u32,

    /// Write the final save record to this path
    #[arg(long)]
    save: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kingdom_warden=info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => KingdomConfig::load(path)?,
        None => KingdomConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.schedule.seed = seed;
    }
    config.validate()?;

    let mut waves = ChaCha8Rng::seed_from_u64(config.schedule.seed.wrapping_add(1));
    let center = Point3::new(0.0, 64.0, 0.0);
    let key = WorldKey::new("overworld");

    let mut registry = KingdomRegistry::new();
    registry.insert_world(key.clone(), SandboxWorld::new(center.y));
    registry
        .found(&key, "Sandbox", center, config)?
        .add_points(args.starting_points, "founding grant");

    tracing::info!(ticks = args.ticks, "simulation starting");

    for now in 0..args.ticks {
        if let Some(slot) = registry.slot_mut(&key) {
            if now > 0 && now % args.wave_interval.max(1) == 0 {
                send_wave(&mut slot.world, &mut waves, center, args.wave_size, now);
            }

            let events = slot.world.advance();
            if let Some(kingdom) = slot.kingdom.as_mut() {
                apply_events(kingdom, &mut slot.world, events, now);
            }
        }

        registry.tick_all(now);
    }

    let Some(kingdom) = registry.kingdom(&key) else {
        return Ok(());
    };

    println!("{}", serde_json::to_string_pretty(&kingdom.status())?);

    if let Some(path) = &args.save {
        kingdom.save().write_to(path)?;
        tracing::info!(path = %path.display(), "save written");
    }

    Ok(())
}

/// Hostiles appear outside the border and march on the castle
fn send_wave(world: &mut SandboxWorld, rng: &mut ChaCha8Rng, castle: Point3, size: u32, now: Tick) {
    for _ in 0..size {
        let angle = rng.gen::<f64>() * std::f64::consts::TAU;
        let distance = rng.gen_range(55.0..80.0);
        let health = rng.gen_range(15.0..45.0);
        let spot = castle.on_ring(angle, distance);

        let id = if rng.gen_bool(0.25) {
            world.add_player(spot, health)
        } else {
            world.add_hostile(spot, health)
        };
        world.set_hostile_goal(id, castle);
    }
    tracing::info!(tick = now, size, "hostile wave arrived");
}

fn apply_events(kingdom: &mut TerritoryState, world: &mut SandboxWorld, events: Vec<SandboxEvent>, now: Tick) {
    for event in events {
        match event {
            SandboxEvent::HostileSlain { max_health, .. } => {
                kingdom.handle_hostile_slain(max_health, world);
            }
            SandboxEvent::UnitKilled {
                unit,
                position,
                killer,
                is_player,
            } => {
                let death = UnitDeath {
                    unit,
                    position,
                    killer: Some(Killer { id: killer, is_player }),
                };
                kingdom.handle_unit_death(now, death, world);
            }
        }
    }
}
