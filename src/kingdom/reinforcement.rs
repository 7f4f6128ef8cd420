//! Reinforcements sent when a kingdom unit falls

use ordered_float::OrderedFloat;

use crate::core::config::ReinforcementConfig;
use crate::core::types::{EntityId, Point3};
use crate::kingdom::territory::Territory;
use crate::kingdom::units::Roster;
use crate::world::{UnitHandle, WorldPort};

/// What the reinforcement squad was told to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Squad targets the killer
    Engage { killer: EntityId, units: usize },
    /// Killer gone; squad moves to where the unit fell
    Investigate { units: usize },
    /// Nobody free to send
    NoneAvailable,
}

impl Dispatch {
    pub fn units(&self) -> usize {
        match self {
            Dispatch::Engage { units, .. } | Dispatch::Investigate { units } => *units,
            Dispatch::NoneAvailable => 0,
        }
    }
}

/// Squad size by how close to the castle the unit fell
pub fn reinforcement_size(death_distance: f64, free: usize, config: &ReinforcementConfig) -> usize {
    let wanted = if death_distance < config.near_radius {
        config.near_min_squad.max(free / 2)
    } else if death_distance < config.mid_radius {
        config.mid_squad
    } else {
        config.far_squad
    };
    wanted.min(free)
}

/// Send the nearest free units toward a fallen unit's killer or position
pub fn dispatch_reinforcements<W: WorldPort>(
    fallen: EntityId,
    position: Point3,
    killer: Option<EntityId>,
    territory: &mut Territory,
    roster: &mut Roster,
    world: &mut W,
    config: &ReinforcementConfig,
) -> Dispatch {
    let mut free: Vec<UnitHandle> = world
        .find_friendly_units(territory.center(), f64::from(territory.radius()), None)
        .into_iter()
        .filter(|u| u.id != fallen && u.is_free())
        .collect();

    let size = reinforcement_size(position.distance(&territory.center()), free.len(), config);
    if size == 0 {
        tracing::debug!(kingdom = %territory.name(), "unit fell, no free units to reinforce");
        return Dispatch::NoneAvailable;
    }

    free.sort_by_key(|u| OrderedFloat(u.position.distance_sq(&position)));
    free.truncate(size);

    let target = killer.and_then(|id| world.resolve_actor(id)).filter(|a| a.alive);
    let dispatch = match target {
        Some(actor) => {
            for unit in &free {
                world.set_target(unit.id, Some(actor.id));
                roster.record_target(unit.id, Some(actor.id));
            }
            Dispatch::Engage {
                killer: actor.id,
                units: free.len(),
            }
        }
        None => {
            for unit in &free {
                world.move_to(unit.id, position);
            }
            Dispatch::Investigate { units: free.len() }
        }
    };

    territory.record(format!("Unit fell, {} reinforcements dispatched", dispatch.units()));
    tracing::info!(
        kingdom = %territory.name(),
        %fallen,
        ?dispatch,
        x = position.x,
        z = position.z,
        "reinforcements dispatched"
    );
    dispatch
}
