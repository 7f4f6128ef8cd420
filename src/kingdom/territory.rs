//! Territory: the defended circle and its bookkeeping

use ahash::AHashSet;
use std::collections::VecDeque;

use crate::core::config::TerritoryConfig;
use crate::core::types::{ChunkCoord, Point3, CELL_SIZE};

/// The defended region, its treasury and its activity log
#[derive(Debug, Clone)]
pub struct Territory {
    name: String,
    center: Point3,
    radius: u32,
    points: u32,
    reserve_units: u32,
    controlled_cells: AHashSet<ChunkCoord>,
    activity_log: VecDeque<String>,
    log_capacity: usize,
}

impl Territory {
    /// Found a new territory with the configured starting radius and an empty treasury
    pub fn found(name: impl Into<String>, center: Point3, config: &TerritoryConfig) -> Self {
        Self::restore(name, center, config.initial_radius, 0, 0, Vec::new(), config.log_capacity)
    }

    /// Rebuild a territory from saved fields
    pub fn restore(
        name: impl Into<String>,
        center: Point3,
        radius: u32,
        points: u32,
        reserve_units: u32,
        log: Vec<String>,
        log_capacity: usize,
    ) -> Self {
        let mut territory = Self {
            name: name.into(),
            center,
            radius,
            points,
            reserve_units,
            controlled_cells: AHashSet::new(),
            activity_log: VecDeque::with_capacity(log_capacity),
            log_capacity,
        };
        for entry in log {
            territory.record(entry);
        }
        territory.recompute_controlled_cells();
        territory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn center(&self) -> Point3 {
        self.center
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn reserve_units(&self) -> u32 {
        self.reserve_units
    }

    pub fn controlled_cells(&self) -> &AHashSet<ChunkCoord> {
        &self.controlled_cells
    }

    /// Activity log, oldest entry first
    pub fn activity_log(&self) -> impl Iterator<Item = &str> {
        self.activity_log.iter().map(String::as_str)
    }

    pub fn log_len(&self) -> usize {
        self.activity_log.len()
    }

    pub fn contains(&self, point: &Point3) -> bool {
        let r = f64::from(self.radius);
        point.distance_sq(&self.center) <= r * r
    }

    /// Append to the activity log, evicting the oldest entry when full
    pub fn record(&mut self, message: impl Into<String>) {
        if self.log_capacity == 0 {
            return;
        }
        while self.activity_log.len() >= self.log_capacity {
            self.activity_log.pop_front();
        }
        self.activity_log.push_back(message.into());
    }

    pub fn add_points(&mut self, amount: u32, reason: &str) {
        self.points = self.points.saturating_add(amount);
        self.record(format!("+{amount} points: {reason}"));
        tracing::info!(kingdom = %self.name, amount, reason, total = self.points, "points added");
    }

    /// Deduct `amount` if affordable; the balance never goes negative
    pub fn try_spend(&mut self, amount: u32) -> bool {
        match self.points.checked_sub(amount) {
            Some(rest) => {
                self.points = rest;
                true
            }
            None => false,
        }
    }

    /// Change the radius and keep the controlled cells in step
    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius;
        self.recompute_controlled_cells();
    }

    pub fn recompute_controlled_cells(&mut self) {
        self.controlled_cells = cells_within(self.center, self.radius);
    }

    pub fn add_reserve_unit(&mut self) {
        self.reserve_units += 1;
    }

    /// Take one deferred unit out of the reserve
    pub fn take_reserve_unit(&mut self) -> bool {
        match self.reserve_units.checked_sub(1) {
            Some(rest) => {
                self.reserve_units = rest;
                true
            }
            None => false,
        }
    }
}

/// Cells whose offset from the center cell lies within `radius` (in cell units)
pub fn cells_within(center: Point3, radius: u32) -> AHashSet<ChunkCoord> {
    let origin = ChunkCoord::containing(&center);
    let cell_radius = (radius / CELL_SIZE as u32) as i32;
    let limit = cell_radius * cell_radius;

    let mut cells = AHashSet::new();
    for dx in -cell_radius..=cell_radius {
        for dz in -cell_radius..=cell_radius {
            if dx * dx + dz * dz <= limit {
                cells.insert(ChunkCoord::new(origin.x + dx, origin.z + dz));
            }
        }
    }
    cells
}
