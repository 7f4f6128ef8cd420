//! Kingdom simulation core
//!
//! A kingdom is a circular territory around a castle. Each tick it senses
//! hostiles, assigns its guards and knights, runs its point economy and
//! remembers whoever killed its units.

pub mod allocation;
pub mod economy;
pub mod persistence;
pub mod registry;
pub mod reinforcement;
pub mod revenge;
pub mod state;
pub mod territory;
pub mod threat;
pub mod units;

pub use allocation::{AllocationOutcome, TargetAllocator, TargetAssignment};
pub use economy::{EconomyManager, RecruitMode, Strategy};
pub use persistence::{TerritoryRecord, SAVE_VERSION};
pub use registry::{KingdomRegistry, WorldKey, WorldSlot};
pub use revenge::{RevengeRecord, RevengeTracker};
pub use state::{Killer, KingdomStatus, TerritoryState, TickReport, UnitDeath};
pub use territory::Territory;
pub use threat::{ThreatAssessor, ThreatLevel};
pub use units::{Anchor, Roster, Unit, UnitState};
