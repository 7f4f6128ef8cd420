//! Kingdom Warden - autonomous territory defense and expansion
//!
//! The core decides; the host world executes. Implement the traits in
//! [`world`] for your engine, found a [`kingdom::TerritoryState`] and call
//! `tick` once per game tick.

pub mod core;
pub mod kingdom;
pub mod world;
