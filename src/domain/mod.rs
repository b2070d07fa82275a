//! Domain model
pub mod aggregates;
pub mod events;
