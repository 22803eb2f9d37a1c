//! Command implementations

pub mod backfill;
pub mod common;
pub mod status;
pub mod verify;
