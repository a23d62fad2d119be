//! Command implementations: plan, sweep.

pub mod plan;
pub mod sweep;
