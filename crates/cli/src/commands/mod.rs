//! CLI command implementations

pub mod cluster;
pub mod export;
pub mod healing;
