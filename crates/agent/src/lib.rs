//! Healer agent: HTTP control API and periodic recovery sweeps

pub mod api;
pub mod config;
pub mod sweeper;
