//! Pedestrian evacuation simulation.

pub mod cancel;
pub mod cellular;
pub mod config;
pub mod simulator;
pub mod summary;
