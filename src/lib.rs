//! pcbpop: PCB component population
//!
//! Resolves which 3D model to place at each component location of a board
//! and with what transform, from pick-and-place, BOM and override tables
//! and a prioritized list of model libraries.

pub mod cli;
pub mod core;
pub mod entities;
pub mod logging;
pub mod yaml;
