//! CLI command implementations

pub mod board;
pub mod completions;
pub mod config;
pub mod library;
pub mod populate;
pub mod template;
