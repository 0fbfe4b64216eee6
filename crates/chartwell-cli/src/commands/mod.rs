//! CLI commands

pub mod repo;
pub mod search;
