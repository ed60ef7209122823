//! Subcommand implementations.

pub mod auth;
pub mod calendars;
pub mod config;
