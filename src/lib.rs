//! Circl tutorial engine: persona-specific guided tours over the app shell.

pub mod config;
pub mod error;
pub mod store;
pub mod tutorial;
