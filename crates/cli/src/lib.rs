//! Rolelens CLI library: commands and console output

pub mod commands;
pub mod observer;
