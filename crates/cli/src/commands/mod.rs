//! CLI Commands

pub mod show;

pub use show::ShowCommand;
