pub mod commands;
pub mod config;
pub mod error;
pub mod monitor;
pub mod quirks;
pub mod reader;
pub mod registry;
pub mod relay;
pub mod utils;
