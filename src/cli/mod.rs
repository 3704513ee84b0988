pub mod commands;
pub mod daemon;
