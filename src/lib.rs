//! nfc-bridge - relay NFC card identifiers from PC/SC readers to a local
//! UDP listener.
//!
//! The reader monitor watches for readers coming and going, switches off
//! the beep on the ACS readers it knows, and sends `nfc:<uid>` for every
//! card presented.
pub mod cli;
pub mod core;

// Re-export commonly used types
pub use crate::core::{
    commands::{read_card, CardIdentifier},
    config::Config,
    error::DriverError,
    monitor::ReaderMonitor,
    reader::{CardSession, PcscContext, ReaderContext, StateChange, Watch},
    relay::{DatagramSink, Relay, WakeInput},
};

// Common error type
pub type Result<T> = anyhow::Result<T>;
