use pcsc::State;
use std::time::Duration;

use crate::core::commands::read_card;
use crate::core::config::Config;
use crate::core::error::DriverError;
use crate::core::quirks::initialise_reader;
use crate::core::reader::{ReaderContext, Watch};
use crate::core::registry::{Reconciliation, ReaderRegistry};
use crate::core::relay::Relay;

/// Watches for readers and cards, and relays card identifiers.
///
/// Everything runs on the caller's thread; the only blocking point is the
/// status change wait.
pub struct ReaderMonitor<C: ReaderContext> {
    ctx: C,
    registry: ReaderRegistry,
    relay: Relay,
    beep: bool,
    timeout: Duration,
}

impl<C: ReaderContext> ReaderMonitor<C> {
    /// Create a monitor and initialise the readers that are already attached
    pub fn new(ctx: C, relay: Relay, config: &Config) -> Result<Self, DriverError> {
        let mut monitor = Self {
            ctx,
            registry: ReaderRegistry::new(),
            relay,
            beep: config.beep,
            timeout: config.timeout(),
        };
        monitor.update_readers()?;
        Ok(monitor)
    }

    pub fn registry(&self) -> &ReaderRegistry {
        &self.registry
    }

    /// Re-enumerate readers, initialising new ones and forgetting those
    /// that have gone.
    pub fn update_readers(&mut self) -> Result<Reconciliation, DriverError> {
        let current = self.ctx.list_readers()?;
        let result = self.registry.reconcile(&current);

        for name in &result.added {
            log::info!("Reader connected: {name}");
            initialise_reader(&self.ctx, name, self.beep);
        }
        for name in &result.removed {
            log::info!("Reader disconnected: {name}");
        }

        Ok(result)
    }

    /// Wait for one batch of state changes and act on it.
    ///
    /// Reader list changes are applied after every reader in the batch has
    /// been dealt with.
    pub fn await_changes(&mut self) -> Result<(), DriverError> {
        let watchlist = self.registry.watchlist();
        let changes = self.ctx.await_change(&watchlist, self.timeout)?;

        let mut readers_changed = false;
        for change in changes {
            match change.watch {
                Watch::Topology => {
                    self.registry.set_topology_state(change.state);
                    if change.state.contains(State::CHANGED) {
                        readers_changed = true;
                    }
                }
                Watch::Reader(name) => {
                    if !self.registry.update(&name, change.state) {
                        log::debug!("Ignoring state change for unknown reader: {name}");
                        continue;
                    }
                    if change.state.contains(State::PRESENT) {
                        self.new_card(&name)?;
                    }
                }
            }
        }

        if readers_changed {
            self.update_readers()?;
        }

        Ok(())
    }

    /// Run until the smart card subsystem fails. Only returns with an error.
    pub fn run(&mut self) -> Result<(), DriverError> {
        loop {
            self.await_changes()?;
        }
    }

    fn new_card(&mut self, reader: &str) -> Result<(), DriverError> {
        log::debug!("Card present on {reader}");

        if let Some(id) = read_card(&self.ctx, reader)? {
            self.relay.forward(&id);
        }
        Ok(())
    }
}
