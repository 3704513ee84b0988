use pcsc::{Card, Context, Disposition, Protocols, ReaderState, Scope, ShareMode, State};
use std::collections::HashMap;
use std::ffi::CString;
use std::time::Duration;

use crate::core::error::DriverError;
use crate::core::utils::format_hex_spaced;

/// Vendor function number for CCID escape commands.
///
/// Only works if the CCID driver allows escape commands; on Linux that means
/// `ifdDriverOptions` set to `0x0001` in `libccid_Info.plist`.
#[cfg(windows)]
pub const ESCAPE_FUNCTION: u32 = 3500;
#[cfg(not(windows))]
pub const ESCAPE_FUNCTION: u32 = 1;

/// An entry in the list handed to [`ReaderContext::await_change`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Watch {
    /// A reader, by name
    Reader(String),
    /// Pseudo reader that changes whenever a reader is attached or detached
    Topology,
}

/// One changed entry from a status wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub watch: Watch,
    pub state: State,
}

/// A connected reader session.
///
/// Implementations must release the session in `close()` and again (as a
/// no-op if already closed) when dropped.
pub trait CardSession {
    /// Send a vendor control command; `function` is the vendor function
    /// number, not the platform control code.
    fn control(&mut self, function: u32, command: &[u8]) -> Result<Vec<u8>, DriverError>;

    /// Send an APDU and return the full response including SW1/SW2.
    fn transmit(&mut self, apdu: &[u8]) -> Result<Vec<u8>, DriverError>;

    /// Disconnect. Calling this more than once is fine.
    fn close(&mut self);
}

/// Access to the smart card subsystem
pub trait ReaderContext {
    type Session: CardSession;

    /// Names of all attached readers. No readers is an empty list, not an error.
    fn list_readers(&self) -> Result<Vec<String>, DriverError>;

    /// Block until one of the watched entries changes state or `timeout`
    /// elapses. Returns only entries flagged `CHANGED`; a timeout returns
    /// an empty list.
    fn await_change(
        &mut self,
        watchlist: &[(Watch, State)],
        timeout: Duration,
    ) -> Result<Vec<StateChange>, DriverError>;

    /// Open a session on a reader
    fn connect(
        &self,
        reader: &str,
        mode: ShareMode,
        protocols: Protocols,
    ) -> Result<Self::Session, DriverError>;
}

/// PC/SC backed reader context
pub struct PcscContext {
    context: Context,
    // Reader states from the previous wait. pcsc-lite keeps event counters in
    // the high bits of the state word, which `State` cannot carry, so the
    // raw states are reused rather than rebuilt.
    watched: HashMap<Watch, ReaderState>,
}

impl PcscContext {
    /// Establish a system scope PC/SC context
    pub fn establish() -> Result<Self, DriverError> {
        let context = Context::establish(Scope::System).map_err(DriverError::Establish)?;

        Ok(Self {
            context,
            watched: HashMap::new(),
        })
    }

    fn reader_state(&mut self, watch: &Watch, state: State) -> Result<ReaderState, DriverError> {
        if let Some(existing) = self.watched.remove(watch) {
            return Ok(existing);
        }

        let name = match watch {
            Watch::Reader(name) => reader_cstring(name)?,
            Watch::Topology => pcsc::PNP_NOTIFICATION().to_owned(),
        };
        Ok(ReaderState::new(name, state))
    }
}

impl ReaderContext for PcscContext {
    type Session = PcscCard;

    fn list_readers(&self) -> Result<Vec<String>, DriverError> {
        match self.context.list_readers_owned() {
            Ok(names) => Ok(names
                .iter()
                .map(|name| name.to_string_lossy().to_string())
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(DriverError::ListReaders(e)),
        }
    }

    fn await_change(
        &mut self,
        watchlist: &[(Watch, State)],
        timeout: Duration,
    ) -> Result<Vec<StateChange>, DriverError> {
        let mut states = Vec::with_capacity(watchlist.len());
        for (watch, state) in watchlist {
            states.push(self.reader_state(watch, *state)?);
        }
        // Anything not on the list any more is a reader that has gone away.
        self.watched.clear();

        let result = self.context.get_status_change(timeout, &mut states);

        let mut changes = Vec::new();
        if result.is_ok() {
            for ((watch, _), rs) in watchlist.iter().zip(states.iter_mut()) {
                let state = rs.event_state();
                if state.contains(State::CHANGED) {
                    changes.push(StateChange {
                        watch: watch.clone(),
                        state,
                    });
                }
                rs.sync_current_state();
            }
        }
        for ((watch, _), rs) in watchlist.iter().zip(states) {
            self.watched.insert(watch.clone(), rs);
        }

        match result {
            Ok(()) => Ok(changes),
            Err(pcsc::Error::Timeout) => Ok(Vec::new()),
            Err(e) => Err(DriverError::StatusChange(e)),
        }
    }

    fn connect(
        &self,
        reader: &str,
        mode: ShareMode,
        protocols: Protocols,
    ) -> Result<PcscCard, DriverError> {
        log::debug!("Connecting to reader: {reader} ({mode:?}, {protocols:?})");

        let name = reader_cstring(reader)?;
        let card = self
            .context
            .connect(&name, mode, protocols)
            .map_err(|source| DriverError::Connect {
                reader: reader.to_string(),
                source,
            })?;

        Ok(PcscCard {
            reader: reader.to_string(),
            card: Some(card),
        })
    }
}

/// A PC/SC card handle, disconnected on close or drop
pub struct PcscCard {
    reader: String,
    card: Option<Card>,
}

impl PcscCard {
    fn card(&self) -> Result<&Card, pcsc::Error> {
        self.card.as_ref().ok_or(pcsc::Error::InvalidHandle)
    }
}

impl CardSession for PcscCard {
    fn control(&mut self, function: u32, command: &[u8]) -> Result<Vec<u8>, DriverError> {
        log::debug!(
            "Control 0x{:X} on {}: {}",
            function,
            self.reader,
            format_hex_spaced(command)
        );

        let card = self.card().map_err(DriverError::Control)?;
        let mut response_buf = [0; pcsc::MAX_BUFFER_SIZE];
        let response = card
            .control(pcsc::ctl_code(function.into()), command, &mut response_buf)
            .map_err(DriverError::Control)?;

        log::debug!("Control response: {}", format_hex_spaced(response));
        Ok(response.to_vec())
    }

    fn transmit(&mut self, apdu: &[u8]) -> Result<Vec<u8>, DriverError> {
        log::debug!("Transmit on {}: {}", self.reader, format_hex_spaced(apdu));

        let card = self.card().map_err(DriverError::Transmit)?;
        let mut response_buf = [0; pcsc::MAX_BUFFER_SIZE];
        let response = card
            .transmit(apdu, &mut response_buf)
            .map_err(DriverError::Transmit)?;

        log::debug!("Received response: {}", format_hex_spaced(response));
        Ok(response.to_vec())
    }

    fn close(&mut self) {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                log::warn!("Failed to disconnect cleanly from {}: {e}", self.reader);
            }
        }
    }
}

impl Drop for PcscCard {
    fn drop(&mut self) {
        self.close();
    }
}

fn reader_cstring(name: &str) -> Result<CString, DriverError> {
    CString::new(name).map_err(|_| DriverError::InvalidReaderName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_cstring_rejects_nul() {
        assert!(reader_cstring("ACS ACR1252 1S CL Reader PICC 0").is_ok());
        assert!(matches!(
            reader_cstring("bad\0name"),
            Err(DriverError::InvalidReaderName(_))
        ));
    }

    #[test]
    fn test_watch_keys_are_distinct() {
        let mut map = HashMap::new();
        map.insert(Watch::Topology, 1);
        map.insert(Watch::Reader("Reader A".to_string()), 2);
        map.insert(Watch::Reader("Reader B".to_string()), 3);
        assert_eq!(map.len(), 3);
        assert_eq!(map[&Watch::Topology], 1);
    }
}
