//! Per-model reader setup, run once when a reader is first seen.
//!
//! The ACS readers handled here keep an LED/buzzer behaviour byte in
//! non-volatile memory, read and written with escape command `0x21`. The
//! byte is only written when it differs from what we want, to spare the
//! reader's flash.

use pcsc::{Protocols, ShareMode};

use crate::core::error::DriverError;
use crate::core::reader::{CardSession, ReaderContext, ESCAPE_FUNCTION};

/// Escape command: read the LED/buzzer behaviour byte
pub const READ_BEHAVIOUR: [u8; 5] = [0xE0, 0x00, 0x00, 0x21, 0x00];

/// Escape command: write the LED/buzzer behaviour byte
pub fn write_behaviour(value: u8) -> [u8; 6] {
    [0xE0, 0x00, 0x00, 0x21, 0x01, value]
}

/// A reader family we know how to configure
#[derive(Debug, Clone, Copy)]
pub struct ReaderModel {
    /// Reader names of this family start with this
    pub prefix: &'static str,
    /// Desired behaviour byte for the given beep setting
    pub behaviour: fn(beep: bool) -> u8,
}

/// Checked in order; the first matching prefix wins.
pub const KNOWN_READERS: &[ReaderModel] = &[
    ReaderModel {
        prefix: "ACS ACR1252",
        behaviour: acr1252_behaviour,
    },
    ReaderModel {
        prefix: "ACS ACR1255U-J1",
        behaviour: acr1255u_j1_behaviour,
    },
    ReaderModel {
        prefix: "ACS ACR1251",
        behaviour: acr1251_behaviour,
    },
];

/// ACR1252U behaviour byte
///
/// - bit 0: ICC activation status LED
/// - bit 1: PICC polling status LED
/// - bit 2: PICC activation status LED
/// - bit 3: card insertion and removal buzzer
/// - bit 5: contactless chip reset buzzer
/// - bit 7: card operation blinking LED
pub fn acr1252_behaviour(beep: bool) -> u8 {
    const BASE: u8 = 0x01 | 0x02 | 0x04 | 0x20 | 0x80;
    const CARD_BUZZER: u8 = 0x08;

    if beep {
        BASE | CARD_BUZZER
    } else {
        BASE
    }
}

/// ACR1255U-J1 behaviour byte
///
/// - bit 0: PICC polling status LED
/// - bit 1: PICC activation status LED
/// - bit 2: card insertion and removal buzzer
/// - bit 5: card operation blinking LED
/// - bit 7: must never be set; the reader stops polling until power cycled
pub fn acr1255u_j1_behaviour(beep: bool) -> u8 {
    const BASE: u8 = 0x01 | 0x02 | 0x20;
    const CARD_BUZZER: u8 = 0x04;
    const FORBIDDEN: u8 = 0x80;

    let value = if beep { BASE | CARD_BUZZER } else { BASE };
    value & !FORBIDDEN
}

/// ACR1251U behaviour byte
///
/// - bit 0: PICC polling status LED
/// - bit 1: PICC activation status LED
/// - bit 3: card insertion and removal buzzer
/// - bit 5: contactless chip reset buzzer
/// - bit 7: card operation blinking LED
pub fn acr1251_behaviour(beep: bool) -> u8 {
    const BASE: u8 = 0x01 | 0x02 | 0x20 | 0x80;
    const CARD_BUZZER: u8 = 0x08;

    if beep {
        BASE | CARD_BUZZER
    } else {
        BASE
    }
}

/// Find the model entry for a reader name
pub fn find_model(reader: &str) -> Option<&'static ReaderModel> {
    KNOWN_READERS
        .iter()
        .find(|model| reader.starts_with(model.prefix))
}

/// What happened when a reader was initialised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Not a reader we know how to configure
    Unsupported,
    /// Behaviour byte was already correct
    Unchanged,
    /// Behaviour byte was written
    Configured(u8),
    /// Something went wrong; the reader is left as it was
    Failed,
}

/// Bring the behaviour byte on an open session in line with `desired`.
/// Returns whether a write was needed.
pub fn sync_behaviour(session: &mut dyn CardSession, desired: u8) -> Result<bool, DriverError> {
    let response = session.control(ESCAPE_FUNCTION, &READ_BEHAVIOUR)?;

    if response.last() == Some(&desired) {
        return Ok(false);
    }

    session.control(ESCAPE_FUNCTION, &write_behaviour(desired))?;
    Ok(true)
}

/// Apply per-model setup to a newly seen reader.
///
/// Never fails: initialisation is best effort and errors are only logged.
pub fn initialise_reader<C: ReaderContext>(ctx: &C, reader: &str, beep: bool) -> InitOutcome {
    let Some(model) = find_model(reader) else {
        log::info!("No initialisation for reader: {reader}");
        return InitOutcome::Unsupported;
    };

    let desired = (model.behaviour)(beep);
    match configure(ctx, reader, desired) {
        Ok(true) => {
            log::info!("Set behaviour of {reader} to 0x{desired:02x}");
            InitOutcome::Configured(desired)
        }
        Ok(false) => {
            log::debug!("Behaviour of {reader} already 0x{desired:02x}");
            InitOutcome::Unchanged
        }
        Err(e) => {
            log::warn!("Failed to initialise reader {reader}: {e}");
            InitOutcome::Failed
        }
    }
}

fn configure<C: ReaderContext>(ctx: &C, reader: &str, desired: u8) -> Result<bool, DriverError> {
    let mut session = ctx.connect(reader, ShareMode::Direct, Protocols::RAW)?;
    let result = sync_behaviour(&mut session, desired);
    session.close();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Session that answers the read escape with a fixed byte and records
    /// every command sent
    struct RecordingSession {
        current: u8,
        fail_write: bool,
        sent: Vec<Vec<u8>>,
    }

    impl RecordingSession {
        fn new(current: u8) -> Self {
            Self {
                current,
                fail_write: false,
                sent: Vec::new(),
            }
        }
    }

    impl CardSession for RecordingSession {
        fn control(&mut self, function: u32, command: &[u8]) -> Result<Vec<u8>, DriverError> {
            assert_eq!(function, ESCAPE_FUNCTION);
            self.sent.push(command.to_vec());
            if command == READ_BEHAVIOUR {
                Ok(vec![0xE1, 0x00, 0x00, 0x00, 0x01, self.current])
            } else if self.fail_write {
                Err(DriverError::Control(pcsc::Error::CommError))
            } else {
                Ok(vec![0xE1, 0x00, 0x00, 0x00, 0x01, command[5]])
            }
        }

        fn transmit(&mut self, _apdu: &[u8]) -> Result<Vec<u8>, DriverError> {
            unreachable!("initialisation never transmits")
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_acr1252_behaviour() {
        assert_eq!(acr1252_behaviour(false), 0xa7);
        assert_eq!(acr1252_behaviour(true), 0xaf);
    }

    #[test]
    fn test_acr1255u_j1_never_sets_bit_7() {
        assert_eq!(acr1255u_j1_behaviour(false), 0x23);
        assert_eq!(acr1255u_j1_behaviour(true), 0x27);
        assert_eq!(acr1255u_j1_behaviour(true) & 0x80, 0);
        assert_eq!(acr1255u_j1_behaviour(false) & 0x80, 0);
    }

    #[test]
    fn test_acr1251_behaviour() {
        assert_eq!(acr1251_behaviour(false), 0xa3);
        assert_eq!(acr1251_behaviour(true), 0xab);
    }

    #[test]
    fn test_find_model_by_prefix() {
        let model = find_model("ACS ACR1252 1S CL Reader PICC 0").unwrap();
        assert_eq!(model.prefix, "ACS ACR1252");

        let model = find_model("ACS ACR1255U-J1 PICC Interface 00 00").unwrap();
        assert_eq!(model.prefix, "ACS ACR1255U-J1");

        let model = find_model("ACS ACR1251 Dual Reader [ACR1251 Dual Reader PICC] 00 00").unwrap();
        assert_eq!(model.prefix, "ACS ACR1251");

        assert!(find_model("ACS ACR122U PICC Interface 00 00").is_none());
        assert!(find_model("Generic Smart Card Reader").is_none());
        assert!(find_model("acs acr1252").is_none());
    }

    #[test]
    fn test_write_behaviour_frame() {
        assert_eq!(write_behaviour(0xa7), [0xE0, 0x00, 0x00, 0x21, 0x01, 0xa7]);
    }

    #[test]
    fn test_sync_skips_write_when_already_set() {
        let mut session = RecordingSession::new(0xa7);
        let written = sync_behaviour(&mut session, 0xa7).unwrap();

        assert!(!written);
        assert_eq!(session.sent, vec![READ_BEHAVIOUR.to_vec()]);
    }

    #[test]
    fn test_sync_writes_when_different() {
        let mut session = RecordingSession::new(0x6f);
        let written = sync_behaviour(&mut session, 0xaf).unwrap();

        assert!(written);
        assert_eq!(
            session.sent,
            vec![READ_BEHAVIOUR.to_vec(), write_behaviour(0xaf).to_vec()]
        );
    }

    #[test]
    fn test_sync_propagates_write_failure() {
        let mut session = RecordingSession::new(0x00);
        session.fail_write = true;

        assert!(sync_behaviour(&mut session, 0xa7).is_err());
        assert_eq!(session.sent.len(), 2);
    }
}
