use pcsc::{Protocols, ShareMode};
use std::fmt;

use crate::core::error::DriverError;
use crate::core::reader::{CardSession, ReaderContext};
use crate::core::utils::{describe_status_word, format_hex_spaced, split_status_word};

/// PC/SC GET DATA: return the UID of the card in the field
pub const READ_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];

/// Prefix on every identifier sent to the listener
pub const IDENTIFIER_TAG: &str = "nfc:";

/// A card UID as sent to the listener, e.g. `nfc:04aabbcc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardIdentifier(String);

impl CardIdentifier {
    pub fn from_uid(uid: &[u8]) -> Self {
        Self(format!("{IDENTIFIER_TAG}{}", hex::encode(uid)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CardIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interpret a GET DATA response.
///
/// Anything other than a `90 00` status gives `None`; these are logged at
/// debug level only, since a card pulled away mid-read is routine.
pub fn parse_uid_response(response: &[u8]) -> Option<CardIdentifier> {
    let Some((uid, sw1, sw2)) = split_status_word(response) else {
        log::debug!("Ignoring short response: [{}]", format_hex_spaced(response));
        return None;
    };

    if (sw1, sw2) != (0x90, 0x00) {
        log::debug!(
            "Ignoring response with status {:02X} {:02X} ({})",
            sw1,
            sw2,
            describe_status_word(sw1, sw2)
        );
        return None;
    }

    Some(CardIdentifier::from_uid(uid))
}

/// Read the UID of the card on `reader`.
///
/// The session is closed before the response is looked at, whether or not
/// the transmit worked. Connect and transmit failures are returned.
pub fn read_card<C: ReaderContext>(
    ctx: &C,
    reader: &str,
) -> Result<Option<CardIdentifier>, DriverError> {
    let mut session = ctx.connect(
        reader,
        ShareMode::Shared,
        Protocols::T0 | Protocols::T1 | Protocols::RAW,
    )?;
    let response = session.transmit(&READ_UID);
    session.close();

    Ok(parse_uid_response(&response?))
}
