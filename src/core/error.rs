use thiserror::Error;

/// Failure reported by the PC/SC subsystem.
///
/// This is the only error the monitor loop lets escape; everything else
/// (device quirks, bad card responses, datagram sends) is absorbed where it
/// happens.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to establish PCSC context: {0}")]
    Establish(#[source] pcsc::Error),

    #[error("Failed to list readers: {0}")]
    ListReaders(#[source] pcsc::Error),

    #[error("Failed to get status change: {0}")]
    StatusChange(#[source] pcsc::Error),

    #[error("Failed to connect to reader {reader}: {source}")]
    Connect {
        reader: String,
        #[source]
        source: pcsc::Error,
    },

    #[error("Failed to control card: {0}")]
    Control(#[source] pcsc::Error),

    #[error("Failed to transmit: {0}")]
    Transmit(#[source] pcsc::Error),

    #[error("Invalid reader name: {0:?}")]
    InvalidReaderName(String),
}

impl DriverError {
    /// The underlying PC/SC status, if there is one.
    pub fn pcsc_error(&self) -> Option<pcsc::Error> {
        match self {
            Self::Establish(e)
            | Self::ListReaders(e)
            | Self::StatusChange(e)
            | Self::Control(e)
            | Self::Transmit(e) => Some(*e),
            Self::Connect { source, .. } => Some(*source),
            Self::InvalidReaderName(_) => None,
        }
    }
}
