//! Where card identifiers go: a UDP listener, and optionally a virtual
//! keyboard used to wake the display first.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::core::commands::CardIdentifier;

/// Something that accepts one datagram at a time
#[cfg_attr(test, mockall::automock)]
pub trait DatagramSink {
    fn send_datagram(&mut self, message: &[u8]) -> io::Result<()>;
}

impl DatagramSink for UdpSocket {
    fn send_datagram(&mut self, message: &[u8]) -> io::Result<()> {
        self.send(message).map(|_| ())
    }
}

/// A device that can wake an idle display
#[cfg_attr(test, mockall::automock)]
pub trait WakeInput {
    fn wake(&mut self) -> io::Result<()>;
}

/// Create a UDP socket connected to `host:port`
pub fn connect_udp(host: &str, port: u16) -> io::Result<UdpSocket> {
    let dest = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("No address found for {host}"),
        )
    })?;

    let local: SocketAddr = if dest.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local)?;
    socket.connect(dest)?;
    log::debug!("Forwarding card identifiers to {dest}");
    Ok(socket)
}

/// Sends card identifiers on. Failures are logged and dropped, never returned.
pub struct Relay {
    sink: Box<dyn DatagramSink>,
    wake: Option<Box<dyn WakeInput>>,
}

impl Relay {
    pub fn new(sink: Box<dyn DatagramSink>) -> Self {
        Self { sink, wake: None }
    }

    /// Also press a key on `wake` before each identifier is sent
    pub fn with_wake(mut self, wake: Box<dyn WakeInput>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Forward one identifier. Returns whether the datagram went out.
    pub fn forward(&mut self, id: &CardIdentifier) -> bool {
        if let Some(wake) = self.wake.as_mut() {
            if let Err(e) = wake.wake() {
                log::warn!("Failed to send wake keypress: {e}");
            }
        }

        match self.sink.send_datagram(id.as_bytes()) {
            Ok(()) => {
                log::info!("Card read: {id}");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                log::debug!("Nothing listening, dropped {id}");
                false
            }
            Err(e) => {
                log::warn!("Failed to send {id}: {e}");
                false
            }
        }
    }
}

#[cfg(target_os = "linux")]
pub use self::uinput::WakeKeyboard;

#[cfg(target_os = "linux")]
mod uinput {
    use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
    use evdev::{AttributeSet, EventType, InputEvent, Key};
    use std::io;

    use super::WakeInput;

    const WAKE_KEY: Key = Key::KEY_LEFTSHIFT;

    /// uinput keyboard with a single key
    pub struct WakeKeyboard {
        device: VirtualDevice,
    }

    impl WakeKeyboard {
        /// Needs write access to `/dev/uinput`, so create it before
        /// dropping privileges.
        pub fn create() -> io::Result<Self> {
            let mut keys = AttributeSet::<Key>::new();
            keys.insert(WAKE_KEY);

            let device = VirtualDeviceBuilder::new()?
                .name("nfc-bridge")
                .with_keys(&keys)?
                .build()?;

            Ok(Self { device })
        }
    }

    impl WakeInput for WakeKeyboard {
        fn wake(&mut self) -> io::Result<()> {
            // emit() follows each batch with a SYN_REPORT
            self.device
                .emit(&[InputEvent::new(EventType::KEY, WAKE_KEY.code(), 1)])?;
            self.device
                .emit(&[InputEvent::new(EventType::KEY, WAKE_KEY.code(), 0)])
        }
    }
}
