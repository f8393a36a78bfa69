//! Byte-level transports.
//!
//! Everything above this module talks to the server through the
//! [`Stream`] trait. Two implementations ship with the crate:
//!
//! - [`SocketStream`] -- a TCP socket, optionally tunneled through an
//!   HTTP proxy and optionally wrapped in a rustls session.
//! - [`FakeStream`] -- a scripted, in-memory stream for driving
//!   protocol logic in tests without a server.
//!
//! Ordinary I/O conditions (nothing to read yet, end of stream, writing
//! to a closed channel) are reported through `Option`/`bool` sentinels,
//! never through errors.

mod fake;
mod meta;
mod options;
mod socket;

pub use fake::FakeStream;
pub use meta::{CryptoInfo, MetaKey, MetaValue, StreamMeta};
pub use options::{ProxyOptions, SocketOptions, TlsOptions};
pub use socket::SocketStream;

use crate::error::Error;
use crate::tls::CryptoMethod;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How the socket is opened.
///
/// `Ssl` and `Tls` negotiate TLS right after the TCP handshake
/// (implicit TLS, usually port 993). `Tcp` starts in plaintext and may
/// later be upgraded with [`Stream::set_crypto_enabled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Tcp,
    Ssl,
    Tls,
}

impl Transport {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ssl => "ssl",
            Self::Tls => "tls",
        }
    }

    /// Whether TLS is negotiated as part of opening the channel.
    #[must_use]
    pub const fn is_implicit_tls(self) -> bool {
        matches!(self, Self::Ssl | Self::Tls)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "ssl" => Ok(Self::Ssl),
            "tls" => Ok(Self::Tls),
            other => Err(Error::Config(format!("Unknown transport: {other}"))),
        }
    }
}

/// The capability contract shared by every transport.
///
/// Implementations are used from a single thread of control; a
/// [`crate::Connection`] owns exactly one of them.
pub trait Stream {
    /// Establish the channel.
    ///
    /// An already open channel is closed first. Failures are logged and
    /// reported as `false`.
    fn open(
        &mut self,
        transport: Transport,
        host: &str,
        port: u16,
        timeout: Duration,
        options: &SocketOptions,
    ) -> bool;

    /// Release the channel and drop any buffered, unread data.
    ///
    /// Safe to call on a closed channel. Pending writes are not flushed.
    fn close(&mut self);

    /// Read up to `max` bytes.
    ///
    /// Returns `Some(vec![])` when nothing is available yet but the
    /// channel is still usable, and `None` when the channel is closed or
    /// at end-of-stream with nothing buffered.
    fn read(&mut self, max: usize) -> Option<Vec<u8>>;

    /// Read the next `\n`-terminated chunk, terminator included.
    ///
    /// `None` when the channel is closed, timed out or exhausted.
    fn read_line(&mut self) -> Option<Vec<u8>>;

    /// Write `data`, returning the number of bytes written or `None` if
    /// the channel is not open.
    fn write(&mut self, data: &[u8]) -> Option<usize>;

    /// A snapshot of the transport state.
    fn metadata(&self) -> StreamMeta;

    fn is_open(&self) -> bool;

    /// Apply a read/write timeout.
    fn set_timeout(&mut self, timeout: Duration) -> bool;

    /// Turn transport-level encryption on or off using `method`.
    fn set_crypto_enabled(&mut self, enabled: bool, method: CryptoMethod) -> bool;
}
