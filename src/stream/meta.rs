//! Stream metadata snapshots.
//!
//! The record has a fixed, closed set of keys. Keys are addressed by
//! their dotted names (`crypto.cipher_bits`, `eof`, ...) through
//! [`MetaKey`], and values through the typed [`MetaValue`] so that a
//! write can be checked against the shape of the value it replaces.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Negotiated encryption parameters. Empty strings and zero bits mean
/// "no encryption".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CryptoInfo {
    pub protocol: String,
    pub cipher_name: String,
    pub cipher_bits: u32,
    pub cipher_version: String,
}

/// A snapshot of a transport's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMeta {
    pub crypto: CryptoInfo,
    pub mode: String,
    pub eof: bool,
    pub blocked: bool,
    pub timed_out: bool,
    pub seekable: bool,
    pub unread_bytes: usize,
    pub stream_type: String,
}

impl StreamMeta {
    /// A fresh record with no encryption and all flags cleared.
    #[must_use]
    pub fn new(mode: impl Into<String>, stream_type: impl Into<String>) -> Self {
        Self {
            crypto: CryptoInfo::default(),
            mode: mode.into(),
            eof: false,
            blocked: false,
            timed_out: false,
            seekable: false,
            unread_bytes: 0,
            stream_type: stream_type.into(),
        }
    }

    /// The fixed record reported for a transport that is not open.
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            eof: true,
            blocked: true,
            timed_out: true,
            ..Self::new("c", "tcp_socket/unknown")
        }
    }

    #[must_use]
    pub fn get(&self, key: MetaKey) -> MetaValue {
        match key {
            MetaKey::CryptoProtocol => MetaValue::Str(self.crypto.protocol.clone()),
            MetaKey::CryptoCipherName => MetaValue::Str(self.crypto.cipher_name.clone()),
            MetaKey::CryptoCipherBits => MetaValue::Int(u64::from(self.crypto.cipher_bits)),
            MetaKey::CryptoCipherVersion => MetaValue::Str(self.crypto.cipher_version.clone()),
            MetaKey::Mode => MetaValue::Str(self.mode.clone()),
            MetaKey::Eof => MetaValue::Bool(self.eof),
            MetaKey::Blocked => MetaValue::Bool(self.blocked),
            MetaKey::TimedOut => MetaValue::Bool(self.timed_out),
            MetaKey::Seekable => MetaValue::Bool(self.seekable),
            MetaKey::UnreadBytes => {
                MetaValue::Int(u64::try_from(self.unread_bytes).unwrap_or(u64::MAX))
            }
            MetaKey::StreamType => MetaValue::Str(self.stream_type.clone()),
        }
    }

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetaShape`] if `value` is not of the same kind
    /// as the current value, or [`Error::Config`] if an integer does
    /// not fit the field.
    pub fn set(&mut self, key: MetaKey, value: MetaValue) -> Result<()> {
        match (key, value) {
            (MetaKey::CryptoProtocol, MetaValue::Str(s)) => self.crypto.protocol = s,
            (MetaKey::CryptoCipherName, MetaValue::Str(s)) => self.crypto.cipher_name = s,
            (MetaKey::CryptoCipherVersion, MetaValue::Str(s)) => self.crypto.cipher_version = s,
            (MetaKey::Mode, MetaValue::Str(s)) => self.mode = s,
            (MetaKey::StreamType, MetaValue::Str(s)) => self.stream_type = s,
            (MetaKey::Eof, MetaValue::Bool(b)) => self.eof = b,
            (MetaKey::Blocked, MetaValue::Bool(b)) => self.blocked = b,
            (MetaKey::TimedOut, MetaValue::Bool(b)) => self.timed_out = b,
            (MetaKey::Seekable, MetaValue::Bool(b)) => self.seekable = b,
            (MetaKey::CryptoCipherBits, MetaValue::Int(n)) => {
                self.crypto.cipher_bits = u32::try_from(n)
                    .map_err(|_| Error::Config(format!("{key} out of range: {n}")))?;
            }
            (MetaKey::UnreadBytes, MetaValue::Int(n)) => {
                self.unread_bytes = usize::try_from(n)
                    .map_err(|_| Error::Config(format!("{key} out of range: {n}")))?;
            }
            (key, value) => {
                return Err(Error::MetaShape {
                    key: key.as_str(),
                    expected: self.get(key).shape(),
                    actual: value.shape(),
                });
            }
        }
        Ok(())
    }
}

/// The closed set of metadata keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKey {
    CryptoProtocol,
    CryptoCipherName,
    CryptoCipherBits,
    CryptoCipherVersion,
    Mode,
    Eof,
    Blocked,
    TimedOut,
    Seekable,
    UnreadBytes,
    StreamType,
}

impl MetaKey {
    pub const ALL: [Self; 11] = [
        Self::CryptoProtocol,
        Self::CryptoCipherName,
        Self::CryptoCipherBits,
        Self::CryptoCipherVersion,
        Self::Mode,
        Self::Eof,
        Self::Blocked,
        Self::TimedOut,
        Self::Seekable,
        Self::UnreadBytes,
        Self::StreamType,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CryptoProtocol => "crypto.protocol",
            Self::CryptoCipherName => "crypto.cipher_name",
            Self::CryptoCipherBits => "crypto.cipher_bits",
            Self::CryptoCipherVersion => "crypto.cipher_version",
            Self::Mode => "mode",
            Self::Eof => "eof",
            Self::Blocked => "blocked",
            Self::TimedOut => "timed_out",
            Self::Seekable => "seekable",
            Self::UnreadBytes => "unread_bytes",
            Self::StreamType => "stream_type",
        }
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetaKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::UnknownMetaKey(s.to_string()))
    }
}

/// A metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Str(String),
    Int(u64),
    Bool(bool),
}

impl MetaValue {
    /// Name of the value's kind, used in shape mismatch errors.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u32> for MetaValue {
    fn from(n: u32) -> Self {
        Self::Int(u64::from(n))
    }
}

impl From<u64> for MetaValue {
    fn from(n: u64) -> Self {
        Self::Int(n)
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}
