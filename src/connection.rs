//! IMAP connection over a pluggable stream
//!
//! [`Connection`] owns exactly one [`Stream`] and decides how it is
//! opened: which transport, which TLS method, which certificate checks,
//! which proxy and which timeouts. It also resolves message identifiers
//! into the `UID` prefix used when framing commands.

use crate::error::{Error, Result};
use crate::proxy::{ProxyConfig, ProxyPatch};
use crate::stream::{SocketOptions, SocketStream, Stream, StreamMeta, TlsOptions, Transport};
use crate::tls::{CryptoCapabilities, CryptoMethod, RustlsCapabilities};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default time allowed for establishing the connection.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// How the connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encryption {
    /// Implicit TLS, `ssl` transport.
    Ssl,
    /// Implicit TLS, `tls` transport.
    Tls,
    /// Plaintext upgraded with the STARTTLS command.
    StartTls,
}

impl Encryption {
    /// The transport the stream is opened with.
    #[must_use]
    pub const fn transport(self) -> Transport {
        match self {
            Self::Ssl => Transport::Ssl,
            Self::Tls => Transport::Tls,
            Self::StartTls => Transport::Tcp,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssl => "ssl",
            Self::Tls => "tls",
            Self::StartTls => "starttls",
        }
    }

    /// Parse a configuration value. `notls`, `none`, `false` and the
    /// empty string mean no encryption.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for any other unknown value.
    pub fn from_config(value: &str) -> Result<Option<Self>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssl" => Ok(Some(Self::Ssl)),
            "tls" => Ok(Some(Self::Tls)),
            "starttls" => Ok(Some(Self::StartTls)),
            "" | "notls" | "none" | "false" => Ok(None),
            other => Err(Error::Config(format!("Unknown encryption: {other}"))),
        }
    }
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a command addresses messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// Search results should be UIDs.
    SearchUid,
    /// Messages are fetched by UID.
    FetchUid,
    /// Plain message sequence numbers.
    Sequence,
    /// An already resolved command keyword.
    Keyword(String),
}

impl Identifier {
    /// The prefix this identifier puts in front of a command: `UID`,
    /// the keyword itself, or nothing.
    #[must_use]
    pub fn uid_key(&self) -> &str {
        match self {
            Self::SearchUid | Self::FetchUid => "UID",
            Self::Keyword(keyword) if !keyword.is_empty() && !is_numeric(keyword) => keyword,
            Self::Keyword(_) | Self::Sequence => "",
        }
    }
}

impl From<u32> for Identifier {
    fn from(_: u32) -> Self {
        Self::Sequence
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        if s.is_empty() || is_numeric(s) {
            Self::Sequence
        } else {
            Self::Keyword(s.to_string())
        }
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// Resolve `identifier` to its command prefix.
pub fn uid_key(identifier: impl Into<Identifier>) -> String {
    identifier.into().uid_key().to_string()
}

/// Prefix `command` with the key `identifier` resolves to.
///
/// ```
/// use imap_connection::{Identifier, build_uid_command};
///
/// assert_eq!(build_uid_command("FETCH 1:*", Identifier::FetchUid), "UID FETCH 1:*");
/// assert_eq!(build_uid_command("FETCH 1:*", 5), "FETCH 1:*");
/// ```
pub fn build_uid_command(command: &str, identifier: impl Into<Identifier>) -> String {
    format!("{} {}", identifier.into().uid_key(), command)
        .trim()
        .to_string()
}

/// Whether `s` reads as a number: optional sign, digits with an
/// optional fraction, optional exponent, surrounding whitespace allowed.
fn is_numeric(s: &str) -> bool {
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    let s = s.trim_matches(|c: char| c.is_ascii_whitespace());
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if (int.is_empty() && frac.is_empty()) || !digits(int) || !digits(frac) {
        return false;
    }
    exponent.is_none_or(|e| {
        let e = e.strip_prefix(['+', '-']).unwrap_or(e);
        !e.is_empty() && digits(e)
    })
}

/// A connection to an IMAP server over a stream `S`.
#[derive(Debug)]
pub struct Connection<S: Stream = SocketStream> {
    stream: S,
    encryption: Option<Encryption>,
    cert_validation: bool,
    connection_timeout: Duration,
    proxy: ProxyConfig,
    capabilities: Box<dyn CryptoCapabilities + Send + Sync>,
}

impl<S: Stream> Connection<S> {
    /// Wrap `stream`. No encryption, certificate validation on, 30
    /// second connection timeout, no proxy.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            encryption: None,
            cert_validation: true,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            proxy: ProxyConfig::default(),
            capabilities: Box::new(RustlsCapabilities),
        }
    }

    /// Replace the source of TLS capability answers.
    #[must_use]
    pub fn with_capabilities(
        mut self,
        capabilities: impl CryptoCapabilities + Send + Sync + 'static,
    ) -> Self {
        self.capabilities = Box::new(capabilities);
        self
    }

    pub const fn stream(&self) -> &S {
        &self.stream
    }

    pub const fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Close the current stream and put `stream` in its place,
    /// returning the old one.
    pub fn replace_stream(&mut self, stream: S) -> S {
        self.stream.close();
        std::mem::replace(&mut self.stream, stream)
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    #[must_use]
    pub const fn encryption(&self) -> Option<Encryption> {
        self.encryption
    }

    pub const fn set_encryption(&mut self, encryption: Option<Encryption>) {
        self.encryption = encryption;
    }

    /// The strongest TLS method the capability source supports.
    #[must_use]
    pub fn crypto_method(&self) -> Option<CryptoMethod> {
        CryptoMethod::strongest(self.capabilities.as_ref())
    }

    #[must_use]
    pub const fn cert_validation(&self) -> bool {
        self.cert_validation
    }

    pub const fn enable_cert_validation(&mut self) {
        self.cert_validation = true;
    }

    pub const fn disable_cert_validation(&mut self) {
        self.cert_validation = false;
    }

    pub const fn set_cert_validation(&mut self, enabled: bool) {
        self.cert_validation = enabled;
    }

    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    pub const fn set_connection_timeout(&mut self, timeout: Duration) {
        self.connection_timeout = timeout;
    }

    #[must_use]
    pub const fn proxy(&self) -> &ProxyConfig {
        &self.proxy
    }

    /// Apply the fields `patch` supplies; others keep their value.
    pub fn set_proxy(&mut self, patch: ProxyPatch) {
        self.proxy = self.proxy.merged(patch);
    }

    /// Apply a read/write timeout to the open stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the stream rejects it.
    pub fn set_stream_timeout(&mut self, timeout: Duration) -> Result<()> {
        if self.stream.set_timeout(timeout) {
            Ok(())
        } else {
            Err(Error::ConnectionFailed(format!(
                "Failed to set stream timeout to {timeout:?}"
            )))
        }
    }

    /// The transport the configured encryption calls for.
    #[must_use]
    pub fn transport(&self) -> Transport {
        self.encryption.map_or(Transport::Tcp, Encryption::transport)
    }

    /// Socket options for opening `transport`.
    ///
    /// TLS checks are only included when an encryption is configured;
    /// proxy settings only when a proxy endpoint is.
    #[must_use]
    pub fn default_socket_options(&self, transport: Transport) -> SocketOptions {
        let mut options = SocketOptions::default();
        if self.encryption.is_some() {
            options.tls = Some(TlsOptions::verified(self.cert_validation));
        }
        if let Some(proxy) = self.proxy.options() {
            options
                .transports
                .insert(transport.as_str().to_string(), proxy);
        }
        options
    }

    /// Open the stream to `host:port`.
    ///
    /// The stream always receives TLS checks matching the current
    /// certificate validation setting, so a later [`Self::enable_crypto`]
    /// honors it even without a configured encryption. Changing the
    /// setting after `open` has no effect until the next `open`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the stream cannot be
    /// opened.
    pub fn open(&mut self, host: &str, port: u16) -> Result<()> {
        let transport = self.transport();
        let mut options = self.default_socket_options(transport);
        if options.tls.is_none() {
            options.tls = Some(TlsOptions::verified(self.cert_validation));
        }

        debug!("Connecting to {}:{} over {}", host, port, transport);
        if self
            .stream
            .open(transport, host, port, self.connection_timeout, &options)
        {
            Ok(())
        } else {
            Err(Error::ConnectionFailed(format!(
                "Could not connect to {host}:{port}"
            )))
        }
    }

    /// Upgrade the open stream to TLS using [`Self::crypto_method`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if no method is available and
    /// [`Error::ConnectionFailed`] if the handshake fails.
    pub fn enable_crypto(&mut self) -> Result<CryptoMethod> {
        let method = self
            .crypto_method()
            .ok_or_else(|| Error::Tls("No supported TLS method".to_string()))?;
        if self.stream.set_crypto_enabled(true, method) {
            Ok(method)
        } else {
            Err(Error::ConnectionFailed(format!(
                "Failed to enable {method} on the stream"
            )))
        }
    }

    pub fn close(&mut self) {
        self.stream.close();
    }

    pub fn connected(&self) -> bool {
        self.stream.is_open()
    }

    /// Stream metadata, or the fixed disconnected record when the
    /// stream is not open.
    pub fn meta(&self) -> StreamMeta {
        if self.stream.is_open() {
            self.stream.metadata()
        } else {
            StreamMeta::disconnected()
        }
    }

    pub fn write(&mut self, data: &[u8]) -> Option<usize> {
        self.stream.write(data)
    }

    pub fn read(&mut self, max: usize) -> Option<Vec<u8>> {
        self.stream.read(max)
    }

    pub fn read_line(&mut self) -> Option<Vec<u8>> {
        self.stream.read_line()
    }
}
