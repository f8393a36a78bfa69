//! Options handed to [`super::Stream::open`].

use super::Transport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Certificate checks requested for a TLS session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlsOptions {
    pub verify_peer: bool,
    pub verify_peer_name: bool,
}

impl TlsOptions {
    /// Both checks on, or both off.
    #[must_use]
    pub const fn verified(enabled: bool) -> Self {
        Self {
            verify_peer: enabled,
            verify_peer_name: enabled,
        }
    }
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self::verified(true)
    }
}

/// How to reach the server through a proxy tunnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyOptions {
    /// Tunnel endpoint, e.g. `tcp://proxy.example.com:3128`.
    pub proxy: String,
    pub request_fulluri: bool,
    /// Complete `Proxy-Authorization` header line, without CRLF.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

/// Nested socket options, keyed the way the transport looks them up:
/// TLS checks under `ssl`, proxy settings under the transport name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocketOptions {
    #[serde(rename = "ssl", skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,
    pub transports: BTreeMap<String, ProxyOptions>,
}

impl SocketOptions {
    #[must_use]
    pub fn proxy_for(&self, transport: Transport) -> Option<&ProxyOptions> {
        self.transports.get(transport.as_str())
    }

    /// TLS checks to apply, defaulting to full verification.
    #[must_use]
    pub fn tls_or_default(&self) -> TlsOptions {
        self.tls.unwrap_or_default()
    }
}
