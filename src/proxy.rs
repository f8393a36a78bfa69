//! Proxy tunnel configuration

use crate::stream::ProxyOptions;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Where and how to tunnel the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyConfig {
    /// Tunnel endpoint, e.g. `tcp://proxy.example.com:3128`.
    pub socket: Option<String>,
    pub request_fulluri: bool,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// A copy of `self` with every field `patch` supplies overwritten.
    #[must_use]
    pub fn merged(&self, patch: ProxyPatch) -> Self {
        Self {
            socket: patch.socket.or_else(|| self.socket.clone()),
            request_fulluri: patch.request_fulluri.unwrap_or(self.request_fulluri),
            username: patch.username.or_else(|| self.username.clone()),
            password: patch.password.or_else(|| self.password.clone()),
        }
    }

    /// Socket options for the tunnel, or `None` when no endpoint is set.
    ///
    /// A `Proxy-Authorization` header is only produced when a username
    /// is configured.
    #[must_use]
    pub fn options(&self) -> Option<ProxyOptions> {
        let socket = self.socket.as_ref()?;
        let header = self.username.as_ref().map(|username| {
            let password = self.password.as_deref().unwrap_or_default();
            let credentials = STANDARD.encode(format!("{username}:{password}"));
            format!("Proxy-Authorization: Basic {credentials}")
        });

        Some(ProxyOptions {
            proxy: socket.clone(),
            request_fulluri: self.request_fulluri,
            header,
        })
    }
}

/// A partial [`ProxyConfig`]; `None` fields leave the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProxyPatch {
    pub socket: Option<String>,
    pub request_fulluri: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.socket = Some(socket.into());
        self
    }

    #[must_use]
    pub const fn request_fulluri(mut self, enabled: bool) -> Self {
        self.request_fulluri = Some(enabled);
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.socket.is_none()
            && self.request_fulluri.is_none()
            && self.username.is_none()
            && self.password.is_none()
    }
}
