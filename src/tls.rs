//! TLS method selection and rustls client setup
//!
//! A [`CryptoMethod`] names the family of TLS client handshakes to
//! offer. Which methods are usable depends on what the linked TLS
//! library supports, expressed through [`CryptoCapabilities`]; the
//! strongest usable one is picked from a fixed preference list.

use crate::error::{Error, Result};
use crate::stream::TlsOptions;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme, SupportedProtocolVersion};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];

/// TLS client handshake families, strongest first in
/// [`CryptoMethod::PREFERENCE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoMethod {
    /// TLS 1.2 only.
    Tls12Client,
    /// TLS 1.1 only.
    Tls11Client,
    /// Any TLS version the library negotiates.
    TlsClient,
}

impl CryptoMethod {
    pub const PREFERENCE: [Self; 3] = [Self::Tls12Client, Self::Tls11Client, Self::TlsClient];

    /// The first method in [`Self::PREFERENCE`] that `capabilities`
    /// supports.
    #[must_use]
    pub fn strongest(capabilities: &dyn CryptoCapabilities) -> Option<Self> {
        Self::PREFERENCE
            .into_iter()
            .find(|method| capabilities.supports(*method))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tls12Client => "tlsv1.2_client",
            Self::Tls11Client => "tlsv1.1_client",
            Self::TlsClient => "tls_client",
        }
    }

    /// Protocol versions rustls should offer for this method, or `None`
    /// if rustls cannot speak it.
    #[must_use]
    pub fn protocol_versions(self) -> Option<&'static [&'static SupportedProtocolVersion]> {
        match self {
            Self::Tls12Client => Some(TLS12_ONLY),
            Self::Tls11Client => None,
            Self::TlsClient => Some(rustls::ALL_VERSIONS),
        }
    }
}

impl fmt::Display for CryptoMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers which [`CryptoMethod`]s the platform can negotiate.
pub trait CryptoCapabilities: fmt::Debug {
    fn supports(&self, method: CryptoMethod) -> bool;
}

/// Capabilities of the rustls build linked into this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustlsCapabilities;

impl CryptoCapabilities for RustlsCapabilities {
    fn supports(&self, method: CryptoMethod) -> bool {
        method.protocol_versions().is_some()
    }
}

/// Build a rustls client configuration for `method` with the
/// certificate checks in `options`.
///
/// # Errors
///
/// Returns [`Error::Tls`] if rustls cannot offer `method`.
pub fn client_config(method: CryptoMethod, options: TlsOptions) -> Result<Arc<ClientConfig>> {
    let versions = method
        .protocol_versions()
        .ok_or_else(|| Error::Tls(format!("{method} is not supported by rustls")))?;
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(versions)
        .map_err(|e| Error::Tls(e.to_string()))?;

    let config = if !options.verify_peer {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(DangerousVerifier))
            .with_no_client_auth()
    } else if !options.verify_peer_name {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(ChainOnlyVerifier {
                roots: root_store(),
                provider,
            }))
            .with_no_client_auth()
    } else {
        builder
            .with_root_certificates(root_store())
            .with_no_client_auth()
    };

    Ok(Arc::new(config))
}

/// Parse `host` into the name rustls checks the certificate against.
///
/// # Errors
///
/// Returns [`Error::Tls`] if `host` is neither a DNS name nor an IP
/// address.
pub fn server_name(host: &str) -> Result<ServerName<'static>> {
    ServerName::try_from(host.to_string())
        .map_err(|e| Error::Tls(format!("Invalid server name: {e}")))
}

fn root_store() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

/// Certificate verifier that accepts all certificates.
#[derive(Debug)]
struct DangerousVerifier;

impl ServerCertVerifier for DangerousVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

/// Verifies the certificate chain against the webpki roots but not the
/// host name it was issued for.
#[derive(Debug)]
struct ChainOnlyVerifier {
    roots: RootCertStore,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for ChainOnlyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let cert = ParsedCertificate::try_from(end_entity)?;
        rustls::client::verify_server_cert_signed_by_trust_anchor(
            &cert,
            &self.roots,
            intermediates,
            now,
            self.provider.signature_verification_algorithms.all,
        )?;
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
