//! TLS trust selection for newly built clients
//!
//! The default is the platform trust store bundled with the transport. When
//! trust-all mode is enabled every client instead gets a rustls configuration
//! whose verifier accepts any server certificate chain. That configuration is
//! built on first use and shared for the rest of the process.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustls::{
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::{verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms},
    pki_types::{CertificateDer, ServerName, UnixTime},
    ClientConfig, DigitallySignedStruct, SignatureScheme,
};
use tracing::warn;

use crate::error::{HttpError, Result};

static PERMISSIVE: OnceCell<Arc<ClientConfig>> = OnceCell::new();

/// Trust configuration consumed by the transport at build time
#[derive(Debug, Clone)]
pub enum TrustContext {
    /// Platform default roots
    Platform,
    /// Accept any certificate (see CVE-2013-7397 and CVE-2013-7398)
    Permissive(Arc<ClientConfig>),
}

impl TrustContext {
    /// Pick the trust context for the `accept_any_certificate` flag
    pub fn resolve(accept_any_certificate: bool) -> Result<Self> {
        if accept_any_certificate {
            Ok(TrustContext::Permissive(permissive_client_config()?))
        } else {
            Ok(TrustContext::Platform)
        }
    }

    pub fn is_permissive(&self) -> bool {
        matches!(self, TrustContext::Permissive(_))
    }
}

fn permissive_client_config() -> Result<Arc<ClientConfig>> {
    PERMISSIVE
        .get_or_try_init(|| {
            warn!("TLS certificate validation is disabled for the shared HTTP client");

            let provider = Arc::new(rustls::crypto::ring::default_provider());
            let verifier = Arc::new(AcceptAnyServerCert {
                algorithms: provider.signature_verification_algorithms,
            });

            let config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .map_err(|e| HttpError::Tls(e.to_string()))?
                .dangerous()
                .with_custom_certificate_verifier(verifier)
                .with_no_client_auth();

            Ok(Arc::new(config))
        })
        .cloned()
}

/// Skips chain and name validation; handshake signatures are still checked
#[derive(Debug)]
struct AcceptAnyServerCert {
    algorithms: WebPkiSupportedAlgorithms,
}

impl ServerCertVerifier for AcceptAnyServerCert {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.algorithms.supported_schemes()
    }
}
