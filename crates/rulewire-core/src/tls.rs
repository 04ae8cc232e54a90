//! TLS connector derivation from the target URL scheme and verify policy.

use tokio_tungstenite::Connector;
use url::Url;

use crate::config::SslVerify;
use crate::connect::ClientError;

/// Build the TLS connector for one connection attempt.
///
/// `ws` URLs get no connector; `wss` URLs get a native-tls connector
/// honoring the operator's verify policy.
pub fn connector_for(url: &Url, ssl_verify: &SslVerify) -> Result<Option<Connector>, ClientError> {
    if url.scheme() != "wss" {
        return Ok(None);
    }

    let mut builder = native_tls::TlsConnector::builder();
    match ssl_verify {
        SslVerify::Yes => {}
        SslVerify::No => {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        SslVerify::CaBundle(path) => {
            let pem = std::fs::read(path).map_err(|e| {
                ClientError::Tls(format!("cannot read CA bundle {}: {e}", path.display()))
            })?;
            let cert = native_tls::Certificate::from_pem(&pem)
                .map_err(|e| ClientError::Tls(format!("invalid CA bundle: {e}")))?;
            builder.add_root_certificate(cert);
        }
    }

    let connector = builder
        .build()
        .map_err(|e| ClientError::Tls(e.to_string()))?;
    Ok(Some(Connector::NativeTls(connector)))
}
