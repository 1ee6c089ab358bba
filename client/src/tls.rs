// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! TLS channel setup for the bootstrap client.
//!
//! The device has no provisioned TLS trust at first boot, so server
//! verification is optional: with `verify` disabled every presented
//! certificate is accepted and the security of the exchange rests entirely on
//! the ownership voucher, ownership certificate, and response signature.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

struct AcceptAnyServerCert;

impl rustls::client::ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::Certificate,
        _intermediates: &[rustls::Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

fn tls_config(trust_anchor_pem: &[u8], verify: bool) -> Result<rustls::ClientConfig> {
    let builder = rustls::ClientConfig::builder().with_safe_defaults();
    let mut config = if verify {
        let mut roots = rustls::RootCertStore::empty();
        let mut reader: &[u8] = trust_anchor_pem;
        for der in rustls_pemfile::certs(&mut reader).context("parsing trust anchor PEM")? {
            roots
                .add(&rustls::Certificate(der))
                .context("adding trust anchor")?;
        }
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        builder
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
            .with_no_client_auth()
    };
    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(config)
}

/// Open a TLS gRPC channel to `address` (`host:port`). With `verify` set the
/// server certificate must chain to `trust_anchor_pem`; otherwise all TLS
/// connections are implicitly trusted.
pub async fn connect(address: &str, trust_anchor_pem: &[u8], verify: bool) -> Result<Channel> {
    let config = Arc::new(tls_config(trust_anchor_pem, verify)?);

    let host = address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(address)
        .trim_start_matches('[')
        .trim_end_matches(']');
    let server_name = rustls::ServerName::try_from(host)
        .map_err(|_| anyhow!("invalid server name {host}"))?;

    let target = address.to_string();
    let connector = service_fn(move |_: Uri| {
        let config = config.clone();
        let server_name = server_name.clone();
        let target = target.clone();
        async move {
            let stream = TcpStream::connect(&target).await?;
            let tls = TlsConnector::from(config);
            tls.connect(server_name, stream).await
        }
    });

    let channel = Endpoint::from_shared(format!("https://{address}"))
        .context("building endpoint")?
        .connect_with_connector(connector)
        .await
        .context("connecting to bootz server")?;
    Ok(channel)
}
