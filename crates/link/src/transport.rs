//! Link transport: plain TCP, optionally wrapped in TLS.
//!
//! The manager dials the controller endpoint, optionally binding a local
//! source address first. TLS trust comes from an optional PEM bundle; the
//! blind-trust mode accepts any server certificate and is intended for lab
//! deployments only.

use crate::error::{LinkError, LinkResult};
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use stampede_config::{ManagerConfig, TransportMode};
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio_rustls::{client::TlsStream, TlsConnector};
use tracing::{info, warn};

/// An established connection to the controller.
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Transport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match &mut *self {
            Transport::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Transport::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Dials the configured controller endpoint.
pub async fn connect(config: &ManagerConfig) -> LinkResult<Transport> {
    let endpoint = config.controller_endpoint();
    let remote = resolve(&endpoint).await?;
    let stream = open_tcp(config, remote, &endpoint).await?;

    match config.transport {
        TransportMode::Plain => Ok(Transport::Plain(stream)),
        TransportMode::Tls => {
            let connector = tls_connector(config)?;
            let server_name = ServerName::try_from(config.controller_address.as_str())
                .map_err(|_| {
                    LinkError::tls(format!(
                        "'{}' is not a valid TLS server name",
                        config.controller_address
                    ))
                })?;
            let tls = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| LinkError::tls(e.to_string()))?;
            info!(endpoint = endpoint.as_str(), "TLS connection established");
            Ok(Transport::Tls(Box::new(tls)))
        }
    }
}

async fn resolve(endpoint: &str) -> LinkResult<SocketAddr> {
    let mut addresses = lookup_host(endpoint)
        .await
        .map_err(|e| LinkError::connect(endpoint, &e.to_string()))?;
    addresses
        .next()
        .ok_or_else(|| LinkError::connect(endpoint, "no addresses resolved"))
}

async fn open_tcp(
    config: &ManagerConfig,
    remote: SocketAddr,
    endpoint: &str,
) -> LinkResult<TcpStream> {
    match &config.source_address {
        Some(source) => {
            let local: IpAddr = source.parse().map_err(|_| {
                LinkError::connect(
                    endpoint.to_string(),
                    format!("bad source address '{}'", source),
                )
            })?;
            let socket = if remote.is_ipv4() {
                TcpSocket::new_v4()
            } else {
                TcpSocket::new_v6()
            }
            .map_err(|e| LinkError::connect(endpoint, &e.to_string()))?;
            socket
                .bind(SocketAddr::new(local, 0))
                .map_err(|e| LinkError::connect(endpoint, &e.to_string()))?;
            socket
                .connect(remote)
                .await
                .map_err(|e| LinkError::connect(endpoint, &e.to_string()))
        }
        None => TcpStream::connect(remote)
            .await
            .map_err(|e| LinkError::connect(endpoint, &e.to_string())),
    }
}

fn tls_connector(config: &ManagerConfig) -> LinkResult<TlsConnector> {
    let builder = ClientConfig::builder().with_safe_defaults();

    let mut client_config = if config.accept_any_certificate {
        warn!("blind-trust TLS enabled, accepting any server certificate");
        builder
            .with_root_certificates(RootCertStore::empty())
            .with_no_client_auth()
    } else {
        let mut roots = RootCertStore::empty();
        if let Some(path) = &config.ca_certificate_file {
            let pem = std::fs::read(path).map_err(|e| {
                LinkError::tls(format!("cannot read CA file {}: {}", path, e))
            })?;
            let certs = rustls_pemfile::certs(&mut pem.as_slice())
                .map_err(|e| LinkError::tls(format!("cannot parse CA file {}: {}", path, e)))?;
            for cert in certs {
                roots
                    .add(&Certificate(cert))
                    .map_err(|e| LinkError::tls(e.to_string()))?;
            }
        }
        builder.with_root_certificates(roots).with_no_client_auth()
    };

    if config.accept_any_certificate {
        client_config
            .dangerous()
            .set_certificate_verifier(Arc::new(AcceptAnyCertificate));
    }

    Ok(TlsConnector::from(Arc::new(client_config)))
}

/// Certificate verifier for the blind-trust mode.
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(endpoint: SocketAddr) -> ManagerConfig {
        ManagerConfig {
            controller_address: endpoint.ip().to_string(),
            controller_port: endpoint.port(),
            ..ManagerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_plain_connect() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let transport = connect(&config_for(endpoint)).await.unwrap();
        accept.await.unwrap();
        assert!(matches!(transport, Transport::Plain(_)));
    }

    #[tokio::test]
    async fn test_connect_with_source_bind() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap();

        let mut config = config_for(endpoint);
        config.source_address = Some("127.0.0.1".to_string());

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let transport = connect(&config).await.unwrap();
        let (_stream, peer) = accept.await.unwrap();
        assert!(matches!(transport, Transport::Plain(_)));
        assert_eq!(peer.ip().to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 on localhost is essentially never listening.
        let config = ManagerConfig {
            controller_address: "127.0.0.1".to_string(),
            controller_port: 1,
            ..ManagerConfig::default()
        };
        assert!(matches!(
            connect(&config).await,
            Err(LinkError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn test_bad_source_address() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config_for(listener.local_addr().unwrap());
        config.source_address = Some("not-an-ip".to_string());
        assert!(connect(&config).await.is_err());
    }
}
