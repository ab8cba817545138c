//! Byte transport to a broker: plain TCP or mutually-authenticated TLS.
//!
//! Kafka uses a binary protocol over TCP. The client initiates a socket
//! connection and then writes a sequence of request messages and reads
//! back the corresponding response messages. No handshake is required on
//! connection or disconnection.
//!
//! TCP is happier if you maintain persistent connections used for many
//! requests to amortize the cost of the TCP handshake, so dialed sockets
//! have keepalive enabled. Both stream flavors hide behind [`Transport`],
//! which the connection splits once into a read half for its reader task
//! and a write half for serialized request writes.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time;
use tokio_rustls::client::TlsStream;
use tokio_rustls::{rustls, TlsConnector};

use crate::error::{Error, Result};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Host and port of a single broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

/// The stream a connection owns, with TLS or without.
#[derive(Debug)]
pub(crate) enum Transport {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            Transport::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            Transport::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            Transport::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            Transport::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Dial the first broker that accepts a TCP connection.
///
/// The connect timeout applies to each address separately; the last
/// observed error is propagated when every address fails.
pub(crate) async fn dial_tcp_any(
    addrs: &[BrokerAddress],
    connect_timeout: Duration,
) -> Result<TcpStream> {
    let mut propagated_err: Option<Error> = None;
    for addr in addrs {
        tracing::debug!("Connecting to {}:{}", addr.host, addr.port);
        match dial_tcp(addr, connect_timeout).await {
            Ok(stream) => return Ok(stream),
            Err(e) => propagated_err = Some(e),
        }
    }
    Err(propagated_err.unwrap_or(Error::IoError(io::ErrorKind::NotFound)))
}

async fn dial_tcp(addr: &BrokerAddress, connect_timeout: Duration) -> Result<TcpStream> {
    let stream = time::timeout(
        connect_timeout,
        TcpStream::connect((addr.host.as_str(), addr.port)),
    )
    .await
    .map_err(|_| Error::IoError(io::ErrorKind::TimedOut))?
    .map_err(|e| Error::IoError(e.kind()))?;

    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_INTERVAL)
        .with_interval(KEEPALIVE_INTERVAL);
    SockRef::from(&stream)
        .set_tcp_keepalive(&keepalive)
        .map_err(|e| Error::IoError(e.kind()))?;

    Ok(stream)
}

/// Dial the first broker that completes a TLS handshake.
///
/// The CA bundle is the sole trust root; the client certificate and key
/// are presented to the broker. All three are PEM bytes. The TLS
/// configuration is validated before any socket is opened, so PEM
/// problems surface as [`Error::Tls`] without a dial attempt.
pub(crate) async fn dial_tls_any(
    addrs: &[BrokerAddress],
    ca_pem: &[u8],
    cert_pem: &[u8],
    key_pem: &[u8],
    connect_timeout: Duration,
) -> Result<TlsStream<TcpStream>> {
    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut &*ca_pem) {
        let cert = cert.map_err(|e| Error::Tls(e.to_string()))?;
        roots.add(cert).map_err(|e| Error::Tls(e.to_string()))?;
    }
    if roots.is_empty() {
        return Err(Error::Tls("cannot parse root certificate".to_string()));
    }

    let certs = load_certs(cert_pem)?;
    let key = load_key(key_pem)?;
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| Error::Tls(e.to_string()))?;
    let connector = TlsConnector::from(Arc::new(config));

    let mut propagated_err: Option<Error> = None;
    for addr in addrs {
        let domain = match ServerName::try_from(addr.host.clone()) {
            Ok(domain) => domain,
            Err(e) => {
                propagated_err = Some(Error::Tls(e.to_string()));
                continue;
            }
        };

        tracing::debug!("Connecting to {}:{} with TLS", addr.host, addr.port);
        match dial_tcp(addr, connect_timeout).await {
            Ok(stream) => match connector.connect(domain, stream).await {
                Ok(stream) => return Ok(stream),
                Err(e) => propagated_err = Some(Error::IoError(e.kind())),
            },
            Err(e) => propagated_err = Some(e),
        }
    }
    Err(propagated_err.unwrap_or(Error::IoError(io::ErrorKind::NotFound)))
}

fn load_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let certs = rustls_pemfile::certs(&mut &*pem)
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| Error::Tls(e.to_string()))?;
    if certs.is_empty() {
        return Err(Error::Tls("no certificate in PEM bundle".to_string()));
    }
    Ok(certs)
}

fn load_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    rustls_pemfile::private_key(&mut &*pem)
        .map_err(|e| Error::Tls(e.to_string()))?
        .ok_or_else(|| Error::Tls("no private key in PEM bundle".to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn garbage_ca_bundle_is_a_tls_error() {
        match load_certs(b"not a pem") {
            Err(Error::Tls(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_private_key_is_a_tls_error() {
        match load_key(b"") {
            Err(Error::Tls(_)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
