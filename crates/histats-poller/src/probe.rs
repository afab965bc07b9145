//! HTTP latency probe.
//!
//! Issues a single `GET` over a fresh HTTP/1.1 connection and measures the
//! time from connect until the response head arrives. The status code is
//! not inspected: any response counts as success.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::{Method, Request, Uri};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

const PROBE_USER_AGENT: &str = "histats/0.1";

/// Why a probe produced no sample.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("tls handshake failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("tls configuration error: {0}")]
    TlsConfig(#[from] rustls::Error),

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("failed to build request: {0}")]
    Build(#[from] http::Error),

    #[error("connection closed before a response arrived")]
    ConnectionClosed,

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can measure round-trip latency to a URL.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, url: &str) -> impl Future<Output = Result<Duration, ProbeError>> + Send;
}

/// Plain-HTTP and TLS probe with a per-request timeout.
#[derive(Clone)]
pub struct HttpProbe {
    tls: TlsConnector,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe that trusts the Mozilla root certificate store.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self {
            tls: TlsConnector::from(Arc::new(config)),
            timeout,
        })
    }

    async fn get(&self, url: &str) -> Result<Duration, ProbeError> {
        let target = Target::parse(url)?;
        let start = Instant::now();

        let tcp = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(ProbeError::Connect)?;

        if target.tls {
            let server_name = ServerName::try_from(target.host.clone()).map_err(|e| {
                ProbeError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let stream = self
                .tls
                .connect(server_name, tcp)
                .await
                .map_err(ProbeError::Tls)?;
            send_get(stream, &target).await?;
        } else {
            send_get(tcp, &target).await?;
        }

        Ok(start.elapsed())
    }
}

impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<Duration, ProbeError> {
        match tokio::time::timeout(self.timeout, self.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        }
    }
}

/// Connection details pulled out of an endpoint URL.
#[derive(Debug, PartialEq)]
struct Target {
    tls: bool,
    host: String,
    port: u16,
    authority: String,
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Self, ProbeError> {
        let invalid = |reason: &str| ProbeError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        let tls = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            _ => return Err(invalid("scheme must be http or https")),
        };
        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?;
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = authority.port_u16().unwrap_or(if tls { 443 } else { 80 });
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("/")
            .to_string();

        Ok(Self {
            tls,
            host,
            port,
            authority: authority.as_str().to_string(),
            path,
        })
    }
}

/// Send a GET over an established stream and wait for the response head.
async fn send_get<S>(stream: S, target: &Target) -> Result<(), ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(ProbeError::Handshake)?;

    let req = Request::builder()
        .method(Method::GET)
        .uri(target.path.as_str())
        .header(HOST, target.authority.as_str())
        .header(USER_AGENT, PROBE_USER_AGENT)
        .body(Empty::<Bytes>::new())?;

    // The connection is driven alongside the request so that dropping this
    // future (on timeout) tears the socket down too.
    let mut conn = std::pin::pin!(conn);
    let mut response = std::pin::pin!(sender.send_request(req));
    let closed = tokio::select! {
        biased;
        resp = response.as_mut() => return resp.map(drop).map_err(ProbeError::Request),
        res = conn.as_mut() => res,
    };

    // A server may write the whole response and close in one go; the head is
    // then already queued for the request future.
    match (response.await, closed) {
        (Ok(_), _) => Ok(()),
        (Err(_), Err(e)) => Err(ProbeError::Request(e)),
        (Err(_), Ok(())) => Err(ProbeError::ConnectionClosed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept connections forever, answering each with `response` after `delay`.
    async fn serve(response: &'static [u8], delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(delay).await;
                    let _ = socket.write_all(response).await;
                });
            }
        });
        format!("http://{addr}/ping")
    }

    fn probe(timeout: Duration) -> HttpProbe {
        HttpProbe::new(timeout).unwrap()
    }

    #[test]
    fn target_defaults_ports_and_path() {
        let t = Target::parse("https://www.google.com").unwrap();
        assert!(t.tls);
        assert_eq!(t.host, "www.google.com");
        assert_eq!(t.port, 443);
        assert_eq!(t.path, "/");

        let t = Target::parse("http://127.0.0.1:8080/health?full=1").unwrap();
        assert!(!t.tls);
        assert_eq!(t.port, 8080);
        assert_eq!(t.authority, "127.0.0.1:8080");
        assert_eq!(t.path, "/health?full=1");

        let t = Target::parse("http://[::1]:9000/").unwrap();
        assert_eq!(t.host, "::1");
    }

    #[test]
    fn target_rejects_bad_urls() {
        assert!(matches!(Target::parse("ftp://x"), Err(ProbeError::InvalidUrl { .. })));
        assert!(matches!(Target::parse("/just/a/path"), Err(ProbeError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn probe_measures_latency() {
        let url = serve(
            b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
            Duration::from_millis(20),
        )
        .await;

        let latency = probe(Duration::from_secs(2)).probe(&url).await.unwrap();
        assert!(latency >= Duration::from_millis(20), "latency was {latency:?}");
        assert!(latency < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn probe_ignores_status_code() {
        let url = serve(
            b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n",
            Duration::ZERO,
        )
        .await;

        assert!(probe(Duration::from_secs(2)).probe(&url).await.is_ok());
    }

    #[tokio::test]
    async fn probe_to_closed_port_fails() {
        let err = probe(Duration::from_millis(500))
            .probe("http://127.0.0.1:1/")
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Connect(_) | ProbeError::Timeout(_)), "got {err}");
    }

    #[tokio::test]
    async fn probe_succeeds_when_server_closes_after_response() {
        let url = serve(
            b"HTTP/1.1 301 Moved Permanently\r\nlocation: /\r\nconnection: close\r\ncontent-length: 0\r\n\r\n",
            Duration::ZERO,
        )
        .await;

        for _ in 0..5 {
            let result = probe(Duration::from_secs(2)).probe(&url).await;
            assert!(result.is_ok(), "got {result:?}");
        }
    }

    #[tokio::test]
    async fn probe_accepts_http10_response_without_length() {
        let url = serve(b"HTTP/1.0 200 OK\r\n\r\nhello", Duration::ZERO).await;

        let result = probe(Duration::from_secs(2)).probe(&url).await;
        assert!(result.is_ok(), "got {result:?}");
    }

    #[tokio::test]
    async fn probe_times_out_on_slow_target() {
        let url = serve(
            b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n",
            Duration::from_secs(5),
        )
        .await;

        let err = probe(Duration::from_millis(100)).probe(&url).await.unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(_)));
    }

    #[tokio::test]
    async fn probe_fails_when_server_hangs_up() {
        let url = serve(b"", Duration::ZERO).await;

        let err = probe(Duration::from_secs(2)).probe(&url).await.unwrap_err();
        assert!(
            matches!(err, ProbeError::Request(_) | ProbeError::ConnectionClosed),
            "got {err}"
        );
    }
}
