//! # Proxy-aware transports
//!
//! [`ProxyConnector::build`] turns one optional [`ProxyEndpoint`] into a
//! [`Transport`]: a pooled `reqwest::Client` for REST calls and a
//! [`TunnelDialer`] that opens raw TCP streams through the same proxy for
//! WebSocket upgrades.
//!
//! `socks4://` entries are dialed with the SOCKS5 implementation; there is
//! no SOCKS4 client here.
//!
//! `https://` proxies get the same plaintext CONNECT tunnel as `http://` ones.
//! Nothing speaks TLS to the proxy itself, so a proxy that only accepts TLS
//! fails the tunnel handshake.

use crate::error::{CoreError, NetworkError, ProxyError};
use crate::utils::proxy_manager::{ProxyEndpoint, ProxyScheme};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;
use tracing::debug;

const MAX_CONNECT_RESPONSE: usize = 8 * 1024;

/// Timeouts and pool limits applied to every transport.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub request_timeout: Duration,
    pub dial_timeout: Duration,
    pub handshake_timeout: Duration,
    pub pool_idle_timeout: Duration,
    /// Idle connections kept per host. reqwest has no global cap, so a
    /// transport that talks to two hosts may hold twice this many.
    pub max_idle_connections: usize,
    pub tcp_keepalive: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            dial_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            max_idle_connections: 100,
            tcp_keepalive: Duration::from_secs(30),
        }
    }
}

/// Everything an account needs to reach the outside world.
#[derive(Debug, Clone)]
pub struct Transport {
    pub http: reqwest::Client,
    pub dialer: TunnelDialer,
}

/// Opens TCP streams, directly or through a proxy tunnel.
#[derive(Debug, Clone)]
pub struct TunnelDialer {
    route: Route,
    dial_timeout: Duration,
    handshake_timeout: Duration,
}

#[derive(Debug, Clone)]
enum Route {
    Direct,
    HttpConnect(ProxyEndpoint),
    Socks5(ProxyEndpoint),
}

pub struct ProxyConnector;

impl ProxyConnector {
    pub fn build(
        endpoint: Option<&ProxyEndpoint>,
        settings: &TransportSettings,
    ) -> Result<Transport, ProxyError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.dial_timeout)
            .timeout(settings.request_timeout)
            .pool_idle_timeout(settings.pool_idle_timeout)
            .pool_max_idle_per_host(settings.max_idle_connections)
            .tcp_keepalive(settings.tcp_keepalive);

        let route = match endpoint {
            None => Route::Direct,
            Some(endpoint) => {
                let (proxy_url, route) = match endpoint.scheme()? {
                    ProxyScheme::Http | ProxyScheme::Https => (
                        endpoint.as_str().to_string(),
                        Route::HttpConnect(endpoint.clone()),
                    ),
                    scheme @ (ProxyScheme::Socks4 | ProxyScheme::Socks5) => {
                        if scheme == ProxyScheme::Socks4 {
                            debug!("Dialing SOCKS4 proxy {} with the SOCKS5 dialer", endpoint);
                        }
                        (socks5_url(endpoint), Route::Socks5(endpoint.clone()))
                    }
                };

                let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
                    ProxyError::DialerConstruction {
                        endpoint: endpoint.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                builder = builder.proxy(proxy);
                route
            }
        };

        let http = builder.build().map_err(|e| ProxyError::DialerConstruction {
            endpoint: endpoint.map_or_else(|| "direct".to_string(), ToString::to_string),
            reason: e.to_string(),
        })?;

        Ok(Transport {
            http,
            dialer: TunnelDialer {
                route,
                dial_timeout: settings.dial_timeout,
                handshake_timeout: settings.handshake_timeout,
            },
        })
    }
}

/// Hostnames are resolved by the proxy, as a SOCKS5 client normally does.
fn socks5_url(endpoint: &ProxyEndpoint) -> String {
    let url = endpoint.url();
    if url.username().is_empty() {
        format!("socks5h://{}", endpoint.authority())
    } else {
        format!(
            "socks5h://{}:{}@{}",
            url.username(),
            url.password().unwrap_or_default(),
            endpoint.authority()
        )
    }
}

impl TunnelDialer {
    pub fn direct(settings: &TransportSettings) -> Self {
        Self {
            route: Route::Direct,
            dial_timeout: settings.dial_timeout,
            handshake_timeout: settings.handshake_timeout,
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.route, Route::Direct)
    }

    /// Opens a TCP stream to `host:port`. For proxied routes the tunnel is
    /// fully established when this returns.
    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, CoreError> {
        let target = format!("{}:{}", host, port);
        match &self.route {
            Route::Direct => self.dial(&target).await,
            Route::HttpConnect(endpoint) => {
                let mut stream = self.dial(&endpoint.authority()).await?;
                timeout(
                    self.handshake_timeout,
                    http_connect(&mut stream, endpoint, &target),
                )
                .await
                .map_err(|_| self.handshake_timed_out(endpoint))??;
                Ok(stream)
            }
            Route::Socks5(endpoint) => {
                let socket = self.dial(&endpoint.authority()).await?;
                let handshake = async {
                    match endpoint.credentials() {
                        Some((user, pass)) => {
                            Socks5Stream::connect_with_password_and_socket(
                                socket,
                                (host, port),
                                &user,
                                &pass,
                            )
                            .await
                        }
                        None => Socks5Stream::connect_with_socket(socket, (host, port)).await,
                    }
                };
                let stream = timeout(self.handshake_timeout, handshake)
                    .await
                    .map_err(|_| self.handshake_timed_out(endpoint))?
                    .map_err(|e| ProxyError::TunnelRefused {
                        endpoint: endpoint.to_string(),
                        target: target.clone(),
                        reason: e.to_string(),
                    })?;
                Ok(stream.into_inner())
            }
        }
    }

    async fn dial(&self, authority: &str) -> Result<TcpStream, CoreError> {
        let stream = timeout(self.dial_timeout, TcpStream::connect(authority))
            .await
            .map_err(|_| NetworkError::Timeout {
                timeout_ms: self.dial_timeout.as_millis() as u64,
                stage: "dialing",
                endpoint: authority.to_string(),
            })?
            .map_err(|e| NetworkError::ConnectionRefused {
                endpoint: authority.to_string(),
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    fn handshake_timed_out(&self, endpoint: &ProxyEndpoint) -> CoreError {
        NetworkError::Timeout {
            timeout_ms: self.handshake_timeout.as_millis() as u64,
            stage: "handshaking with proxy",
            endpoint: endpoint.to_string(),
        }
        .into()
    }
}

async fn http_connect(
    stream: &mut TcpStream,
    endpoint: &ProxyEndpoint,
    target: &str,
) -> Result<(), CoreError> {
    let mut request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n");
    if let Some((user, pass)) = endpoint.credentials() {
        let token = BASE64.encode(format!("{}:{}", user, pass));
        request.push_str(&format!("Proxy-Authorization: Basic {}\r\n", token));
    }
    request.push_str("\r\n");

    let io_error = |e: std::io::Error| -> CoreError {
        NetworkError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    };

    stream
        .write_all(request.as_bytes())
        .await
        .map_err(io_error)?;

    // Read byte-wise so nothing past the header block is consumed.
    let mut response = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_CONNECT_RESPONSE {
            return Err(tunnel_refused(endpoint, target, "oversized CONNECT response"));
        }
        let n = stream.read(&mut byte).await.map_err(io_error)?;
        if n == 0 {
            return Err(tunnel_refused(endpoint, target, "proxy closed the connection"));
        }
        response.push(byte[0]);
    }

    let head = String::from_utf8_lossy(&response);
    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line.split_whitespace().nth(1).unwrap_or_default();
    if status == "200" {
        Ok(())
    } else {
        Err(tunnel_refused(endpoint, target, status_line))
    }
}

fn tunnel_refused(endpoint: &ProxyEndpoint, target: &str, reason: &str) -> CoreError {
    ProxyError::TunnelRefused {
        endpoint: endpoint.to_string(),
        target: target.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    #[test]
    fn test_build_direct_transport() {
        let transport = ProxyConnector::build(None, &TransportSettings::default()).unwrap();
        assert!(transport.dialer.is_direct());
    }

    #[test]
    fn test_build_socks4_uses_socks5_route() {
        let endpoint = ProxyEndpoint::parse("socks4://10.0.0.1:1080").unwrap();
        let transport =
            ProxyConnector::build(Some(&endpoint), &TransportSettings::default()).unwrap();
        assert!(matches!(transport.dialer.route, Route::Socks5(_)));
    }

    #[test]
    fn test_build_https_uses_plain_connect_route() {
        let endpoint = ProxyEndpoint::parse("https://10.0.0.3:8443").unwrap();
        let transport =
            ProxyConnector::build(Some(&endpoint), &TransportSettings::default()).unwrap();
        assert!(matches!(transport.dialer.route, Route::HttpConnect(_)));
    }

    #[test]
    fn test_default_idle_pool_limit() {
        let settings = TransportSettings::default();
        assert_eq!(settings.max_idle_connections, 100);
        assert_eq!(settings.pool_idle_timeout, Duration::from_secs(90));
    }

    #[test]
    fn test_socks5_url_keeps_credentials() {
        let endpoint = ProxyEndpoint::parse("socks5://bob:pw@10.0.0.2:9050").unwrap();
        assert_eq!(socks5_url(&endpoint), "socks5h://bob:pw@10.0.0.2:9050");
    }

    #[tokio::test]
    async fn test_http_connect_tunnel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let proxy = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let mut first = String::new();
            reader.read_line(&mut first).await.unwrap();
            let mut auth = None;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).await.unwrap();
                if line == "\r\n" {
                    break;
                }
                if line.starts_with("Proxy-Authorization") {
                    auth = Some(line.trim().to_string());
                }
            }
            let mut socket = reader.into_inner();
            socket
                .write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
                .await
                .unwrap();
            (first, auth)
        });

        let endpoint = ProxyEndpoint::parse(&format!("http://u:p@{}", addr)).unwrap();
        let transport =
            ProxyConnector::build(Some(&endpoint), &TransportSettings::default()).unwrap();
        transport.dialer.connect("example.org", 443).await.unwrap();

        let (first, auth) = proxy.await.unwrap();
        assert_eq!(first, "CONNECT example.org:443 HTTP/1.1\r\n");
        assert_eq!(auth.as_deref(), Some("Proxy-Authorization: Basic dTpw"));
    }

    #[tokio::test]
    async fn test_http_connect_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n")
                .await;
        });

        let endpoint = ProxyEndpoint::parse(&addr.to_string()).unwrap();
        let transport =
            ProxyConnector::build(Some(&endpoint), &TransportSettings::default()).unwrap();
        let err = transport.dialer.connect("example.org", 443).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Proxy(ProxyError::TunnelRefused { .. })
        ));
    }
}
