// ABOUTME: gRPC channel creation with keep-alive and TLS configuration.
// ABOUTME: Builds the transport channel a topic write session attaches over.

use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

use crate::error::TopicClientError;

/// Keep-alive behavior for the HTTP/2 connection.
///
/// Write streams stay open for the life of a producer, so dead-peer detection
/// matters more here than for one-shot RPCs.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between keep-alive pings when the connection is idle.
    pub interval: Duration,
    /// How long to wait for a ping response before declaring the peer dead.
    pub timeout: Duration,
    /// Send pings even when no stream is active.
    pub while_idle: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(20),
            while_idle: true,
        }
    }
}

/// Configuration for connecting a topic service channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Server address, e.g. "http://localhost:50051".
    pub address: String,
    /// Keep-alive settings. None disables keep-alive entirely.
    pub keep_alive: Option<KeepAliveConfig>,
    /// Connection establishment timeout.
    pub connect_timeout: Option<Duration>,
    /// Enable TLS for the connection.
    pub use_tls: bool,
}

impl ChannelConfig {
    /// Create a config with defaults suited to long-lived write streams.
    /// TLS is inferred from the URL scheme: https:// turns it on.
    pub fn new(address: impl Into<String>) -> Self {
        let addr = address.into().trim().to_string();
        let use_tls = Self::detect_tls(&addr);
        Self {
            address: addr,
            keep_alive: Some(KeepAliveConfig::default()),
            connect_timeout: Some(Duration::from_secs(30)),
            use_tls,
        }
    }

    fn detect_tls(addr: &str) -> bool {
        addr.to_lowercase().starts_with("https://")
    }

    /// Rewrite the scheme so it agrees with the TLS setting.
    fn normalize_scheme(addr: &str, use_tls: bool) -> String {
        let lower = addr.to_lowercase();
        if use_tls && lower.starts_with("http://") {
            format!("https://{}", &addr[7..])
        } else if !use_tls && lower.starts_with("https://") {
            format!("http://{}", &addr[8..])
        } else {
            addr.to_string()
        }
    }

    /// Disable keep-alive pings.
    pub fn without_keep_alive(mut self) -> Self {
        self.keep_alive = None;
        self
    }

    /// Replace the keep-alive settings.
    pub fn with_keep_alive(mut self, config: KeepAliveConfig) -> Self {
        self.keep_alive = Some(config);
        self
    }

    /// Set the connection establishment timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Force TLS on, normalizing an http:// address to https://.
    pub fn with_tls(mut self) -> Self {
        self.use_tls = true;
        self.address = Self::normalize_scheme(&self.address, true);
        self
    }

    /// Force TLS off, normalizing an https:// address to http://.
    pub fn without_tls(mut self) -> Self {
        self.use_tls = false;
        self.address = Self::normalize_scheme(&self.address, false);
        self
    }
}

/// Connect a channel with the given configuration.
///
/// Applies TLS, keep-alive, and connect timeout in that order. Keep-alive is
/// what lets a producer notice a load balancer silently dropping its stream.
pub async fn create_channel(config: &ChannelConfig) -> Result<Channel, TopicClientError> {
    let mut endpoint = Endpoint::from_shared(config.address.clone())
        .map_err(|e| TopicClientError::InvalidAddress(e.to_string()))?;

    if config.use_tls {
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new())
            .map_err(|e| TopicClientError::ConnectionFailed(format!("tls setup failed: {e}")))?;
    }

    if let Some(ka) = &config.keep_alive {
        endpoint = endpoint
            .http2_keep_alive_interval(ka.interval)
            .keep_alive_timeout(ka.timeout)
            .keep_alive_while_idle(ka.while_idle);
    }

    if let Some(timeout) = config.connect_timeout {
        endpoint = endpoint.connect_timeout(timeout);
    }

    let channel = endpoint
        .connect()
        .await
        .map_err(|e| TopicClientError::ConnectionFailed(e.to_string()))?;

    tracing::debug!(
        address = %config.address,
        keep_alive = config.keep_alive.is_some(),
        use_tls = config.use_tls,
        "channel connected"
    );

    Ok(channel)
}

/// Connect without keep-alive, for short-lived or one-shot use.
pub async fn create_simple_channel(address: &str) -> Result<Channel, TopicClientError> {
    let config = ChannelConfig::new(address).without_keep_alive();
    create_channel(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Install crypto provider for TLS tests (idempotent)
    fn ensure_crypto_provider() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    #[test]
    fn default_config_keeps_long_lived_stream_settings() {
        let config = ChannelConfig::new("http://localhost:50051");
        assert_eq!(config.address, "http://localhost:50051");
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));

        let ka = config.keep_alive.unwrap();
        assert_eq!(ka.interval, Duration::from_secs(10));
        assert_eq!(ka.timeout, Duration::from_secs(20));
        assert!(ka.while_idle);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ChannelConfig::new("http://localhost:50051")
            .with_connect_timeout(Duration::from_secs(10))
            .with_keep_alive(KeepAliveConfig {
                interval: Duration::from_secs(5),
                timeout: Duration::from_secs(10),
                while_idle: false,
            });

        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        let ka = config.keep_alive.unwrap();
        assert_eq!(ka.interval, Duration::from_secs(5));
        assert!(!ka.while_idle);

        let config = ChannelConfig::new("http://localhost:50051").without_keep_alive();
        assert!(config.keep_alive.is_none());
    }

    #[test]
    fn tls_inferred_from_scheme_case_insensitively() {
        assert!(!ChannelConfig::new("http://localhost:50051").use_tls);
        assert!(ChannelConfig::new("https://localhost:50051").use_tls);
        assert!(ChannelConfig::new("HTTPS://localhost:50051").use_tls);
        assert!(ChannelConfig::new("HttpS://localhost:50051").use_tls);
        assert!(!ChannelConfig::new("HTTP://localhost:50051").use_tls);
    }

    #[test]
    fn address_whitespace_is_trimmed_before_detection() {
        let config = ChannelConfig::new("  https://localhost:50051  ");
        assert!(config.use_tls);
        assert_eq!(config.address, "https://localhost:50051");
    }

    #[test]
    fn with_tls_normalizes_scheme_and_preserves_path() {
        let config = ChannelConfig::new("http://example.com:8080/api/v1").with_tls();
        assert!(config.use_tls);
        assert_eq!(config.address, "https://example.com:8080/api/v1");

        let config = ChannelConfig::new("https://example.com:443/path").without_tls();
        assert!(!config.use_tls);
        assert_eq!(config.address, "http://example.com:443/path");
    }

    #[tokio::test]
    async fn connect_rejects_invalid_address() {
        let config = ChannelConfig::new("");
        let err = create_channel(&config).await.unwrap_err();
        // Tonic may report this at parse or at connect time.
        assert!(
            matches!(
                err,
                TopicClientError::InvalidAddress(_) | TopicClientError::ConnectionFailed(_)
            ),
            "expected InvalidAddress or ConnectionFailed, got {:?}",
            err
        );
    }

    #[tokio::test]
    async fn connect_reports_unreachable_server() {
        let config = ChannelConfig::new("http://127.0.0.1:1")
            .with_connect_timeout(Duration::from_millis(100));
        let result = create_channel(&config).await;
        assert!(matches!(
            result.unwrap_err(),
            TopicClientError::ConnectionFailed(_)
        ));

        let result = create_simple_channel("http://127.0.0.1:1").await;
        assert!(matches!(
            result.unwrap_err(),
            TopicClientError::ConnectionFailed(_)
        ));
    }

    /// A plaintext TCP server that accepts connections and sends garbage,
    /// so a TLS client fails its handshake rather than timing out.
    struct PlaintextServer {
        port: u16,
        shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
        handle: Option<std::thread::JoinHandle<()>>,
    }

    impl PlaintextServer {
        fn start() -> Self {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            listener.set_nonblocking(true).unwrap();

            let shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
            let shutdown_clone = shutdown.clone();

            let handle = std::thread::spawn(move || {
                while !shutdown_clone.load(std::sync::atomic::Ordering::Relaxed) {
                    if let Ok((mut stream, _)) = listener.accept() {
                        let _ = std::io::Write::write_all(&mut stream, b"NOT TLS\r\n");
                    }
                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            });

            PlaintextServer {
                port,
                shutdown,
                handle: Some(handle),
            }
        }
    }

    impl Drop for PlaintextServer {
        fn drop(&mut self) {
            self.shutdown
                .store(true, std::sync::atomic::Ordering::Relaxed);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    #[tokio::test]
    async fn tls_handshake_failure_reports_connection_failed() {
        ensure_crypto_provider();
        let server = PlaintextServer::start();
        let addr = format!("http://127.0.0.1:{}", server.port);

        let config = ChannelConfig::new(&addr)
            .with_tls()
            .with_connect_timeout(Duration::from_millis(100));
        assert!(config.address.starts_with("https://"));

        // A scheme mismatch would surface as InvalidAddress; the handshake
        // failure must come out as ConnectionFailed instead.
        let result = create_channel(&config).await;
        assert!(matches!(
            result.unwrap_err(),
            TopicClientError::ConnectionFailed(_)
        ));

        // Keep the server alive across the await.
        drop(server);
    }
}
