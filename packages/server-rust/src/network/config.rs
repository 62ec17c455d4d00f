//! Network configuration types for the `zedex` server.

use std::path::PathBuf;
use std::time::Duration;

use zedex_core::codec::{FrameCodec, InboundFraming, DEFAULT_COMPRESSION_LEVEL};

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
    /// Per-connection settings.
    pub connection: ConnectionConfig,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// Maximum time to wait for a plain HTTP request to complete.
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            tls: None,
            connection: ConnectionConfig::default(),
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// TLS certificate configuration.
///
/// No `Default` impl because certificate paths have no sensible defaults.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM).
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM).
    pub key_path: PathBuf,
}

/// Per-connection configuration for RPC sessions.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bounded mpsc channel capacity for outbound frames per connection.
    pub outbound_channel_capacity: usize,
    /// Maximum time to wait when enqueueing an outbound frame.
    pub send_timeout: Duration,
    /// Largest inbound websocket message (and frame) accepted, in bytes.
    pub max_frame_size: usize,
    /// zstd level applied to outbound frames.
    pub compression_level: i32,
    /// Whether inbound frames are zstd-compressed.
    pub inbound_compression: bool,
    /// WebSocket write buffer size in bytes.
    pub ws_write_buffer_size: usize,
    /// Maximum WebSocket write buffer size in bytes.
    pub ws_max_write_buffer_size: usize,
}

impl ConnectionConfig {
    /// Builds the frame codec described by this configuration.
    #[must_use]
    pub fn codec(&self) -> FrameCodec {
        let inbound = if self.inbound_compression {
            InboundFraming::Zstd
        } else {
            InboundFraming::Raw
        };
        FrameCodec::new(self.compression_level, inbound, self.max_frame_size)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            outbound_channel_capacity: 256,
            send_timeout: Duration::from_secs(5),
            max_frame_size: 1024 * 1024, // 1 MiB
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            inbound_compression: false,
            ws_write_buffer_size: 131_072,     // 128 KB
            ws_max_write_buffer_size: 524_288, // 512 KB
        }
    }
}
