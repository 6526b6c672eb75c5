//! Runtime configuration for the ingestion server.

use std::net::{IpAddr, Ipv4Addr};

use tracehub_wire::frame::DEFAULT_MAX_FRAME_BYTES;

/// Port instrumented clients dial unless configured otherwise.
pub const DEFAULT_PORT: u16 = 12382;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind; all interfaces by default.
    pub bind: IpAddr,
    /// TCP port to listen on.
    pub port: u16,
    /// Upper bound in bytes for a single framed message.
    pub max_frame_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
