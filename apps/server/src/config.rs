// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use cadview_session::RegistryConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Outbound frames buffered per connection before new ones are dropped.
    pub peer_queue_depth: usize,
    /// Interaction messages retained per session while no computation
    /// peer is attached.
    pub max_pending_per_session: usize,
    /// Largest accepted WebSocket message in MB.
    pub max_frame_size_mb: usize,
    /// Allowed CORS origins (comma-separated, or "*" for all).
    pub cors_origins: Vec<String>,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
            raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        }

        Self {
            host: parsed(var("HOST"), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: parsed(var("PORT"), 3939),
            peer_queue_depth: parsed(var("PEER_QUEUE_DEPTH"), 256).max(1),
            max_pending_per_session: parsed(var("MAX_PENDING_PER_SESSION"), 64),
            max_frame_size_mb: parsed(var("MAX_FRAME_SIZE_MB"), 256).max(1),
            cors_origins: var("CORS_ORIGINS")
                .unwrap_or_else(|| "http://localhost:3939,http://127.0.0.1:3939".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            log_json: var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn max_frame_bytes(&self) -> usize {
        self.max_frame_size_mb * 1024 * 1024
    }

    pub fn registry(&self) -> RegistryConfig {
        RegistryConfig {
            max_pending: self.max_pending_per_session,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
