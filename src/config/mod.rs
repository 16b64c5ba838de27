// src/config/mod.rs

use anyhow::{Context, Result};
use std::{env, net::SocketAddr, time::Duration};
use url::Url;

/// The NSE market page the API scrapes.
pub const DEFAULT_SOURCE_URL: &str = "https://afx.kwayisi.org/nse/";

/// Upstream requests are abandoned after this long.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Zero-based position of the listings table among all tables on the page.
pub const DEFAULT_TABLE_INDEX: usize = 3;

/// Cloud Run style default.
pub const DEFAULT_PORT: u16 = 8080;

/// Everything the server needs, built once at startup and handed to `server::serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub source_url: Url,
    pub fetch_timeout: Duration,
    pub table_index: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            source_url: Url::parse(DEFAULT_SOURCE_URL).expect("default source URL should parse"),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            table_index: DEFAULT_TABLE_INDEX,
        }
    }
}

impl ServerConfig {
    /// Defaults, with `PORT` taken from the environment when the platform sets it.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(port) = env::var("PORT") {
            config.port = parse_port(&port)?;
        }
        Ok(config)
    }

    pub fn with_source_url(mut self, url: Url) -> Self {
        self.source_url = url;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Address to listen on: all interfaces, configured port.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim()
        .parse()
        .with_context(|| format!("PORT must be a port number, got {:?}", raw))
}
