//! Server configuration.
//!
//! Values are layered, later sources winning: built-in defaults, the TOML file,
//! `RPCSERVER_*` environment variables, then command-line overrides.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

/// Config file read from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "rpcserver.toml";

const ENV_PREFIX: &str = "RPCSERVER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: IpAddr,
    pub http_port: u16,
    /// Prefix for the RPC endpoints; `/v1/{method}` and `/v2` are mounted below it.
    pub base_path: String,
    /// Qualifier for registered methods ("Arith" gives "Arith.Multiply"). Empty for none.
    pub service_name: String,
    pub max_body_bytes: usize,
    pub verbose: bool,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: 8080,
            base_path: "/jsonrpc".to_string(),
            service_name: "Arith".to_string(),
            max_body_bytes: 1024 * 1024,
            verbose: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `config_file` (or [`DEFAULT_CONFIG_FILE`]), the environment
    /// and `overrides`, whose `None` fields should be skipped when serializing.
    ///
    /// A missing config file is not an error.
    pub fn new<T: Serialize>(
        config_file: Option<&Path>,
        overrides: Option<&T>,
    ) -> Result<Self, figment::Error> {
        let path = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    /// `base_path` with a leading slash and no trailing slash ("" for the root).
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}
