// Copyright 2025 Medgraph (https://github.com/medgraph)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Result;
use medgraph_core::CoreConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Medgraph Server Configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub server: HttpServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub metakg: MetaKgConfig,
    #[serde(default)]
    pub outbound: OutboundConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub core: CoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:47200")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Operator off switch. Caching additionally requires a configured host.
    #[serde(default = "default_result_caching")]
    pub result_caching: bool,

    /// Cache store host. Absent means caching stays disabled.
    pub host: Option<String>,

    #[serde(default = "default_cache_port")]
    pub port: u16,

    /// Per-key TTL in seconds
    #[serde(default = "default_key_expire_secs")]
    pub key_expire_secs: u64,
}

impl CacheConfig {
    /// Caching is on only when the operator did not opt out and an endpoint
    /// is configured.
    pub fn enabled(&self) -> bool {
        self.result_caching && self.host.is_some()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            result_caching: default_result_caching(),
            host: None,
            port: default_cache_port(),
            key_expire_secs: default_key_expire_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetaKgConfig {
    /// Path to the MetaKG operation catalog (JSON)
    pub catalog_path: Option<PathBuf>,

    /// Identifier-resolution service endpoint. Absent means identity
    /// normalization.
    pub resolver_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutboundConfig {
    /// Maximum concurrent downstream sub-queries
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-call timeout in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DumpConfig {
    /// Directory for per-edge record dumps. Absent disables dumping.
    pub path: Option<PathBuf>,

    /// Include the execution direction in dumps
    #[serde(default)]
    pub direction: bool,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:47200".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_result_caching() -> bool {
    true
}

fn default_cache_port() -> u16 {
    6379
}

fn default_key_expire_secs() -> u64 {
    600
}

fn default_max_concurrency() -> usize {
    8
}

fn default_call_timeout_secs() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig {
                listen_addr: default_http_addr(),
                enable_cors: default_enable_cors(),
            },
            cache: CacheConfig::default(),
            metakg: MetaKgConfig::default(),
            outbound: OutboundConfig::default(),
            dump: DumpConfig::default(),
            core: CoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - MEDGRAPH_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:47200)
    /// - RESULT_CACHING: set to "false" to disable result caching
    /// - REDIS_HOST / REDIS_PORT: cache store endpoint (presence of the host enables caching)
    /// - REDIS_KEY_EXPIRE_TIME: per-key TTL in seconds (default: 600)
    /// - MEDGRAPH_METAKG_PATH: MetaKG catalog file
    /// - MEDGRAPH_RESOLVER_URL: identifier-resolution endpoint
    /// - MEDGRAPH_DUMP_RECORDS: directory for per-edge record dumps
    /// - MEDGRAPH_DUMP_DIRECTION: include edge direction in dumps
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MEDGRAPH_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Ok(caching) = std::env::var("RESULT_CACHING") {
            config.cache.result_caching = caching.parse().unwrap_or(true);
        }

        if let Ok(host) = std::env::var("REDIS_HOST") {
            config.cache.host = Some(host);
        }

        if let Ok(port) = std::env::var("REDIS_PORT") {
            if let Ok(val) = port.parse() {
                config.cache.port = val;
            }
        }

        if let Ok(ttl) = std::env::var("REDIS_KEY_EXPIRE_TIME") {
            if let Ok(val) = ttl.parse() {
                config.cache.key_expire_secs = val;
            }
        }

        if let Ok(path) = std::env::var("MEDGRAPH_METAKG_PATH") {
            config.metakg.catalog_path = Some(PathBuf::from(path));
        }

        if let Ok(url) = std::env::var("MEDGRAPH_RESOLVER_URL") {
            config.metakg.resolver_url = Some(url);
        }

        if let Ok(path) = std::env::var("MEDGRAPH_DUMP_RECORDS") {
            config.dump.path = Some(PathBuf::from(path));
        }

        if let Ok(direction) = std::env::var("MEDGRAPH_DUMP_DIRECTION") {
            config.dump.direction = direction.parse().unwrap_or(false);
        }

        config
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        config = Self::merge_with_env(config);
        Ok(config)
    }

    /// Merge config with environment variables (env takes priority)
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        if std::env::var("MEDGRAPH_HTTP_ADDR").is_ok() {
            config.server.listen_addr = env_config.server.listen_addr;
        }
        if std::env::var("RESULT_CACHING").is_ok() {
            config.cache.result_caching = env_config.cache.result_caching;
        }
        if std::env::var("REDIS_HOST").is_ok() {
            config.cache.host = env_config.cache.host;
        }
        if std::env::var("REDIS_PORT").is_ok() {
            config.cache.port = env_config.cache.port;
        }
        if std::env::var("REDIS_KEY_EXPIRE_TIME").is_ok() {
            config.cache.key_expire_secs = env_config.cache.key_expire_secs;
        }
        if std::env::var("MEDGRAPH_METAKG_PATH").is_ok() {
            config.metakg.catalog_path = env_config.metakg.catalog_path;
        }
        if std::env::var("MEDGRAPH_RESOLVER_URL").is_ok() {
            config.metakg.resolver_url = env_config.metakg.resolver_url;
        }
        if std::env::var("MEDGRAPH_DUMP_RECORDS").is_ok() {
            config.dump.path = env_config.dump.path;
        }
        if std::env::var("MEDGRAPH_DUMP_DIRECTION").is_ok() {
            config.dump.direction = env_config.dump.direction;
        }

        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if let Some(path) = &self.metakg.catalog_path {
            if !path.exists() {
                anyhow::bail!("MetaKG catalog not found: {:?}", path);
            }
        }

        if let Some(dir) = &self.dump.path {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:47200");
        assert_eq!(config.cache.key_expire_secs, 600);
        assert!(!config.cache.enabled(), "no host configured");
    }

    #[test]
    fn test_caching_requires_host_and_opt_in() {
        let mut config = ServerConfig::default();
        config.cache.host = Some("127.0.0.1".into());
        assert!(config.cache.enabled());

        config.cache.result_caching = false;
        assert!(!config.cache.enabled(), "operator opt-out wins");
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("MEDGRAPH_HTTP_ADDR", "0.0.0.0:8080");
        std::env::set_var("RESULT_CACHING", "false");
        std::env::set_var("REDIS_KEY_EXPIRE_TIME", "120");

        let config = ServerConfig::from_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert!(!config.cache.result_caching);
        assert_eq!(config.cache.key_expire_secs, 120);

        std::env::remove_var("MEDGRAPH_HTTP_ADDR");
        std::env::remove_var("RESULT_CACHING");
        std::env::remove_var("REDIS_KEY_EXPIRE_TIME");
    }
}
