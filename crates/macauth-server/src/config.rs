//! Environment-driven configuration
//!
//! The server runs inside a container alongside its database and admin
//! console, so all settings come from the environment rather than a
//! config file. Every variable has a deployable default; `from_env`
//! validates the combination before the server starts.

use crate::engine::VlanPolicy;
use ipnetwork::IpNetwork;
use std::env;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("Invalid client entry: {0}")]
    InvalidClient(String),
}

/// One parsed entry of `RADIUS_ALLOWED_CLIENTS`
///
/// Entries are comma-separated, each `host`, `cidr`, hostname, or `*`,
/// optionally suffixed with `:secret` to override the default shared
/// secret. An IPv6 exact address that needs its own secret must be
/// written in CIDR form (`::1/128:secret`) since bare colons are
/// ambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientSpec {
    /// Single IP address
    Exact { addr: IpAddr, secret: String },
    /// CIDR range
    Network { network: IpNetwork, secret: String },
    /// Hostname resolved lazily at request time (service discovery in
    /// orchestrated deployments is asynchronous, so the address may not
    /// exist yet at startup)
    Hostname { name: String, secret: String },
    /// Matches any source
    Wildcard { secret: String },
}

impl ClientSpec {
    fn parse(raw: &str, default_secret: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidClient("empty entry".to_string()));
        }

        if raw == "*" {
            return Ok(ClientSpec::Wildcard {
                secret: default_secret.to_string(),
            });
        }
        if let Some(secret) = raw.strip_prefix("*:") {
            return Ok(ClientSpec::Wildcard {
                secret: secret.to_string(),
            });
        }

        // Whole-entry forms first so bare IPv6 addresses are not split
        // at their own colons.
        if let Ok(network) = raw.parse::<IpNetwork>() {
            return Ok(ClientSpec::Network {
                network,
                secret: default_secret.to_string(),
            });
        }
        if let Ok(addr) = raw.parse::<IpAddr>() {
            return Ok(ClientSpec::Exact {
                addr,
                secret: default_secret.to_string(),
            });
        }

        if let Some((head, secret)) = raw.rsplit_once(':') {
            if !secret.is_empty() {
                if let Ok(network) = head.parse::<IpNetwork>() {
                    return Ok(ClientSpec::Network {
                        network,
                        secret: secret.to_string(),
                    });
                }
                if let Ok(addr) = head.parse::<IpAddr>() {
                    return Ok(ClientSpec::Exact {
                        addr,
                        secret: secret.to_string(),
                    });
                }
                if is_hostname(head) {
                    return Ok(ClientSpec::Hostname {
                        name: head.to_string(),
                        secret: secret.to_string(),
                    });
                }
            }
        }

        if is_hostname(raw) {
            return Ok(ClientSpec::Hostname {
                name: raw.to_string(),
                secret: default_secret.to_string(),
            });
        }

        Err(ConfigError::InvalidClient(raw.to_string()))
    }
}

fn is_hostname(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 253
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Server configuration assembled from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// Bounded pool size; this is also the request concurrency ceiling
    pub db_pool_size: u32,
    /// Per-attempt connect/acquire timeout in seconds
    pub db_connect_timeout: u64,
    /// Total time to wait for the store at boot, in seconds
    pub db_startup_timeout: u64,
    /// Acquisition attempts per request before the request is dropped
    pub db_acquire_retries: u32,

    pub radius_port: u16,
    pub secret: String,
    pub allowed_clients: Vec<ClientSpec>,
    pub allow_local_subnet: bool,

    pub default_vlan: String,
    pub denied_vlan: String,

    pub health_port: u16,
    pub log_level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: format!("cannot parse as {}", std::any::type_name::<T>()),
        }),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value,
                reason: "expected a boolean".to_string(),
            }),
        },
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load and validate configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = env_or("RADIUS_SECRET", "testing123");

        let allowed_clients = env::var("RADIUS_ALLOWED_CLIENTS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| ClientSpec::parse(s, &secret))
            .collect::<Result<Vec<_>, _>>()?;

        let config = Config {
            db_host: env_or("DB_HOST", "db"),
            db_port: env_parse("DB_PORT", 3306)?,
            db_user: env_or("DB_USER", "radiususer"),
            db_password: env_or("DB_PASSWORD", "radiuspass"),
            db_name: env_or("DB_NAME", "radius"),
            db_pool_size: env_parse("DB_POOL_SIZE", 5)?,
            db_connect_timeout: env_parse("DB_CONNECT_TIMEOUT", 10)?,
            db_startup_timeout: env_parse("DB_STARTUP_TIMEOUT", 60)?,
            db_acquire_retries: env_parse("DB_ACQUIRE_RETRIES", 3)?,
            radius_port: env_parse("RADIUS_PORT", 1812)?,
            secret,
            allowed_clients,
            allow_local_subnet: env_bool("RADIUS_ALLOW_LOCAL_SUBNET", true)?,
            default_vlan: env_or("DEFAULT_VLAN", "505"),
            denied_vlan: env_or("DENIED_VLAN", "999"),
            health_port: env_parse("HEALTH_PORT", 8080)?,
            log_level: env_or("LOG_LEVEL", "info"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.radius_port == 0 {
            return Err(ConfigError::Invalid {
                key: "RADIUS_PORT",
                value: "0".to_string(),
                reason: "port cannot be 0".to_string(),
            });
        }
        if self.secret.is_empty() {
            return Err(ConfigError::Invalid {
                key: "RADIUS_SECRET",
                value: String::new(),
                reason: "secret cannot be empty".to_string(),
            });
        }
        if self.db_pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_POOL_SIZE",
                value: "0".to_string(),
                reason: "pool must hold at least one connection".to_string(),
            });
        }
        if self.default_vlan == self.denied_vlan {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_VLAN",
                value: self.default_vlan.clone(),
                reason: "fallback VLAN must differ from the denied sentinel".to_string(),
            });
        }
        Ok(())
    }

    /// Decision-engine view of this configuration
    pub fn policy(&self) -> VlanPolicy {
        VlanPolicy {
            default_vlan: self.default_vlan.clone(),
            denied_vlan: self.denied_vlan.clone(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.db_connect_timeout)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.db_startup_timeout)
    }
}
