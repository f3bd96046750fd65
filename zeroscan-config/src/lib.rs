#![forbid(unsafe_code)]
//! Configuration for connecting to a node's JSON-RPC endpoint.
//!
//! Settings are read from the environment so the scanner can run unattended next to the node.
//! Missing credentials or malformed values are surfaced here, before any scan can start.

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 8332;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RPC_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RPC_RETRY_DELAY_SECS: f64 = 1.0;

/// Default number of blocks per batched collection round.
pub const DEFAULT_BATCH_SIZE: u64 = 1000;
/// Default minimum leading zeros for a transaction id to become a candidate.
pub const DEFAULT_MIN_ZEROS: u32 = 2;
/// Default minimum input count for the special transaction predicate.
pub const DEFAULT_MIN_INPUTS: usize = 1;

pub const ENV_RPC_HOST: &str = "ZEROSCAN_RPC_HOST";
pub const ENV_RPC_PORT: &str = "ZEROSCAN_RPC_PORT";
pub const ENV_RPC_USER: &str = "ZEROSCAN_RPC_USER";
pub const ENV_RPC_PASS: &str = "ZEROSCAN_RPC_PASS";
pub const ENV_RPC_TIMEOUT: &str = "ZEROSCAN_RPC_TIMEOUT";
pub const ENV_RPC_MAX_RETRIES: &str = "ZEROSCAN_RPC_MAX_RETRIES";
pub const ENV_RPC_RETRY_DELAY: &str = "ZEROSCAN_RPC_RETRY_DELAY";

/// Errors raised while assembling an [`RpcConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value {value:?} for {name}. {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for a node's JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct RpcConfig {
    pub rpc_uri: http::Uri,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl RpcConfig {
    /// Reads the configuration from the environment, falling back to the defaults above for
    /// everything but the credentials.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_var(ENV_RPC_HOST).unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());
        let port: u16 = parsed_var(ENV_RPC_PORT, DEFAULT_RPC_PORT)?;
        let user = env_var(ENV_RPC_USER).ok_or(ConfigError::MissingVar(ENV_RPC_USER))?;
        let password = env_var(ENV_RPC_PASS).ok_or(ConfigError::MissingVar(ENV_RPC_PASS))?;
        let timeout_secs: u64 = parsed_var(ENV_RPC_TIMEOUT, DEFAULT_RPC_TIMEOUT_SECS)?;
        let max_retries: u32 = parsed_var(ENV_RPC_MAX_RETRIES, DEFAULT_RPC_MAX_RETRIES)?;
        let retry_delay_secs: f64 = parsed_var(ENV_RPC_RETRY_DELAY, DEFAULT_RPC_RETRY_DELAY_SECS)?;
        if !(retry_delay_secs >= 0.0) {
            return Err(ConfigError::InvalidVar {
                name: ENV_RPC_RETRY_DELAY,
                value: retry_delay_secs.to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        Ok(RpcConfig {
            rpc_uri: construct_rpc_uri(&host, port)?,
            user,
            password,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            retry_delay: Duration::from_secs_f64(retry_delay_secs),
        })
    }
}

/// Builds the endpoint Uri from host and port, accepting hosts with or without a scheme.
pub fn construct_rpc_uri(host: &str, port: u16) -> Result<http::Uri, ConfigError> {
    let endpoint = if host.starts_with("http") {
        format!("{host}:{port}")
    } else {
        format!("http://{host}:{port}")
    };
    endpoint
        .parse::<http::Uri>()
        .map_err(|parse_error| ConfigError::InvalidVar {
            name: ENV_RPC_HOST,
            value: host.to_string(),
            reason: parse_error.to_string(),
        })
}

fn env_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn parsed_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(default),
        Some(value) => match value.parse() {
            Ok(parsed) => Ok(parsed),
            Err(parse_error) => Err(ConfigError::InvalidVar {
                name,
                value,
                reason: parse_error.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test so the process environment is only touched from one place
    #[test]
    fn from_env_requires_credentials_then_reads_overrides() {
        env::remove_var(ENV_RPC_USER);
        env::remove_var(ENV_RPC_PASS);
        assert!(matches!(
            RpcConfig::from_env(),
            Err(ConfigError::MissingVar(_))
        ));

        env::set_var(ENV_RPC_HOST, "node.example.com");
        env::set_var(ENV_RPC_USER, "scanner");
        env::set_var(ENV_RPC_PASS, "hunter2");

        env::set_var(ENV_RPC_PORT, "not-a-port");
        assert!(matches!(
            RpcConfig::from_env(),
            Err(ConfigError::InvalidVar { .. })
        ));

        env::set_var(ENV_RPC_PORT, "18332");
        env::set_var(ENV_RPC_TIMEOUT, "5");
        env::set_var(ENV_RPC_MAX_RETRIES, "7");
        env::set_var(ENV_RPC_RETRY_DELAY, "0.5");
        let config = RpcConfig::from_env().unwrap();
        assert_eq!(config.rpc_uri.host(), Some("node.example.com"));
        assert_eq!(config.rpc_uri.port_u16(), Some(18332));
        assert_eq!(config.rpc_uri.scheme_str(), Some("http"));
        assert_eq!(config.user, "scanner");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn uri_construction_accepts_bare_and_schemed_hosts() {
        let bare = construct_rpc_uri("127.0.0.1", 8332).unwrap();
        assert_eq!(bare.scheme_str(), Some("http"));
        assert_eq!(bare.port_u16(), Some(8332));

        let schemed = construct_rpc_uri("https://node.example.com", 8443).unwrap();
        assert_eq!(schemed.scheme_str(), Some("https"));
        assert_eq!(schemed.port_u16(), Some(8443));
    }
}
