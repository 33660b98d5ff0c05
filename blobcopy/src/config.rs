//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `BLOBCOPY_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `BLOBCOPY_` override YAML values
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `BLOBCOPY_STORAGE__API_VERSION=2023-11-03` sets the `storage.api_version` field.
//!
//! ## Example
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 7071
//! enable_metrics: true
//! storage:
//!   # Point at a local Azurite emulator instead of the public cloud
//!   blob_endpoint: "http://127.0.0.1:10000/{account}"
//!   request_timeout: 30s
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::Error;

/// Placeholder substituted with the destination account name in [`StorageConfig::blob_endpoint`].
pub const ACCOUNT_PLACEHOLDER: &str = "{account}";

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "BLOBCOPY_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable Prometheus metrics endpoint at `/internal/metrics`
    pub enable_metrics: bool,
    /// Serve the OpenAPI document at `/openapi.json` and its UI at `/docs`
    pub enable_docs: bool,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// Outbound blob storage settings
    pub storage: StorageConfig,
    /// Inbound request limits
    pub limits: LimitsConfig,
}

/// Settings for talking to the blob service of the destination account.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Blob service endpoint template. `{account}` is replaced with the destination
    /// account name, so both host-style (`https://{account}.blob.core.windows.net`) and
    /// path-style (`http://127.0.0.1:10000/{account}`, Azurite) endpoints work.
    pub blob_endpoint: String,
    /// Value sent in the `x-ms-version` header
    pub api_version: String,
    /// Overall timeout for a copy request. Unset means the HTTP client default.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<Duration>,
    /// Timeout for establishing the connection to the blob endpoint. Unset means the HTTP
    /// client default.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<Duration>,
}

/// Request limits configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum accepted size of a copy request body, in bytes
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7071,
            enable_metrics: false,
            enable_docs: true,
            enable_otel_export: false,
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_endpoint: "https://{account}.blob.core.windows.net".to_string(),
            api_version: "2021-08-06".to_string(),
            request_timeout: None,
            connect_timeout: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024, // 64 KiB
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        let endpoint = &self.storage.blob_endpoint;
        if !endpoint.contains(ACCOUNT_PLACEHOLDER) {
            return Err(Error::Internal {
                operation: format!(
                    "Config validation: storage.blob_endpoint ({endpoint}) must contain the {ACCOUNT_PLACEHOLDER} placeholder"
                ),
            });
        }

        // Substitute a representative account name so the template itself can be checked
        match Url::parse(&endpoint.replace(ACCOUNT_PLACEHOLDER, "account")) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(Error::Internal {
                    operation: format!(
                        "Config validation: storage.blob_endpoint must use http or https, got '{}'",
                        url.scheme()
                    ),
                });
            }
            Err(e) => {
                return Err(Error::Internal {
                    operation: format!("Config validation: storage.blob_endpoint ({endpoint}) is not a valid URL: {e}"),
                });
            }
        }

        if self.storage.api_version.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: storage.api_version cannot be empty".to_string(),
            });
        }

        if self.limits.max_body_bytes == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_body_bytes cannot be 0".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("BLOBCOPY_").split("__"))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        Jail::expect_with(|_jail| {
            let config = Config::load(&args("does-not-exist.yaml"))?;

            assert_eq!(config.port, 7071);
            assert_eq!(config.storage.blob_endpoint, "https://{account}.blob.core.windows.net");
            assert_eq!(config.storage.api_version, "2021-08-06");
            assert!(config.storage.request_timeout.is_none());
            assert!(config.storage.connect_timeout.is_none());
            assert!(!config.enable_metrics);

            Ok(())
        });
    }

    #[test]
    fn test_storage_config_from_yaml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
storage:
  blob_endpoint: "http://127.0.0.1:10000/{account}"
  request_timeout: 30s
  connect_timeout: 2s
limits:
  max_body_bytes: 1024
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.storage.blob_endpoint, "http://127.0.0.1:10000/{account}");
            assert_eq!(config.storage.request_timeout, Some(Duration::from_secs(30)));
            assert_eq!(config.storage.connect_timeout, Some(Duration::from_secs(2)));
            assert_eq!(config.storage.api_version, "2021-08-06"); // still default
            assert_eq!(config.limits.max_body_bytes, 1024);

            Ok(())
        });
    }

    #[test]
    fn test_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
port: 9000
enable_docs: false
"#,
            )?;

            jail.set_env("BLOBCOPY_HOST", "127.0.0.1");
            jail.set_env("BLOBCOPY_PORT", "8080");
            jail.set_env("BLOBCOPY_STORAGE__API_VERSION", "2023-11-03");

            let config = Config::load(&args("test.yaml"))?;

            // Env vars should override
            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.port, 8080);
            assert_eq!(config.storage.api_version, "2023-11-03");

            // YAML values should be preserved
            assert!(!config.enable_docs);

            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("test.yaml", "storage:\n  endpoint: http://localhost\n")?;

            assert!(Config::load(&args("test.yaml")).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_config_validation_missing_placeholder() {
        let mut config = Config::default();
        config.storage.blob_endpoint = "https://myaccount.blob.core.windows.net".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("{account}"));
    }

    #[test]
    fn test_config_validation_rejects_non_http_endpoint() {
        let mut config = Config::default();
        config.storage.blob_endpoint = "ftp://{account}.example.com".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("http or https"));
    }

    #[test]
    fn test_config_validation_zero_body_limit() {
        let mut config = Config::default();
        config.limits.max_body_bytes = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("max_body_bytes"));
    }

    #[test]
    fn test_config_validation_valid_config() {
        assert!(Config::default().validate().is_ok());
    }
}
