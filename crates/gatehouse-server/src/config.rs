use std::collections::BTreeMap;
use std::net::SocketAddr;

use gatehouse_auth::config::AuthConfig;
use gatehouse_auth::provider::ProviderRegistry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Authentication subsystem configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Per-provider OAuth2 credentials, keyed by provider name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Credentials must target a known provider; a typo here would
        // otherwise silently leave the provider unconfigured
        let known = ProviderRegistry::with_defaults();
        for name in self.providers.keys() {
            if known.get(name).is_err() {
                return Err(format!("providers.{name} is not a known provider"));
            }
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Builds the provider registry: built-in endpoint defaults with the
    /// configured credentials merged in by name.
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_defaults();
        for (name, settings) in &self.providers {
            if let Ok(provider) = registry.get(name).cloned() {
                registry.register(
                    provider.with_credentials(&settings.client_id, &settings.client_secret),
                );
            }
        }
        registry
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// OAuth2 client credentials for one provider.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("gatehouse.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., GATEHOUSE__SERVER__PORT=9090
        // or GATEHOUSE__PROVIDERS__GITHUB__CLIENT_ID=...
        builder = builder.add_source(
            Environment::with_prefix("GATEHOUSE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn with_secret(mut cfg: AppConfig) -> AppConfig {
        cfg.auth.token.secret = "0123456789abcdef0123456789abcdef".to_string();
        cfg
    }

    #[test]
    fn test_default_addr() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut cfg = with_secret(AppConfig::default());
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().contains("server.port"));
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let mut cfg = with_secret(AppConfig::default());
        cfg.logging.level = "loud".to_string();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut cfg = with_secret(AppConfig::default());
        cfg.providers
            .insert("gitlab".to_string(), ProviderSettings::default());
        assert!(cfg.validate().unwrap_err().contains("providers.gitlab"));
    }

    #[test]
    fn test_validate_surfaces_auth_errors() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().unwrap_err().contains("auth config error"));
    }

    #[test]
    fn test_registry_merges_credentials() {
        let mut cfg = AppConfig::default();
        cfg.providers.insert(
            "github".to_string(),
            ProviderSettings {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        );

        let registry = cfg.registry();
        assert_eq!(registry.len(), 3);
        let configured = registry.list_configured();
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].name, "github");
        // Endpoint defaults survive the merge
        assert_eq!(
            configured[0].authorize_url,
            "https://github.com/login/oauth/authorize"
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let toml = r#"
            [server]
            port = 9090

            [logging]
            level = "debug"

            [auth.token]
            secret = "0123456789abcdef0123456789abcdef"
            ttl = "2h"

            [providers.github]
            client_id = "id"
            client_secret = "secret"
        "#;

        let cfg: AppConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.auth.token.ttl, std::time::Duration::from_secs(7200));
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.registry().list_configured().len(), 1);
    }
}
