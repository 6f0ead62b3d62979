use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "callcenter130.toml";
pub const ENV_PREFIX: &str = "CALLCENTER_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub database_file: String,
    /// Header carrying the signed-in agent's e-mail, set by the auth proxy.
    pub identity_header: String,
    /// `None` allows any origin.
    pub allowed_origin: Option<String>,
    /// Workbooks named after catalog sheets are loaded from here at startup.
    pub import_dir: Option<PathBuf>,
    pub duplicate_window_secs: u64,
    pub log_filter: String,
    pub seed_catalogs: bool,
    /// Created as ADMINISTRADOR when the agents sheet is empty.
    pub bootstrap_admin_email: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            data_dir: PathBuf::from("data"),
            database_file: "callcenter130.db".to_string(),
            identity_header: "X-Agent-Email".to_string(),
            allowed_origin: None,
            import_dir: None,
            duplicate_window_secs: 120,
            log_filter: "info".to_string(),
            seed_catalogs: true,
            bootstrap_admin_email: None,
        }
    }
}

impl AppConfig {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

pub struct ConfigService;

impl ConfigService {
    /// Defaults, then `callcenter130.toml`, then `CALLCENTER_*` variables.
    pub fn load() -> Result<AppConfig> {
        dotenvy::dotenv().ok();
        Self::extract(Self::figment(Path::new(CONFIG_FILE)))
    }

    pub fn figment(config_path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| AppError::ValidationError(format!("Invalid configuration: {}", e)))?;
        if config.identity_header.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Invalid configuration: identity_header must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config =
            ConfigService::extract(Figment::from(Serialized::defaults(AppConfig::default())))
                .unwrap();
        assert_eq!(config.port, 3001);
        assert_eq!(config.identity_header, "X-Agent-Email");
        assert_eq!(config.database_path(), PathBuf::from("data").join("callcenter130.db"));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(
            Toml::string(
                r#"
                port = 8080
                allowed_origin = "https://callcenter130.example"
                duplicate_window_secs = 30
                "#,
            ),
        );
        let config = ConfigService::extract(figment).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origin.as_deref(),
            Some("https://callcenter130.example")
        );
        assert_eq!(config.duplicate_window_secs, 30);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_rejects_empty_identity_header() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(r#"identity_header = " ""#));
        assert!(ConfigService::extract(figment).is_err());
    }

    #[test]
    fn test_rejects_bad_types() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(r#"port = "abc""#));
        assert!(matches!(
            ConfigService::extract(figment),
            Err(AppError::ValidationError(_))
        ));
    }
}
