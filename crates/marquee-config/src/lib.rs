// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_max_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://marquee.db".to_string(),
            pool_max_size: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6969,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}

/// Intervals are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub max_concurrent_commands: usize,
    pub refresh_collections_interval: u64,
    pub import_list_sync_interval: u64,
    pub backup_interval: u64,
    pub housekeeping_interval: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_commands: 3,
            refresh_collections_interval: 24 * 60 * 60,
            import_list_sync_interval: 6 * 60 * 60,
            backup_interval: 7 * 24 * 60 * 60,
            housekeeping_interval: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub base_url: String,
    /// ISO 639-1 code sent with every metadata request.
    pub movie_info_language: String,
    pub max_concurrent_requests: usize,
    /// How long lookups are served from memory before asking the server again.
    pub cache_ttl_seconds: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.whisparr.com/v3".to_string(),
            movie_info_language: "en".to_string(),
            max_concurrent_requests: 2,
            cache_ttl_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub folder: PathBuf,
    pub retention_days: i64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("Backups"),
            retention_days: 28,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub app_data: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            app_data: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
    pub auth: AuthConfig,
    pub metadata: MetadataConfig,
    pub backup: BackupConfig,
    pub paths: PathsConfig,
}

impl AppConfig {
    /// Backup folder, resolved against the app data folder when relative.
    pub fn backup_folder(&self) -> PathBuf {
        if self.backup.folder.is_absolute() {
            self.backup.folder.clone()
        } else {
            self.paths.app_data.join(&self.backup.folder)
        }
    }
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: MARQUEE_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let config: AppConfig = figment(config_path).extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}

fn figment(config_path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment.merge(Env::prefixed("MARQUEE_").split("__"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.http.port, 6969);
        assert!(config.auth.api_key.is_none());
        assert_eq!(config.backup.retention_days, 28);
        assert_eq!(config.scheduler.max_concurrent_commands, 3);
    }

    #[test]
    fn toml_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "marquee.toml",
                r#"
                [http]
                port = 7878

                [metadata]
                movie_info_language = "de"
                "#,
            )?;
            jail.set_env("MARQUEE_AUTH__API_KEY", "secret");
            jail.set_env("MARQUEE_SCHEDULER__BACKUP_INTERVAL", "60");

            let config: AppConfig = figment(Some(Path::new("marquee.toml"))).extract()?;
            assert_eq!(config.http.port, 7878);
            assert_eq!(config.metadata.movie_info_language, "de");
            assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
            assert_eq!(config.scheduler.backup_interval, 60);
            assert_eq!(config.http.host, "127.0.0.1");
            Ok(())
        });
    }

    #[test]
    fn relative_backup_folder_resolves_against_app_data() {
        let mut config = AppConfig::default();
        config.paths.app_data = PathBuf::from("/var/lib/marquee");
        assert_eq!(
            config.backup_folder(),
            PathBuf::from("/var/lib/marquee/Backups")
        );

        config.backup.folder = PathBuf::from("/mnt/backups");
        assert_eq!(config.backup_folder(), PathBuf::from("/mnt/backups"));
    }
}
