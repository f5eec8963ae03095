// SPDX-License-Identifier: GPL-3.0-or-later
//! qBittorrent download client. Testing logs in and reads the app version.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use super::{
    require_text, DownloadClientExtra, FieldType, Provider, ProviderDefinition, ProviderError,
    ProviderField, ProviderKind, ValidationFailure,
};

#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("authentication failed")]
    Authentication,
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("download client responded with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("unsupported client version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QBittorrentSettings {
    pub host: String,
    pub port: u16,
    pub use_ssl: bool,
    pub url_base: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub movie_category: String,
}

impl Default for QBittorrentSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            use_ssl: false,
            url_base: None,
            username: None,
            password: None,
            movie_category: "marquee".to_string(),
        }
    }
}

impl QBittorrentSettings {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let url_base = self
            .url_base
            .as_deref()
            .map(|b| b.trim_matches('/'))
            .filter(|b| !b.is_empty())
            .map(|b| format!("/{b}"))
            .unwrap_or_default();
        format!("{scheme}://{}:{}{url_base}", self.host.trim(), self.port)
    }

    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        require_text(&mut failures, "host", &self.host, "host is required");
        if self.host.contains('/') || self.host.contains(':') {
            failures.push(ValidationFailure::new("host", "must be a host name without scheme or port"));
        }
        if self.port == 0 {
            failures.push(ValidationFailure::new("port", "must be between 1 and 65535"));
        }
        if self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().map_or(true, str::is_empty)
        {
            failures.push(ValidationFailure::new("password", "password is required with a username"));
        }
        failures
    }
}

pub struct QBittorrentClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl QBittorrentClient {
    pub fn new(
        base_url: String,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self, DownloadClientError> {
        // qBittorrent keeps the session in a SID cookie.
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    pub fn from_settings(settings: &QBittorrentSettings) -> Result<Self, DownloadClientError> {
        Self::new(
            settings.base_url(),
            settings.username.clone().filter(|u| !u.is_empty()),
            settings.password.clone(),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadClientError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|err| DownloadClientError::InvalidBaseUrl(err.to_string()))
    }

    async fn authenticate_if_configured(&self) -> Result<(), DownloadClientError> {
        let (Some(username), Some(password)) = (self.username.as_deref(), self.password.as_deref()) else {
            return Ok(());
        };

        let url = self.endpoint("/api/v2/auth/login")?;
        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(DownloadClientError::Authentication);
        }
        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim() != "Ok." {
            return Err(DownloadClientError::Authentication);
        }
        Ok(())
    }

    /// Web API version, e.g. `2.8.3`.
    pub async fn api_version(&self) -> Result<String, DownloadClientError> {
        self.authenticate_if_configured().await?;
        let url = self.endpoint("/api/v2/app/webapiVersion")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DownloadClientError::Request(e.to_string()))?;
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(DownloadClientError::Authentication);
        }
        if !status.is_success() {
            return Err(DownloadClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body.trim().to_string())
    }

    pub async fn test_connection(&self) -> Result<(), DownloadClientError> {
        let version = self.api_version().await?;
        let major = version
            .split('.')
            .next()
            .and_then(|m| m.parse::<u32>().ok())
            .ok_or_else(|| DownloadClientError::UnsupportedVersion(version.clone()))?;
        // Web API 2.x ships with qBittorrent 4.1 and later.
        if major < 2 {
            return Err(DownloadClientError::UnsupportedVersion(version));
        }
        debug!(target: "application", %version, "qbittorrent reachable");
        Ok(())
    }
}

pub struct QBittorrent;

impl QBittorrent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for QBittorrent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for QBittorrent {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DownloadClient
    }

    fn implementation(&self) -> &'static str {
        "QBittorrent"
    }

    fn implementation_name(&self) -> &'static str {
        "qBittorrent"
    }

    fn config_contract(&self) -> &'static str {
        "QBittorrentSettings"
    }

    fn protocol(&self) -> Option<&'static str> {
        Some("torrent")
    }

    fn default_settings(&self) -> Value {
        serde_json::to_value(QBittorrentSettings::default()).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        let defaults = QBittorrentSettings::default();
        vec![
            ProviderField::new("host", "Host", FieldType::Textbox, json!(defaults.host)),
            ProviderField::new("port", "Port", FieldType::Number, json!(defaults.port)),
            ProviderField::new("useSsl", "Use SSL", FieldType::Checkbox, json!(false)),
            ProviderField::new("urlBase", "URL Base", FieldType::Textbox, json!(""))
                .help("Adds a prefix to the qBittorrent url")
                .advanced(),
            ProviderField::new("username", "Username", FieldType::Textbox, json!("")),
            ProviderField::new("password", "Password", FieldType::Password, json!("")),
            ProviderField::new("movieCategory", "Category", FieldType::Textbox, json!(defaults.movie_category)),
        ]
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        let mut failures = match definition.settings::<QBittorrentSettings>() {
            Ok(settings) => settings.validate(),
            Err(failure) => vec![failure],
        };
        match definition.extra::<DownloadClientExtra>() {
            Ok(extra) if !(1..=50).contains(&extra.priority) => {
                failures.push(ValidationFailure::new("priority", "must be between 1 and 50"));
            }
            Ok(_) => {}
            Err(failure) => failures.push(failure),
        }
        failures
    }

    async fn test(&self, definition: &ProviderDefinition) -> Result<(), ProviderError> {
        let failures = self.validate(definition);
        if !failures.is_empty() {
            return Err(ProviderError::Validation(failures));
        }
        let settings: QBittorrentSettings = definition
            .settings()
            .map_err(|f| ProviderError::Validation(vec![f]))?;
        QBittorrentClient::from_settings(&settings)?
            .test_connection()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_includes_scheme_port_and_url_base() {
        let settings = QBittorrentSettings {
            host: "seedbox".into(),
            port: 443,
            use_ssl: true,
            url_base: Some("/qbt/".into()),
            ..QBittorrentSettings::default()
        };
        assert_eq!(settings.base_url(), "https://seedbox:443/qbt");
        assert_eq!(QBittorrentSettings::default().base_url(), "http://localhost:8080");
    }

    #[test]
    fn validation_rejects_bad_host_and_missing_password() {
        let mut definition = ProviderDefinition::new(ProviderKind::DownloadClient, "qbt", "QBittorrent");
        definition.settings = json!({ "host": "http://box", "username": "admin" });
        let fields: Vec<_> = QBittorrent::new()
            .validate(&definition)
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(fields, vec!["host", "password"]);
    }

    #[tokio::test]
    async fn test_connection_logs_in_then_reads_version() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/login"))
            .and(body_string_contains("username=admin"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ok."))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v2/app/webapiVersion"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2.8.3"))
            .mount(&server)
            .await;

        let client = QBittorrentClient::new(server.uri(), Some("admin".into()), Some("pw".into())).unwrap();
        client.test_connection().await.expect("connection should succeed");
    }

    #[tokio::test]
    async fn rejected_login_is_an_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Fails."))
            .mount(&server)
            .await;

        let client = QBittorrentClient::new(server.uri(), Some("admin".into()), Some("bad".into())).unwrap();
        assert!(matches!(
            client.test_connection().await,
            Err(DownloadClientError::Authentication)
        ));
    }

    #[tokio::test]
    async fn old_web_api_is_unsupported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v2/app/webapiVersion"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1.9"))
            .mount(&server)
            .await;

        let client = QBittorrentClient::new(server.uri(), None, None).unwrap();
        assert!(matches!(
            client.test_connection().await,
            Err(DownloadClientError::UnsupportedVersion(_))
        ));
    }
}
