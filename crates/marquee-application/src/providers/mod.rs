// SPDX-License-Identifier: GPL-3.0-or-later
//! Provider framework shared by indexers, metadata consumers, import lists and
//! download clients: definitions, schema templates, validation, tests and bulk edits.

pub mod bulk;
pub mod download_clients;
pub mod import_lists;
pub mod indexers;
pub mod metadata;

use std::sync::Arc;

use marquee_domain::{MinimumAvailability, ProfileId, ProviderId, TagId};
use marquee_infrastructure::repositories::{ProviderRecord, ProviderRepository};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use bulk::{ApplyTags, ProviderBulkUpdate};
pub use download_clients::{DownloadClientError, QBittorrent, QBittorrentClient};
pub use import_lists::{StashDbStudio, TmdbCollection};
pub use indexers::{IndexerCapabilities, IndexerCategory, IndexerError, Newznab, Torznab};
pub use metadata::{Emby, Kodi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Indexer,
    Metadata,
    ImportList,
    DownloadClient,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        Self::Indexer,
        Self::Metadata,
        Self::ImportList,
        Self::DownloadClient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexer => "indexer",
            Self::Metadata => "metadata",
            Self::ImportList => "importlist",
            Self::DownloadClient => "downloadclient",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Kind-specific fields
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexerExtra {
    pub enable_rss: bool,
    pub enable_automatic_search: bool,
    pub enable_interactive_search: bool,
    pub priority: i32,
    pub protocol: String,
}

impl Default for IndexerExtra {
    fn default() -> Self {
        Self {
            enable_rss: true,
            enable_automatic_search: true,
            enable_interactive_search: true,
            priority: 25,
            protocol: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportListExtra {
    pub enabled: bool,
    pub enable_auto: bool,
    pub root_folder_path: Option<String>,
    pub quality_profile_id: Option<ProfileId>,
    pub monitor: String,
    pub search_on_add: bool,
    pub minimum_availability: MinimumAvailability,
}

impl Default for ImportListExtra {
    fn default() -> Self {
        Self {
            enabled: true,
            enable_auto: false,
            root_folder_path: None,
            quality_profile_id: None,
            monitor: "movieOnly".to_string(),
            search_on_add: false,
            minimum_availability: MinimumAvailability::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadClientExtra {
    pub priority: i32,
    pub protocol: String,
    pub remove_completed_downloads: bool,
}

impl Default for DownloadClientExtra {
    fn default() -> Self {
        Self {
            priority: 1,
            protocol: String::new(),
            remove_completed_downloads: true,
        }
    }
}

// ============================================================================
// Definitions & templates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDefinition {
    #[serde(default)]
    pub id: ProviderId,
    pub kind: ProviderKind,
    pub name: String,
    pub implementation: String,
    #[serde(default)]
    pub config_contract: String,
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub extra: Value,
}

fn default_true() -> bool {
    true
}

impl ProviderDefinition {
    pub fn new(kind: ProviderKind, name: impl Into<String>, implementation: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new(),
            kind,
            name: name.into(),
            implementation: implementation.into(),
            config_contract: String::new(),
            enable: true,
            tags: Vec::new(),
            settings: json!({}),
            extra: json!({}),
        }
    }

    /// Typed view of `settings`; missing keys take the type's defaults.
    pub fn settings<T: DeserializeOwned>(&self) -> Result<T, ValidationFailure> {
        decode(&self.settings, "settings")
    }

    pub fn extra<T: DeserializeOwned>(&self) -> Result<T, ValidationFailure> {
        decode(&self.extra, "extra")
    }

    fn from_record(record: ProviderRecord) -> Option<Self> {
        let kind = ProviderKind::parse(&record.kind)?;
        Some(Self {
            id: record.id,
            kind,
            name: record.name,
            implementation: record.implementation,
            config_contract: record.config_contract,
            enable: record.enable,
            tags: record.tags,
            settings: record.settings,
            extra: record.extra,
        })
    }

    fn into_record(self) -> ProviderRecord {
        ProviderRecord {
            id: self.id,
            kind: self.kind.as_str().to_string(),
            name: self.name,
            implementation: self.implementation,
            config_contract: self.config_contract,
            enable: self.enable,
            tags: self.tags,
            settings: self.settings,
            extra: self.extra,
        }
    }
}

fn decode<T: DeserializeOwned>(value: &Value, field: &str) -> Result<T, ValidationFailure> {
    let value = match value {
        Value::Null => json!({}),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| ValidationFailure::new(field, e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Textbox,
    Password,
    Number,
    Checkbox,
    Url,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub advanced: bool,
}

impl ProviderField {
    pub fn new(name: &str, label: &str, field_type: FieldType, value: Value) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            field_type,
            value,
            help_text: None,
            advanced: false,
        }
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help_text = Some(text.to_string());
        self
    }

    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }
}

/// Schema entry offered to clients creating a new definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTemplate {
    pub kind: ProviderKind,
    pub implementation: String,
    pub implementation_name: String,
    pub config_contract: String,
    pub settings: Value,
    pub extra: Value,
    pub fields: Vec<ProviderField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTestResult {
    pub id: ProviderId,
    pub is_valid: bool,
    pub validation_failures: Vec<ValidationFailure>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ProviderKind, id: ProviderId },
    #[error("unknown {kind} implementation: {implementation}")]
    UnknownImplementation { kind: ProviderKind, implementation: String },
    #[error("a {kind} named '{name}' already exists")]
    DuplicateName { kind: ProviderKind, name: String },
    #[error("validation failed: {}", join_failures(.0))]
    Validation(Vec<ValidationFailure>),
    #[error("test failed: {0}")]
    TestFailed(String),
    #[error(transparent)]
    Indexer(#[from] IndexerError),
    #[error(transparent)]
    DownloadClient(#[from] DownloadClientError),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

fn join_failures(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ProviderError {
    pub fn failures(&self) -> Vec<ValidationFailure> {
        match self {
            Self::Validation(failures) => failures.clone(),
            other => vec![ValidationFailure::new("", other.to_string())],
        }
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// One implementation of a provider kind.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;
    fn implementation(&self) -> &'static str;
    fn implementation_name(&self) -> &'static str;
    fn config_contract(&self) -> &'static str;

    /// Transfer protocol for indexers and download clients.
    fn protocol(&self) -> Option<&'static str> {
        None
    }

    fn default_settings(&self) -> Value;
    fn fields(&self) -> Vec<ProviderField>;

    /// Settings (and kind fields) this implementation rejects.
    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure>;

    /// Contacts the remote side when there is one. The default only validates.
    async fn test(&self, definition: &ProviderDefinition) -> Result<(), ProviderError> {
        let failures = self.validate(definition);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ProviderError::Validation(failures))
        }
    }

    fn template(&self) -> ProviderTemplate {
        let mut extra = default_extra(self.kind());
        if let (Some(protocol), Value::Object(map)) = (self.protocol(), &mut extra) {
            map.insert("protocol".to_string(), json!(protocol));
        }
        ProviderTemplate {
            kind: self.kind(),
            implementation: self.implementation().to_string(),
            implementation_name: self.implementation_name().to_string(),
            config_contract: self.config_contract().to_string(),
            settings: self.default_settings(),
            extra,
            fields: self.fields(),
        }
    }
}

fn default_extra(kind: ProviderKind) -> Value {
    let value = match kind {
        ProviderKind::Indexer => serde_json::to_value(IndexerExtra::default()),
        ProviderKind::ImportList => serde_json::to_value(ImportListExtra::default()),
        ProviderKind::DownloadClient => serde_json::to_value(DownloadClientExtra::default()),
        ProviderKind::Metadata => Ok(json!({})),
    };
    value.unwrap_or_else(|_| json!({}))
}

pub(crate) fn require_text(
    failures: &mut Vec<ValidationFailure>,
    field: &str,
    value: &str,
    message: &str,
) {
    if value.trim().is_empty() {
        failures.push(ValidationFailure::new(field, message));
    }
}

pub(crate) fn require_http_url(failures: &mut Vec<ValidationFailure>, field: &str, value: &str) {
    match reqwest::Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => failures.push(ValidationFailure::new(field, "must be a valid http(s) url")),
    }
}

/// Every implementation shipped with the application.
pub fn default_providers(client: Client) -> Vec<Arc<dyn Provider>> {
    vec![
        Arc::new(Newznab::new(client.clone())),
        Arc::new(Torznab::new(client.clone())),
        Arc::new(QBittorrent::new()),
        Arc::new(Kodi),
        Arc::new(Emby),
        Arc::new(TmdbCollection),
        Arc::new(StashDbStudio),
    ]
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct ProviderService {
    repository: Arc<dyn ProviderRepository>,
    providers: Arc<Vec<Arc<dyn Provider>>>,
}

impl ProviderService {
    pub fn new(repository: Arc<dyn ProviderRepository>, providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            repository,
            providers: Arc::new(providers),
        }
    }

    fn provider(&self, kind: ProviderKind, implementation: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind && p.implementation().eq_ignore_ascii_case(implementation))
            .cloned()
            .ok_or_else(|| ProviderError::UnknownImplementation {
                kind,
                implementation: implementation.to_string(),
            })
    }

    pub fn schema(&self, kind: ProviderKind) -> Vec<ProviderTemplate> {
        self.providers
            .iter()
            .filter(|p| p.kind() == kind)
            .map(|p| p.template())
            .collect()
    }

    pub async fn list(&self, kind: ProviderKind) -> Result<Vec<ProviderDefinition>, ProviderError> {
        let records = self.repository.list(kind.as_str()).await?;
        Ok(records.into_iter().filter_map(ProviderDefinition::from_record).collect())
    }

    pub async fn get(&self, kind: ProviderKind, id: ProviderId) -> Result<ProviderDefinition, ProviderError> {
        self.repository
            .get(kind.as_str(), id)
            .await?
            .and_then(ProviderDefinition::from_record)
            .ok_or(ProviderError::NotFound { kind, id })
    }

    /// Checks name, implementation and settings and fills the derived columns.
    async fn prepare(
        &self,
        kind: ProviderKind,
        mut definition: ProviderDefinition,
    ) -> Result<(ProviderDefinition, Arc<dyn Provider>), ProviderError> {
        definition.kind = kind;
        let provider = self.provider(kind, &definition.implementation)?;
        definition.implementation = provider.implementation().to_string();
        definition.config_contract = provider.config_contract().to_string();
        definition.name = definition.name.trim().to_string();
        if definition.settings.is_null() {
            definition.settings = provider.default_settings();
        }
        normalize_extra(&mut definition, provider.as_ref())?;

        let mut failures = Vec::new();
        require_text(&mut failures, "name", &definition.name, "name cannot be empty");
        failures.extend(provider.validate(&definition));
        if !failures.is_empty() {
            return Err(ProviderError::Validation(failures));
        }

        if let Some(existing) = self.repository.get_by_name(kind.as_str(), &definition.name).await? {
            if existing.id != definition.id {
                return Err(ProviderError::DuplicateName {
                    kind,
                    name: definition.name,
                });
            }
        }
        Ok((definition, provider))
    }

    #[instrument(skip(self, definition), fields(name = %definition.name))]
    pub async fn create(
        &self,
        kind: ProviderKind,
        mut definition: ProviderDefinition,
    ) -> Result<ProviderDefinition, ProviderError> {
        definition.id = ProviderId::new();
        let (definition, _) = self.prepare(kind, definition).await?;
        let record = self.repository.create(definition.into_record()).await?;
        info!(target: "application", %kind, id = %record.id, "provider created");
        ProviderDefinition::from_record(record).ok_or_else(|| anyhow::anyhow!("stored provider has an unknown kind").into())
    }

    pub async fn update(
        &self,
        kind: ProviderKind,
        definition: ProviderDefinition,
    ) -> Result<ProviderDefinition, ProviderError> {
        self.get(kind, definition.id).await?;
        let (definition, _) = self.prepare(kind, definition).await?;
        let record = self.repository.update(definition.into_record()).await?;
        info!(target: "application", %kind, id = %record.id, "provider updated");
        ProviderDefinition::from_record(record).ok_or_else(|| anyhow::anyhow!("stored provider has an unknown kind").into())
    }

    pub async fn delete(&self, kind: ProviderKind, id: ProviderId) -> Result<(), ProviderError> {
        let deleted = self.repository.delete_many(kind.as_str(), &[id]).await?;
        if deleted == 0 {
            return Err(ProviderError::NotFound { kind, id });
        }
        info!(target: "application", %kind, %id, "provider deleted");
        Ok(())
    }

    /// Validates an unsaved definition and contacts the remote side.
    pub async fn test(&self, kind: ProviderKind, definition: ProviderDefinition) -> Result<(), ProviderError> {
        let (definition, provider) = self.prepare(kind, definition).await?;
        provider.test(&definition).await
    }

    /// Tests every enabled definition of a kind.
    pub async fn test_all(&self, kind: ProviderKind) -> Result<Vec<ProviderTestResult>, ProviderError> {
        let mut results = Vec::new();
        for definition in self.list(kind).await?.into_iter().filter(|d| d.enable) {
            let id = definition.id;
            let outcome = match self.provider(kind, &definition.implementation) {
                Ok(provider) => provider.test(&definition).await,
                Err(error) => Err(error),
            };
            let validation_failures = match outcome {
                Ok(()) => Vec::new(),
                Err(error) => {
                    warn!(target: "application", %kind, %id, %error, "provider test failed");
                    error.failures()
                }
            };
            results.push(ProviderTestResult {
                id,
                is_valid: validation_failures.is_empty(),
                validation_failures,
            });
        }
        Ok(results)
    }

    /// Applies the provided bulk fields to each listed definition; no body updates nothing.
    pub async fn bulk_update(
        &self,
        kind: ProviderKind,
        update: Option<ProviderBulkUpdate>,
    ) -> Result<Vec<ProviderDefinition>, ProviderError> {
        let Some(update) = update else {
            return Ok(Vec::new());
        };
        let records = self.repository.get_many(kind.as_str(), &update.ids).await?;
        let mut updated = Vec::with_capacity(records.len());
        for record in records {
            let Some(mut definition) = ProviderDefinition::from_record(record) else {
                continue;
            };
            bulk::apply(kind, &update, &mut definition)?;
            let record = self.repository.update(definition.into_record()).await?;
            if let Some(definition) = ProviderDefinition::from_record(record) {
                updated.push(definition);
            }
        }
        debug!(target: "application", %kind, count = updated.len(), "bulk updated providers");
        Ok(updated)
    }

    pub async fn bulk_delete(&self, kind: ProviderKind, ids: &[ProviderId]) -> Result<u64, ProviderError> {
        let deleted = self.repository.delete_many(kind.as_str(), ids).await?;
        info!(target: "application", %kind, deleted, "bulk deleted providers");
        Ok(deleted)
    }
}

/// Re-encodes `extra` through the kind's typed shape so unknown keys drop out
/// and missing ones take their defaults.
fn normalize_extra(definition: &mut ProviderDefinition, provider: &dyn Provider) -> Result<(), ProviderError> {
    let protocol = provider.protocol().unwrap_or_default().to_string();
    let encoded = match definition.kind {
        ProviderKind::Indexer => {
            let mut extra: IndexerExtra = definition.extra().map_err(|f| ProviderError::Validation(vec![f]))?;
            extra.protocol = protocol;
            serde_json::to_value(extra)
        }
        ProviderKind::ImportList => {
            let extra: ImportListExtra = definition.extra().map_err(|f| ProviderError::Validation(vec![f]))?;
            definition.enable = extra.enabled;
            serde_json::to_value(extra)
        }
        ProviderKind::DownloadClient => {
            let mut extra: DownloadClientExtra =
                definition.extra().map_err(|f| ProviderError::Validation(vec![f]))?;
            extra.protocol = protocol;
            serde_json::to_value(extra)
        }
        ProviderKind::Metadata => Ok(json!({})),
    };
    definition.extra = encoded.map_err(anyhow::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_pool;
    use marquee_infrastructure::sqlite_adapters::SqliteProviderRepository;

    async fn service() -> ProviderService {
        let pool = setup_pool().await;
        ProviderService::new(
            Arc::new(SqliteProviderRepository::new(pool)),
            default_providers(Client::new()),
        )
    }

    fn kodi(name: &str) -> ProviderDefinition {
        ProviderDefinition::new(ProviderKind::Metadata, name, "Kodi")
    }

    fn newznab(name: &str) -> ProviderDefinition {
        let mut definition = ProviderDefinition::new(ProviderKind::Indexer, name, "newznab");
        definition.settings = json!({ "baseUrl": "https://indexer.example", "apiKey": "k" });
        definition
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!(ProviderKind::parse("ImportList"), Some(ProviderKind::ImportList));
        assert_eq!(ProviderKind::parse("downloadclient"), Some(ProviderKind::DownloadClient));
        assert_eq!(ProviderKind::parse("notification"), None);
    }

    #[tokio::test]
    async fn schema_lists_implementations_per_kind() {
        let service = service().await;
        let indexers: Vec<_> = service
            .schema(ProviderKind::Indexer)
            .into_iter()
            .map(|t| t.implementation)
            .collect();
        assert_eq!(indexers, vec!["Newznab", "Torznab"]);

        let torznab = &service.schema(ProviderKind::Indexer)[1];
        assert_eq!(torznab.extra["protocol"], "torrent");
        assert_eq!(torznab.config_contract, "TorznabSettings");
    }

    #[tokio::test]
    async fn create_normalizes_and_rejects_duplicates() {
        let service = service().await;
        let created = service.create(ProviderKind::Indexer, newznab("Usenet")).await.unwrap();
        assert_eq!(created.implementation, "Newznab");
        assert_eq!(created.config_contract, "NewznabSettings");
        assert_eq!(created.extra["protocol"], "usenet");
        assert_eq!(created.extra["priority"], 25);

        let err = service.create(ProviderKind::Indexer, newznab("usenet")).await.unwrap_err();
        assert!(matches!(err, ProviderError::DuplicateName { .. }));

        // Same name under another kind is fine.
        service.create(ProviderKind::Metadata, kodi("Usenet")).await.unwrap();
    }

    #[tokio::test]
    async fn create_validates_name_implementation_and_settings() {
        let service = service().await;
        let err = service.create(ProviderKind::Metadata, kodi("  ")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(ref f) if f[0].field == "name"));

        let err = service
            .create(ProviderKind::Metadata, ProviderDefinition::new(ProviderKind::Metadata, "x", "Plex"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownImplementation { .. }));

        let mut bad = newznab("Broken");
        bad.settings = json!({ "baseUrl": "ftp://nope" });
        let err = service.create(ProviderKind::Indexer, bad).await.unwrap_err();
        assert!(err.failures().iter().any(|f| f.field == "baseUrl"));
    }

    #[tokio::test]
    async fn update_get_and_delete() {
        let service = service().await;
        let mut created = service.create(ProviderKind::Metadata, kodi("Kodi")).await.unwrap();
        created.enable = false;
        let updated = service.update(ProviderKind::Metadata, created.clone()).await.unwrap();
        assert!(!updated.enable);
        assert!(!service.get(ProviderKind::Metadata, created.id).await.unwrap().enable);

        assert!(matches!(
            service.get(ProviderKind::Indexer, created.id).await,
            Err(ProviderError::NotFound { .. })
        ));

        service.delete(ProviderKind::Metadata, created.id).await.unwrap();
        assert!(matches!(
            service.delete(ProviderKind::Metadata, created.id).await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_all_reports_each_enabled_definition() {
        let service = service().await;
        let kodi_def = service.create(ProviderKind::Metadata, kodi("Kodi")).await.unwrap();
        let mut disabled = kodi("Off");
        disabled.enable = false;
        service.create(ProviderKind::Metadata, disabled).await.unwrap();

        let results = service.test_all(ProviderKind::Metadata).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, kodi_def.id);
        assert!(results[0].is_valid);
    }
}
