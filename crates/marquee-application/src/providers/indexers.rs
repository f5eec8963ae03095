// SPDX-License-Identifier: GPL-3.0-or-later
//! Newznab and Torznab indexers. Testing one fetches and parses `?t=caps`.

use async_trait::async_trait;
use quick_xml::de::from_str;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use super::{
    require_http_url, FieldType, IndexerExtra, Provider, ProviderDefinition, ProviderError,
    ProviderField, ProviderKind, ValidationFailure,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerCategory {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerCapabilities {
    pub supports_search: bool,
    pub supports_movie_search: bool,
    pub movie_search_params: Vec<String>,
    pub categories: Vec<IndexerCategory>,
    pub limits_max: Option<u32>,
    pub limits_default: Option<u32>,
}

impl IndexerCapabilities {
    fn has_category(&self, id: i32) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("indexer responded with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("capability detection failed: {0}")]
    Capabilities(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewznabSettings {
    pub base_url: String,
    pub api_path: String,
    pub api_key: Option<String>,
    pub categories: Vec<i32>,
    pub minimum_seeders: Option<i32>,
}

impl Default for NewznabSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_path: "/api".to_string(),
            api_key: None,
            categories: vec![2000, 2010, 2030, 2040, 2045],
            minimum_seeders: None,
        }
    }
}

impl NewznabSettings {
    fn validate(&self) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        require_http_url(&mut failures, "baseUrl", &self.base_url);
        if !self.api_path.starts_with('/') {
            failures.push(ValidationFailure::new("apiPath", "must start with '/'"));
        }
        if self.categories.is_empty() {
            failures.push(ValidationFailure::new("categories", "at least one category is required"));
        }
        if matches!(self.minimum_seeders, Some(n) if n < 0) {
            failures.push(ValidationFailure::new("minimumSeeders", "cannot be negative"));
        }
        failures
    }
}

fn validate_definition(definition: &ProviderDefinition) -> Vec<ValidationFailure> {
    let mut failures = match definition.settings::<NewznabSettings>() {
        Ok(settings) => settings.validate(),
        Err(failure) => vec![failure],
    };
    match definition.extra::<IndexerExtra>() {
        Ok(extra) if !(1..=50).contains(&extra.priority) => {
            failures.push(ValidationFailure::new("priority", "must be between 1 and 50"));
        }
        Ok(_) => {}
        Err(failure) => failures.push(failure),
    }
    failures
}

/// Thin client for the newznab API family.
pub struct NewznabClient {
    client: Client,
    settings: NewznabSettings,
}

impl NewznabClient {
    pub fn new(client: Client, settings: NewznabSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self, function: &str) -> Result<Url, IndexerError> {
        let base = self.settings.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, self.settings.api_path))
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        url.query_pairs_mut().append_pair("t", function);
        if let Some(key) = self.settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            url.query_pairs_mut().append_pair("apikey", key);
        }
        Ok(url)
    }

    pub async fn detect_capabilities(&self) -> Result<IndexerCapabilities, IndexerError> {
        let url = self.endpoint("caps")?;
        debug!(target: "application", host = ?url.host_str(), "fetching indexer capabilities");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IndexerError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(IndexerError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        parse_capabilities(&body)
    }
}

pub fn parse_capabilities(xml: &str) -> Result<IndexerCapabilities, IndexerError> {
    if xml.contains("<error") {
        let error: CapsError =
            from_str(xml).map_err(|e| IndexerError::Capabilities(e.to_string()))?;
        return Err(IndexerError::Capabilities(format!(
            "indexer error {}: {}",
            error.code, error.description
        )));
    }

    let caps: CapsEnvelope =
        from_str(xml).map_err(|e| IndexerError::Capabilities(e.to_string()))?;
    let searching = caps.searching.unwrap_or_default();
    let movie_search = searching.movie_search.filter(CapsSearch::is_available);

    let mut categories = Vec::new();
    for category in caps.categories.map(|c| c.categories).unwrap_or_default() {
        categories.push(IndexerCategory {
            id: category.id,
            name: category.name,
        });
        categories.extend(category.subcategories.into_iter().map(|sub| IndexerCategory {
            id: sub.id,
            name: sub.name,
        }));
    }

    let limits = caps.limits.unwrap_or_default();
    Ok(IndexerCapabilities {
        supports_search: searching.search.is_some_and(|s| s.is_available()),
        supports_movie_search: movie_search.is_some(),
        movie_search_params: movie_search
            .map(|s| {
                s.supported_params
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        categories,
        limits_max: limits.max,
        limits_default: limits.default,
    })
}

#[derive(Debug, Deserialize)]
struct CapsError {
    #[serde(rename = "@code")]
    code: String,
    #[serde(rename = "@description", default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct CapsEnvelope {
    limits: Option<CapsLimits>,
    searching: Option<CapsSearching>,
    categories: Option<CapsCategories>,
}

#[derive(Debug, Default, Deserialize)]
struct CapsLimits {
    #[serde(rename = "@max")]
    max: Option<u32>,
    #[serde(rename = "@default")]
    default: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct CapsSearching {
    search: Option<CapsSearch>,
    #[serde(rename = "movie-search")]
    movie_search: Option<CapsSearch>,
}

#[derive(Debug, Deserialize)]
struct CapsSearch {
    #[serde(rename = "@available")]
    available: String,
    #[serde(rename = "@supportedParams", default)]
    supported_params: String,
}

impl CapsSearch {
    fn is_available(&self) -> bool {
        self.available.eq_ignore_ascii_case("yes")
    }
}

#[derive(Debug, Deserialize)]
struct CapsCategories {
    #[serde(rename = "category", default)]
    categories: Vec<CapsCategory>,
}

#[derive(Debug, Deserialize)]
struct CapsCategory {
    #[serde(rename = "@id")]
    id: i32,
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "subcat", default)]
    subcategories: Vec<CapsSubcategory>,
}

#[derive(Debug, Deserialize)]
struct CapsSubcategory {
    #[serde(rename = "@id")]
    id: i32,
    #[serde(rename = "@name")]
    name: String,
}

fn indexer_fields(torrent: bool) -> Vec<ProviderField> {
    let defaults = NewznabSettings::default();
    let mut fields = vec![
        ProviderField::new("baseUrl", "URL", FieldType::Url, json!("")),
        ProviderField::new("apiPath", "API Path", FieldType::Textbox, json!(defaults.api_path))
            .help("Path to the api, usually /api")
            .advanced(),
        ProviderField::new("apiKey", "API Key", FieldType::Password, json!("")),
        ProviderField::new("categories", "Categories", FieldType::Tag, json!(defaults.categories)),
    ];
    if torrent {
        fields.push(ProviderField::new(
            "minimumSeeders",
            "Minimum Seeders",
            FieldType::Number,
            json!(1),
        ));
    }
    fields
}

async fn test_indexer(client: &Client, definition: &ProviderDefinition) -> Result<(), ProviderError> {
    let failures = validate_definition(definition);
    if !failures.is_empty() {
        return Err(ProviderError::Validation(failures));
    }
    let settings: NewznabSettings = definition
        .settings()
        .map_err(|f| ProviderError::Validation(vec![f]))?;
    let wanted = settings.categories.clone();
    let caps = NewznabClient::new(client.clone(), settings)
        .detect_capabilities()
        .await?;

    if !caps.supports_search && !caps.supports_movie_search {
        return Err(IndexerError::Unsupported("indexer does not support searching".into()).into());
    }
    if !caps.categories.is_empty() && !wanted.iter().any(|id| caps.has_category(*id)) {
        return Err(ProviderError::Validation(vec![ValidationFailure::new(
            "categories",
            "none of the configured categories are offered by the indexer",
        )]));
    }
    Ok(())
}

pub struct Newznab {
    client: Client,
}

impl Newznab {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for Newznab {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Indexer
    }

    fn implementation(&self) -> &'static str {
        "Newznab"
    }

    fn implementation_name(&self) -> &'static str {
        "Newznab"
    }

    fn config_contract(&self) -> &'static str {
        "NewznabSettings"
    }

    fn protocol(&self) -> Option<&'static str> {
        Some("usenet")
    }

    fn default_settings(&self) -> Value {
        serde_json::to_value(NewznabSettings::default()).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        indexer_fields(false)
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        validate_definition(definition)
    }

    async fn test(&self, definition: &ProviderDefinition) -> Result<(), ProviderError> {
        test_indexer(&self.client, definition).await
    }
}

pub struct Torznab {
    client: Client,
}

impl Torznab {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Provider for Torznab {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Indexer
    }

    fn implementation(&self) -> &'static str {
        "Torznab"
    }

    fn implementation_name(&self) -> &'static str {
        "Torznab"
    }

    fn config_contract(&self) -> &'static str {
        "TorznabSettings"
    }

    fn protocol(&self) -> Option<&'static str> {
        Some("torrent")
    }

    fn default_settings(&self) -> Value {
        let settings = NewznabSettings {
            minimum_seeders: Some(1),
            ..NewznabSettings::default()
        };
        serde_json::to_value(settings).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        indexer_fields(true)
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        validate_definition(definition)
    }

    async fn test(&self, definition: &ProviderDefinition) -> Result<(), ProviderError> {
        test_indexer(&self.client, definition).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CAPS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <caps>
            <server title="Example"/>
            <limits max="100" default="50"/>
            <searching>
                <search available="yes" supportedParams="q"/>
                <tv-search available="no" supportedParams="q,season,ep"/>
                <movie-search available="yes" supportedParams="q,imdbid"/>
            </searching>
            <categories>
                <category id="2000" name="Movies">
                    <subcat id="2040" name="Movies/HD"/>
                </category>
                <category id="6000" name="XXX"/>
            </categories>
        </caps>"#;

    fn definition(base_url: &str, categories: Vec<i32>) -> ProviderDefinition {
        let mut definition = ProviderDefinition::new(ProviderKind::Indexer, "Test", "Newznab");
        definition.settings = json!({
            "baseUrl": base_url,
            "apiKey": "secret",
            "categories": categories,
        });
        definition
    }

    #[test]
    fn parses_caps_document() {
        let caps = parse_capabilities(CAPS).expect("caps should parse");
        assert!(caps.supports_search);
        assert!(caps.supports_movie_search);
        assert_eq!(caps.movie_search_params, vec!["q", "imdbid"]);
        assert_eq!(caps.limits_max, Some(100));
        let ids: Vec<_> = caps.categories.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2000, 2040, 6000]);
    }

    #[test]
    fn indexer_error_document_is_reported() {
        let err = parse_capabilities(r#"<error code="100" description="Incorrect user credentials"/>"#)
            .unwrap_err();
        assert!(err.to_string().contains("Incorrect user credentials"));
    }

    #[test]
    fn validates_url_path_and_priority() {
        let mut definition = definition("not a url", vec![]);
        definition.settings["apiPath"] = json!("api");
        definition.extra = json!({ "priority": 0 });
        let fields: Vec<_> = validate_definition(&definition)
            .into_iter()
            .map(|f| f.field)
            .collect();
        assert_eq!(fields, vec!["baseUrl", "apiPath", "categories", "priority"]);
    }

    #[tokio::test]
    async fn test_fetches_caps_with_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("t", "caps"))
            .and(query_param("apikey", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CAPS))
            .expect(1)
            .mount(&server)
            .await;

        let indexer = Newznab::new(Client::new());
        indexer
            .test(&definition(&server.uri(), vec![2040]))
            .await
            .expect("indexer test should pass");
    }

    #[tokio::test]
    async fn test_fails_when_categories_are_not_offered() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CAPS))
            .mount(&server)
            .await;

        let err = Torznab::new(Client::new())
            .test(&definition(&server.uri(), vec![5000]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(ref f) if f[0].field == "categories"));
    }

    #[tokio::test]
    async fn test_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = Newznab::new(Client::new())
            .test(&definition(&server.uri(), vec![2000]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Indexer(IndexerError::HttpStatus { status: 401, .. })
        ));
    }
}
