// SPDX-License-Identifier: GPL-3.0-or-later
//! Import lists that feed collections and studios into the library.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    require_text, FieldType, ImportListExtra, Provider, ProviderDefinition, ProviderField,
    ProviderKind, ValidationFailure,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TmdbCollectionSettings {
    pub collection_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StashDbStudioSettings {
    pub studio_id: String,
    pub api_key: Option<String>,
}

/// Root folder is mandatory for every import list.
fn validate_extra(definition: &ProviderDefinition, failures: &mut Vec<ValidationFailure>) {
    match definition.extra::<ImportListExtra>() {
        Ok(extra) => require_text(
            failures,
            "rootFolderPath",
            extra.root_folder_path.as_deref().unwrap_or_default(),
            "root folder must be set",
        ),
        Err(failure) => failures.push(failure),
    }
}

pub struct TmdbCollection;

#[async_trait::async_trait]
impl Provider for TmdbCollection {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ImportList
    }

    fn implementation(&self) -> &'static str {
        "TMDbCollectionImport"
    }

    fn implementation_name(&self) -> &'static str {
        "TMDb Collection"
    }

    fn config_contract(&self) -> &'static str {
        "TMDbCollectionSettings"
    }

    fn default_settings(&self) -> Value {
        json!({ "collectionId": "" })
    }

    fn fields(&self) -> Vec<ProviderField> {
        vec![ProviderField::new("collectionId", "Collection Id", FieldType::Textbox, json!(""))
            .help("TMDb id of the collection to follow")]
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        match definition.settings::<TmdbCollectionSettings>() {
            Ok(settings) => {
                let id = settings.collection_id.trim();
                if id.parse::<i32>().map_or(true, |id| id <= 0) {
                    failures.push(ValidationFailure::new("collectionId", "must be a positive TMDb id"));
                }
            }
            Err(failure) => failures.push(failure),
        }
        validate_extra(definition, &mut failures);
        failures
    }
}

pub struct StashDbStudio;

#[async_trait::async_trait]
impl Provider for StashDbStudio {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ImportList
    }

    fn implementation(&self) -> &'static str {
        "StashDbStudioImport"
    }

    fn implementation_name(&self) -> &'static str {
        "StashDB Studio"
    }

    fn config_contract(&self) -> &'static str {
        "StashDbStudioSettings"
    }

    fn default_settings(&self) -> Value {
        serde_json::to_value(StashDbStudioSettings::default()).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        vec![
            ProviderField::new("studioId", "Studio Id", FieldType::Textbox, json!("")),
            ProviderField::new("apiKey", "API Key", FieldType::Password, json!("")).advanced(),
        ]
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        let mut failures = Vec::new();
        match definition.settings::<StashDbStudioSettings>() {
            Ok(settings) => require_text(&mut failures, "studioId", &settings.studio_id, "studio id is required"),
            Err(failure) => failures.push(failure),
        }
        validate_extra(definition, &mut failures);
        failures
    }
}
