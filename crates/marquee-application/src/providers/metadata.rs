// SPDX-License-Identifier: GPL-3.0-or-later
//! Metadata consumers that write sidecar files next to movies.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{FieldType, Provider, ProviderDefinition, ProviderField, ProviderKind, ValidationFailure};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KodiSettings {
    pub movie_metadata: bool,
    pub movie_metadata_url: bool,
    pub movie_metadata_language: String,
    pub movie_images: bool,
    pub use_movie_nfo: bool,
}

impl Default for KodiSettings {
    fn default() -> Self {
        Self {
            movie_metadata: true,
            movie_metadata_url: false,
            movie_metadata_language: "en".to_string(),
            movie_images: true,
            use_movie_nfo: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbySettings {
    pub movie_metadata: bool,
}

impl Default for EmbySettings {
    fn default() -> Self {
        Self { movie_metadata: true }
    }
}

pub struct Kodi;

#[async_trait::async_trait]
impl Provider for Kodi {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Metadata
    }

    fn implementation(&self) -> &'static str {
        "Kodi"
    }

    fn implementation_name(&self) -> &'static str {
        "Kodi (XBMC) / Emby"
    }

    fn config_contract(&self) -> &'static str {
        "KodiMetadataSettings"
    }

    fn default_settings(&self) -> Value {
        serde_json::to_value(KodiSettings::default()).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        vec![
            ProviderField::new("movieMetadata", "Movie Metadata", FieldType::Checkbox, json!(true)),
            ProviderField::new("movieMetadataUrl", "Movie Metadata URL", FieldType::Checkbox, json!(false))
                .help("Include the TMDb url in the nfo")
                .advanced(),
            ProviderField::new("movieMetadataLanguage", "Metadata Language", FieldType::Textbox, json!("en")),
            ProviderField::new("movieImages", "Movie Images", FieldType::Checkbox, json!(true)),
            ProviderField::new("useMovieNfo", "Use movie.nfo", FieldType::Checkbox, json!(false))
                .help("Write movie.nfo instead of <movie-filename>.nfo"),
        ]
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        match definition.settings::<KodiSettings>() {
            Ok(settings) => {
                let language = settings.movie_metadata_language.trim();
                if language.len() == 2 && language.chars().all(|c| c.is_ascii_alphabetic()) {
                    Vec::new()
                } else {
                    vec![ValidationFailure::new(
                        "movieMetadataLanguage",
                        "must be a two letter language code",
                    )]
                }
            }
            Err(failure) => vec![failure],
        }
    }
}

pub struct Emby;

#[async_trait::async_trait]
impl Provider for Emby {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Metadata
    }

    fn implementation(&self) -> &'static str {
        "MediaBrowser"
    }

    fn implementation_name(&self) -> &'static str {
        "Emby (Legacy)"
    }

    fn config_contract(&self) -> &'static str {
        "MediaBrowserMetadataSettings"
    }

    fn default_settings(&self) -> Value {
        serde_json::to_value(EmbySettings::default()).unwrap_or_else(|_| json!({}))
    }

    fn fields(&self) -> Vec<ProviderField> {
        vec![ProviderField::new(
            "movieMetadata",
            "Movie Metadata",
            FieldType::Checkbox,
            json!(true),
        )
        .help("movie.xml with full movie metadata")]
    }

    fn validate(&self, definition: &ProviderDefinition) -> Vec<ValidationFailure> {
        definition
            .settings::<EmbySettings>()
            .err()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kodi_checks_language_code() {
        let mut definition = ProviderDefinition::new(ProviderKind::Metadata, "Kodi", "Kodi");
        assert!(Kodi.validate(&definition).is_empty());

        definition.settings = json!({ "movieMetadataLanguage": "english" });
        let err = Kodi.test(&definition).await.unwrap_err();
        assert_eq!(err.failures()[0].field, "movieMetadataLanguage");
    }

    #[test]
    fn emby_rejects_mistyped_settings() {
        let mut definition = ProviderDefinition::new(ProviderKind::Metadata, "Emby", "MediaBrowser");
        definition.settings = json!({ "movieMetadata": "yes" });
        assert_eq!(Emby.validate(&definition)[0].field, "settings");
    }
}
