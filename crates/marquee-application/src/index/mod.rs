// SPDX-License-Identifier: GPL-3.0-or-later
//! Library index query engine: filtering, sorting, jump bar and the persisted
//! per-section view preferences of the movie, scene and studio indexes.

pub mod filters;
pub mod preferences;
pub mod sorting;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use filters::{
    apply_filters, apply_filters_at, predefined_filters, studio_filters, CustomFilter, Filter,
    FilterType, FilterValue, PropertyFilter,
};
pub use preferences::{
    Column, ColumnUpdate, IndexMode, IndexPreferences, IndexPreferencesService, IndexView,
    TableOptionUpdate,
};
pub use sorting::{
    compare_values, filter_options, jump_bar, sort_items, FilterOption, JumpBar, SortDirection,
};

/// Value of one item property as seen by filters and sort predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl PropertyValue {
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |v| Self::Text(v.to_string()))
    }

    pub fn number<N: Into<f64>>(value: Option<N>) -> Self {
        value.map_or(Self::Missing, |v| Self::Number(v.into()))
    }

    pub fn date(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Missing, Self::Date)
    }
}

/// Anything listed by an index page.
pub trait IndexItem {
    fn property(&self, key: &str) -> PropertyValue;

    /// Value used for ordering; defaults to the filter value.
    fn sort_value(&self, key: &str) -> PropertyValue {
        self.property(key)
    }
}

const MOVIE_SORT_KEYS: [&str; 18] = [
    "sortTitle",
    "status",
    "collection",
    "studio",
    "qualityProfileId",
    "originalLanguage",
    "added",
    "year",
    "releaseDate",
    "inCinemas",
    "digitalRelease",
    "physicalRelease",
    "runtime",
    "path",
    "sizeOnDisk",
    "popularity",
    "tmdbRating",
    "rottenTomatoesRating",
];

const SCENE_SORT_KEYS: [&str; 19] = [
    "sortTitle",
    "status",
    "collection",
    "studio",
    "qualityProfileId",
    "originalLanguage",
    "added",
    "year",
    "releaseDate",
    "inCinemas",
    "digitalRelease",
    "physicalRelease",
    "runtime",
    "path",
    "sizeOnDisk",
    "popularity",
    "tmdbRating",
    "rottenTomatoesRating",
    "sceneStatus",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexSection {
    MovieIndex,
    SceneIndex,
    Studios,
}

impl IndexSection {
    pub const ALL: [IndexSection; 3] = [Self::MovieIndex, Self::SceneIndex, Self::Studios];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MovieIndex => "movieIndex",
            Self::SceneIndex => "sceneIndex",
            Self::Studios => "studios",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Keys accepted by `set_sort` for this section.
    pub fn sort_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Studios => &["sortTitle", "network", "added"],
            Self::SceneIndex => &SCENE_SORT_KEYS,
            Self::MovieIndex => &MOVIE_SORT_KEYS,
        }
    }

    pub fn filter_builder_props(&self) -> Vec<FilterBuilderProp> {
        use FilterBuilderType::*;
        let prop = |name: &str, label: &str, builder_type, value_type: Option<&str>| FilterBuilderProp {
            name: name.to_string(),
            label: label.to_string(),
            builder_type,
            value_type: value_type.map(str::to_string),
        };
        match self {
            Self::Studios => vec![
                prop("monitored", "Monitored", Exact, Some("bool")),
                prop("network", "Network", Exact, None),
                prop("tags", "Tags", Array, Some("tag")),
            ],
            Self::MovieIndex | Self::SceneIndex => vec![
                prop("monitored", "Monitored", Exact, Some("bool")),
                prop("isAvailable", "Considered Available", Exact, Some("bool")),
                prop("title", "Title", String, None),
                prop("originalLanguage", "Original Language", Exact, None),
                prop("status", "Release Status", Exact, Some("releaseStatus")),
                prop("studio", "Studio", Exact, None),
                prop("collection", "Collection", Array, None),
                prop("qualityProfileId", "Quality Profile", Exact, Some("qualityProfile")),
                prop("added", "Added", Date, Some("date")),
                prop("year", "Year", Number, None),
                prop("inCinemas", "In Cinemas", Date, Some("date")),
                prop("physicalRelease", "Physical Release", Date, Some("date")),
                prop("digitalRelease", "Digital Release", Date, Some("date")),
                prop("runtime", "Runtime", Number, None),
                prop("path", "Path", String, None),
                prop("sizeOnDisk", "Size on Disk", Number, Some("bytes")),
                prop("genres", "Genres", Array, None),
                prop("tmdbRating", "TMDb Rating", Number, None),
                prop("tmdbVotes", "TMDb Votes", Number, None),
                prop("rottenTomatoesRating", "Rotten Tomatoes Rating", Number, None),
                prop("tags", "Tags", Array, Some("tag")),
            ],
        }
    }
}

impl std::fmt::Display for IndexSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterBuilderType {
    Exact,
    String,
    Number,
    Date,
    Array,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterBuilderProp {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub builder_type: FilterBuilderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("unknown index section: {0}")]
    UnknownSection(String),
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
    #[error("unknown sort key: {0}")]
    UnknownSortKey(String),
    #[error("filter options are not available for: {0}")]
    UnknownFilterProperty(String),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_parse_case_insensitively() {
        assert_eq!(IndexSection::parse("SceneIndex"), Some(IndexSection::SceneIndex));
        assert_eq!(IndexSection::parse("studios"), Some(IndexSection::Studios));
        assert_eq!(IndexSection::parse("calendar"), None);
    }

    #[test]
    fn studio_builder_props_cover_monitored_network_tags() {
        let names: Vec<_> = IndexSection::Studios
            .filter_builder_props()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["monitored", "network", "tags"]);
    }

    #[test]
    fn builder_props_serialize_type_field() {
        let props = IndexSection::SceneIndex.filter_builder_props();
        let value = serde_json::to_value(&props[0]).unwrap();
        assert_eq!(value["type"], "exact");
        assert_eq!(value["valueType"], "bool");
    }
}
