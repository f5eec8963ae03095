// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use marquee_infrastructure::repositories::{CustomFilterRecord, IndexPreferencesRepository};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CustomFilter, IndexError, IndexSection, PropertyFilter, SortDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    Movie,
    Scene,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexView {
    Posters,
    Overview,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub label: String,
    pub is_sortable: bool,
    pub is_visible: bool,
    pub is_modifiable: bool,
}

impl Column {
    fn new(name: &str, label: &str, is_sortable: bool, is_visible: bool, is_modifiable: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            is_sortable,
            is_visible,
            is_modifiable,
        }
    }
}

/// One entry of a table-options update; order of the list is the new column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnUpdate {
    pub name: String,
    pub is_visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOptionUpdate {
    #[serde(default)]
    pub columns: Option<Vec<ColumnUpdate>>,
    #[serde(default)]
    pub table_options: Option<Map<String, Value>>,
}

/// Persisted view state of one index page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPreferences {
    pub section: IndexSection,
    pub index_mode: IndexMode,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub secondary_sort_key: String,
    pub secondary_sort_direction: SortDirection,
    pub view: IndexView,
    pub selected_filter_key: String,
    pub poster_options: Map<String, Value>,
    pub overview_options: Map<String, Value>,
    pub table_options: Map<String, Value>,
    pub columns: Vec<Column>,
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn library_columns(section: IndexSection) -> Vec<Column> {
    let mut columns = vec![
        Column::new("status", "", true, true, false),
        Column::new("sortTitle", "Title", true, true, false),
        Column::new("collection", "Collection", true, false, true),
        Column::new("studio", "Studio", true, true, true),
        Column::new("qualityProfileId", "Quality Profile", true, true, true),
        Column::new("originalLanguage", "Original Language", true, false, true),
        Column::new("added", "Added", true, false, true),
        Column::new("year", "Year", true, true, true),
        Column::new("inCinemas", "In Cinemas", true, false, true),
        Column::new("digitalRelease", "Digital Release", true, false, true),
        Column::new("physicalRelease", "Physical Release", true, false, true),
        Column::new("runtime", "Runtime", true, false, true),
        Column::new("path", "Path", true, false, true),
        Column::new("sizeOnDisk", "Size on Disk", true, false, true),
        Column::new("genres", "Genres", false, false, true),
        Column::new("tmdbRating", "TMDb Rating", true, false, true),
        Column::new("rottenTomatoesRating", "Rotten Tomatoes Rating", true, false, true),
        Column::new("tags", "Tags", false, false, true),
        Column::new("actions", "", false, true, false),
    ];
    if section == IndexSection::SceneIndex {
        let after_genres = columns.iter().position(|c| c.name == "genres").map_or(0, |i| i + 1);
        columns.insert(after_genres, Column::new("sceneStatus", "Status", true, true, true));
    }
    columns
}

fn studio_columns() -> Vec<Column> {
    vec![
        Column::new("sortTitle", "Title", true, true, false),
        Column::new("network", "Network", true, true, true),
        Column::new("qualityProfileId", "Quality Profile", false, true, true),
        Column::new("rootFolderPath", "Root Folder", false, false, true),
        Column::new("added", "Added", true, false, true),
        Column::new("tags", "Tags", false, false, true),
        Column::new("actions", "", false, true, false),
    ]
}

impl IndexPreferences {
    pub fn defaults(section: IndexSection) -> Self {
        let index_mode = match section {
            IndexSection::MovieIndex => IndexMode::Movie,
            IndexSection::SceneIndex | IndexSection::Studios => IndexMode::Scene,
        };
        let columns = match section {
            IndexSection::Studios => studio_columns(),
            IndexSection::MovieIndex | IndexSection::SceneIndex => library_columns(section),
        };
        Self {
            section,
            index_mode,
            sort_key: "sortTitle".to_string(),
            sort_direction: SortDirection::Ascending,
            secondary_sort_key: "sortTitle".to_string(),
            secondary_sort_direction: SortDirection::Ascending,
            view: IndexView::Posters,
            selected_filter_key: "all".to_string(),
            poster_options: as_map(json!({
                "detailedProgressBar": false,
                "size": "large",
                "showTitle": false,
                "showMonitored": true,
                "showQualityProfile": true,
                "showReleaseDate": false,
                "showTmdbRating": false,
                "showRottenTomatoesRating": false,
                "showSearchAction": false,
            })),
            overview_options: as_map(json!({
                "detailedProgressBar": false,
                "size": "medium",
                "showMonitored": true,
                "showStudio": true,
                "showQualityProfile": true,
                "showAdded": false,
                "showPath": false,
                "showSizeOnDisk": false,
                "showSearchAction": false,
            })),
            table_options: as_map(json!({ "showSearchAction": false })),
            columns,
        }
    }

    /// Stored JSON layered over the defaults. Option maps merge key by key so
    /// options added later keep their default.
    pub fn from_stored(section: IndexSection, stored: Value) -> Self {
        let defaults = Self::defaults(section);
        let Value::Object(stored) = stored else {
            return defaults;
        };
        let Ok(Value::Object(mut merged)) = serde_json::to_value(&defaults) else {
            return defaults;
        };

        for (key, value) in stored {
            if key.ends_with("Options") {
                if let (Some(Value::Object(base)), Value::Object(overrides)) =
                    (merged.get_mut(&key), &value)
                {
                    base.extend(overrides.clone());
                    continue;
                }
            }
            merged.insert(key, value);
        }
        merged.insert("section".to_string(), json!(section));

        serde_json::from_value(Value::Object(merged)).unwrap_or_else(|error| {
            warn!(target: "application", %section, %error, "stored index preferences are invalid, using defaults");
            defaults
        })
    }

    /// Same key without a direction flips the direction; a new key starts ascending.
    pub fn set_sort(
        &mut self,
        sort_key: &str,
        direction: Option<SortDirection>,
    ) -> Result<(), IndexError> {
        if !self.section.sort_keys().contains(&sort_key) {
            return Err(IndexError::UnknownSortKey(sort_key.to_string()));
        }
        self.sort_direction = match direction {
            Some(direction) => direction,
            None if self.sort_key == sort_key => self.sort_direction.flip(),
            None => SortDirection::Ascending,
        };
        self.sort_key = sort_key.to_string();
        Ok(())
    }

    pub fn set_filter(&mut self, filter_key: &str) {
        self.selected_filter_key = filter_key.to_string();
    }

    pub fn set_view(&mut self, view: IndexView) {
        self.view = view;
    }

    pub fn set_index_mode(&mut self, mode: IndexMode) {
        self.index_mode = mode;
    }

    pub fn set_table_option(&mut self, update: TableOptionUpdate) {
        if let Some(options) = update.table_options {
            self.table_options.extend(options);
        }
        let Some(order) = update.columns else {
            return;
        };

        let mut remaining = std::mem::take(&mut self.columns);
        let mut columns = Vec::with_capacity(remaining.len());
        for wanted in order {
            if let Some(pos) = remaining.iter().position(|c| c.name == wanted.name) {
                let mut column = remaining.remove(pos);
                if column.is_modifiable {
                    column.is_visible = wanted.is_visible;
                }
                columns.push(column);
            }
        }
        columns.extend(remaining);
        self.columns = columns;
    }

    pub fn set_poster_option(&mut self, options: Map<String, Value>) {
        self.poster_options.extend(options);
    }

    pub fn set_overview_option(&mut self, options: Map<String, Value>) {
        self.overview_options.extend(options);
    }
}

/// Loads, mutates and persists index preferences and custom filters.
#[derive(Clone)]
pub struct IndexPreferencesService {
    repository: Arc<dyn IndexPreferencesRepository>,
}

impl IndexPreferencesService {
    pub fn new(repository: Arc<dyn IndexPreferencesRepository>) -> Self {
        Self { repository }
    }

    pub async fn get(&self, section: IndexSection) -> Result<IndexPreferences, IndexError> {
        let stored = self.repository.get(section.as_str()).await?;
        Ok(match stored {
            Some(value) => IndexPreferences::from_stored(section, value),
            None => IndexPreferences::defaults(section),
        })
    }

    async fn update<F>(&self, section: IndexSection, apply: F) -> Result<IndexPreferences, IndexError>
    where
        F: FnOnce(&mut IndexPreferences) -> Result<(), IndexError> + Send,
    {
        let mut preferences = self.get(section).await?;
        apply(&mut preferences)?;
        let value = serde_json::to_value(&preferences).map_err(anyhow::Error::from)?;
        self.repository.save(section.as_str(), value).await?;
        debug!(target: "application", %section, "index preferences saved");
        Ok(preferences)
    }

    pub async fn set_sort(
        &self,
        section: IndexSection,
        sort_key: &str,
        direction: Option<SortDirection>,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| p.set_sort(sort_key, direction)).await
    }

    pub async fn set_filter(
        &self,
        section: IndexSection,
        filter_key: &str,
    ) -> Result<IndexPreferences, IndexError> {
        // Validates the key before storing it.
        self.resolve_filters(section, filter_key).await?;
        self.update(section, |p| {
            p.set_filter(filter_key);
            Ok(())
        })
        .await
    }

    pub async fn set_view(
        &self,
        section: IndexSection,
        view: IndexView,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| {
            p.set_view(view);
            Ok(())
        })
        .await
    }

    pub async fn set_index_mode(
        &self,
        section: IndexSection,
        mode: IndexMode,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| {
            p.set_index_mode(mode);
            Ok(())
        })
        .await
    }

    pub async fn set_table_option(
        &self,
        section: IndexSection,
        update: TableOptionUpdate,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| {
            p.set_table_option(update);
            Ok(())
        })
        .await
    }

    pub async fn set_poster_option(
        &self,
        section: IndexSection,
        options: Map<String, Value>,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| {
            p.set_poster_option(options);
            Ok(())
        })
        .await
    }

    pub async fn set_overview_option(
        &self,
        section: IndexSection,
        options: Map<String, Value>,
    ) -> Result<IndexPreferences, IndexError> {
        self.update(section, |p| {
            p.set_overview_option(options);
            Ok(())
        })
        .await
    }

    pub async fn custom_filters(&self, section: IndexSection) -> Result<Vec<CustomFilter>, IndexError> {
        let records = self.repository.list_custom_filters(section.as_str()).await?;
        let mut filters = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<Vec<PropertyFilter>>(record.filters) {
                Ok(property_filters) => filters.push(CustomFilter {
                    id: record.id,
                    section,
                    label: record.label,
                    filters: property_filters,
                }),
                Err(error) => {
                    warn!(target: "application", id = %record.id, %error, "skipping unreadable custom filter")
                }
            }
        }
        Ok(filters)
    }

    pub async fn save_custom_filter(&self, mut filter: CustomFilter) -> Result<CustomFilter, IndexError> {
        if filter.id.trim().is_empty() {
            filter.id = Uuid::new_v4().to_string();
        }
        let record = CustomFilterRecord {
            id: filter.id.clone(),
            section: filter.section.as_str().to_string(),
            label: filter.label.clone(),
            filters: serde_json::to_value(&filter.filters).map_err(anyhow::Error::from)?,
        };
        self.repository.save_custom_filter(record).await?;
        Ok(filter)
    }

    pub async fn delete_custom_filter(&self, id: &str) -> Result<(), IndexError> {
        self.repository.delete_custom_filter(id).await?;
        Ok(())
    }

    /// Property filters behind a predefined filter key or a custom filter id.
    pub async fn resolve_filters(
        &self,
        section: IndexSection,
        filter_key: &str,
    ) -> Result<Vec<PropertyFilter>, IndexError> {
        if let Some(predefined) = section.filters().into_iter().find(|f| f.key == filter_key) {
            return Ok(predefined.filters);
        }
        self.custom_filters(section)
            .await?
            .into_iter()
            .find(|f| f.id == filter_key)
            .map(|f| f.filters)
            .ok_or_else(|| IndexError::UnknownFilter(filter_key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{FilterType, FilterValue};
    use crate::test_support::setup_pool;
    use marquee_infrastructure::sqlite_adapters::SqliteIndexPreferencesRepository;

    async fn service() -> IndexPreferencesService {
        let pool = setup_pool().await;
        IndexPreferencesService::new(Arc::new(SqliteIndexPreferencesRepository::new(pool)))
    }

    #[test]
    fn set_sort_flips_same_key_and_resets_new_key() {
        let mut prefs = IndexPreferences::defaults(IndexSection::SceneIndex);
        prefs.set_sort("sortTitle", None).unwrap();
        assert_eq!(prefs.sort_direction, SortDirection::Descending);

        prefs.set_sort("year", None).unwrap();
        assert_eq!(prefs.sort_key, "year");
        assert_eq!(prefs.sort_direction, SortDirection::Ascending);

        prefs.set_sort("year", Some(SortDirection::Ascending)).unwrap();
        assert_eq!(prefs.sort_direction, SortDirection::Ascending);

        assert!(matches!(
            prefs.set_sort("colour", None),
            Err(IndexError::UnknownSortKey(_))
        ));
    }

    #[test]
    fn table_option_reorders_and_keeps_fixed_visibility() {
        let mut prefs = IndexPreferences::defaults(IndexSection::MovieIndex);
        prefs.set_table_option(TableOptionUpdate {
            columns: Some(vec![
                ColumnUpdate { name: "year".into(), is_visible: false },
                ColumnUpdate { name: "sortTitle".into(), is_visible: false },
                ColumnUpdate { name: "path".into(), is_visible: true },
            ]),
            table_options: Some(as_map(json!({ "showSearchAction": true }))),
        });

        let names: Vec<_> = prefs.columns.iter().take(4).map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["year", "sortTitle", "path", "status"]);
        assert!(!prefs.columns[0].is_visible);
        assert!(prefs.columns[1].is_visible, "title column cannot be hidden");
        assert!(prefs.columns[2].is_visible);
        assert_eq!(prefs.columns.len(), library_columns(prefs.section).len());
        assert_eq!(prefs.table_options["showSearchAction"], true);
    }

    #[test]
    fn only_the_scene_index_has_a_scene_status_column() {
        let has = |section| {
            IndexPreferences::defaults(section)
                .columns
                .iter()
                .any(|c| c.name == "sceneStatus" && c.is_sortable)
        };
        assert!(has(IndexSection::SceneIndex));
        assert!(!has(IndexSection::MovieIndex));
        for section in [IndexSection::MovieIndex, IndexSection::SceneIndex] {
            for column in IndexPreferences::defaults(section).columns.iter().filter(|c| c.is_sortable) {
                assert!(section.sort_keys().contains(&column.name.as_str()), "{}", column.name);
            }
        }
    }

    #[test]
    fn poster_options_merge_shallowly() {
        let mut prefs = IndexPreferences::defaults(IndexSection::SceneIndex);
        prefs.set_poster_option(as_map(json!({ "size": "small" })));
        assert_eq!(prefs.poster_options["size"], "small");
        assert_eq!(prefs.poster_options["showMonitored"], true);
    }

    #[test]
    fn stored_preferences_merge_over_defaults() {
        let stored = json!({
            "sortKey": "year",
            "sortDirection": "descending",
            "posterOptions": { "showTitle": true },
        });
        let prefs = IndexPreferences::from_stored(IndexSection::SceneIndex, stored);
        assert_eq!(prefs.sort_key, "year");
        assert_eq!(prefs.sort_direction, SortDirection::Descending);
        assert_eq!(prefs.poster_options["showTitle"], true);
        assert_eq!(prefs.poster_options["size"], "large");
        assert_eq!(prefs.view, IndexView::Posters);

        let broken = IndexPreferences::from_stored(IndexSection::Studios, json!({ "view": 7 }));
        assert_eq!(broken, IndexPreferences::defaults(IndexSection::Studios));
    }

    #[tokio::test]
    async fn service_persists_per_section() {
        let service = service().await;
        let defaults = service.get(IndexSection::SceneIndex).await.unwrap();
        assert_eq!(defaults.sort_key, "sortTitle");
        assert_eq!(defaults.selected_filter_key, "all");

        service.set_view(IndexSection::SceneIndex, IndexView::Table).await.unwrap();
        service.set_sort(IndexSection::SceneIndex, "sortTitle", None).await.unwrap();

        let scene = service.get(IndexSection::SceneIndex).await.unwrap();
        assert_eq!(scene.view, IndexView::Table);
        assert_eq!(scene.sort_direction, SortDirection::Descending);

        let movie = service.get(IndexSection::MovieIndex).await.unwrap();
        assert_eq!(movie.view, IndexView::Posters);
    }

    #[tokio::test]
    async fn filters_resolve_predefined_then_custom() {
        let service = service().await;
        let missing = service.resolve_filters(IndexSection::MovieIndex, "missing").await.unwrap();
        assert_eq!(missing.len(), 2);

        let saved = service
            .save_custom_filter(CustomFilter {
                id: String::new(),
                section: IndexSection::MovieIndex,
                label: "Recent".into(),
                filters: vec![PropertyFilter::new(
                    "added",
                    FilterValue::Number(14.0),
                    FilterType::InLast,
                )],
            })
            .await
            .unwrap();
        assert!(!saved.id.is_empty());

        let custom = service.resolve_filters(IndexSection::MovieIndex, &saved.id).await.unwrap();
        assert_eq!(custom[0].filter_type, FilterType::InLast);

        service.set_filter(IndexSection::MovieIndex, &saved.id).await.unwrap();
        assert!(matches!(
            service.set_filter(IndexSection::MovieIndex, "nope").await,
            Err(IndexError::UnknownFilter(_))
        ));

        service.delete_custom_filter(&saved.id).await.unwrap();
        assert!(service.custom_filters(IndexSection::MovieIndex).await.unwrap().is_empty());
    }
}
