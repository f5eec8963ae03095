// SPDX-License-Identifier: GPL-3.0-or-later
//! Bulk edits. Only the fields present in the request are touched.

use std::collections::BTreeSet;

use marquee_domain::{ProfileId, ProviderId, TagId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    DownloadClientExtra, ImportListExtra, IndexerExtra, ProviderDefinition, ProviderError,
    ProviderKind, ValidationFailure,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTags {
    Add,
    Remove,
    Replace,
}

impl ApplyTags {
    pub fn apply(self, current: &[TagId], requested: &[TagId]) -> Vec<TagId> {
        let current: BTreeSet<_> = current.iter().copied().collect();
        let requested: BTreeSet<_> = requested.iter().copied().collect();
        let result = match self {
            Self::Add => &current | &requested,
            Self::Remove => &current - &requested,
            Self::Replace => requested,
        };
        result.into_iter().collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBulkUpdate {
    pub ids: Vec<ProviderId>,
    #[serde(default)]
    pub tags: Option<Vec<TagId>>,
    #[serde(default)]
    pub apply_tags: Option<ApplyTags>,
    /// Kind-specific fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexerBulk {
    enable_rss: Option<bool>,
    enable_automatic_search: Option<bool>,
    enable_interactive_search: Option<bool>,
    priority: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportListBulk {
    enabled: Option<bool>,
    enable_auto: Option<bool>,
    root_folder_path: Option<String>,
    quality_profile_id: Option<ProfileId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadClientBulk {
    enable: Option<bool>,
    priority: Option<i32>,
}

fn fields<T: DeserializeOwned>(update: &ProviderBulkUpdate) -> Result<T, ProviderError> {
    serde_json::from_value(Value::Object(update.fields.clone()))
        .map_err(|e| ProviderError::Validation(vec![ValidationFailure::new("bulk", e.to_string())]))
}

fn check_priority(priority: Option<i32>) -> Result<(), ProviderError> {
    match priority {
        Some(p) if !(1..=50).contains(&p) => Err(ProviderError::Validation(vec![
            ValidationFailure::new("priority", "must be between 1 and 50"),
        ])),
        _ => Ok(()),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ProviderError> {
    serde_json::to_value(value).map_err(|e| ProviderError::Repository(e.into()))
}

/// Applies `update` to one definition of `kind`.
pub(crate) fn apply(
    kind: ProviderKind,
    update: &ProviderBulkUpdate,
    definition: &mut ProviderDefinition,
) -> Result<(), ProviderError> {
    if let Some(tags) = &update.tags {
        let mode = update.apply_tags.unwrap_or(ApplyTags::Replace);
        definition.tags = mode.apply(&definition.tags, tags);
    }

    let invalid = |f: ValidationFailure| ProviderError::Validation(vec![f]);
    match kind {
        ProviderKind::Indexer => {
            let bulk: IndexerBulk = fields(update)?;
            check_priority(bulk.priority)?;
            let mut extra: IndexerExtra = definition.extra().map_err(invalid)?;
            if let Some(v) = bulk.enable_rss {
                extra.enable_rss = v;
            }
            if let Some(v) = bulk.enable_automatic_search {
                extra.enable_automatic_search = v;
            }
            if let Some(v) = bulk.enable_interactive_search {
                extra.enable_interactive_search = v;
            }
            if let Some(v) = bulk.priority {
                extra.priority = v;
            }
            definition.extra = encode(&extra)?;
        }
        ProviderKind::ImportList => {
            let bulk: ImportListBulk = fields(update)?;
            let mut extra: ImportListExtra = definition.extra().map_err(invalid)?;
            if let Some(v) = bulk.enabled {
                extra.enabled = v;
                definition.enable = v;
            }
            if let Some(v) = bulk.enable_auto {
                extra.enable_auto = v;
            }
            if let Some(v) = bulk.root_folder_path {
                extra.root_folder_path = Some(v);
            }
            if let Some(v) = bulk.quality_profile_id {
                extra.quality_profile_id = Some(v);
            }
            definition.extra = encode(&extra)?;
        }
        ProviderKind::DownloadClient => {
            let bulk: DownloadClientBulk = fields(update)?;
            check_priority(bulk.priority)?;
            if let Some(v) = bulk.enable {
                definition.enable = v;
            }
            if let Some(v) = bulk.priority {
                let mut extra: DownloadClientExtra = definition.extra().map_err(invalid)?;
                extra.priority = v;
                definition.extra = encode(&extra)?;
            }
        }
        // Metadata consumers only take tag edits.
        ProviderKind::Metadata => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{default_providers, ProviderService};
    use crate::test_support::setup_pool;
    use marquee_infrastructure::sqlite_adapters::SqliteProviderRepository;
    use serde_json::json;
    use std::sync::Arc;

    fn tag_ids(n: usize) -> Vec<TagId> {
        let mut ids: Vec<_> = (0..n).map(|_| TagId::new()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn apply_tags_modes() {
        let t = tag_ids(3);
        assert_eq!(ApplyTags::Add.apply(&t[..2], &t[1..]), t);
        assert_eq!(ApplyTags::Remove.apply(&t, &[t[1]]), vec![t[0], t[2]]);
        assert_eq!(ApplyTags::Replace.apply(&t, &[t[2]]), vec![t[2]]);
    }

    #[test]
    fn indexer_fields_only_touch_what_was_sent() {
        let mut definition = ProviderDefinition::new(ProviderKind::Indexer, "nzb", "Newznab");
        definition.extra = json!({ "enableRss": true, "priority": 10 });
        let update: ProviderBulkUpdate = serde_json::from_value(json!({
            "ids": [definition.id],
            "enableRss": false,
        }))
        .unwrap();

        apply(ProviderKind::Indexer, &update, &mut definition).unwrap();
        assert_eq!(definition.extra["enableRss"], false);
        assert_eq!(definition.extra["priority"], 10);
        assert_eq!(definition.extra["enableAutomaticSearch"], true);
    }

    #[test]
    fn import_list_enabled_mirrors_enable() {
        let mut definition = ProviderDefinition::new(ProviderKind::ImportList, "list", "TMDbCollectionImport");
        let update: ProviderBulkUpdate = serde_json::from_value(json!({
            "ids": [definition.id],
            "enabled": false,
            "rootFolderPath": "/new",
        }))
        .unwrap();

        apply(ProviderKind::ImportList, &update, &mut definition).unwrap();
        assert!(!definition.enable);
        assert_eq!(definition.extra["rootFolderPath"], "/new");
    }

    #[test]
    fn download_client_priority_is_range_checked() {
        let mut definition = ProviderDefinition::new(ProviderKind::DownloadClient, "qbt", "QBittorrent");
        let update: ProviderBulkUpdate =
            serde_json::from_value(json!({ "ids": [definition.id], "priority": 99 })).unwrap();
        assert!(matches!(
            apply(ProviderKind::DownloadClient, &update, &mut definition),
            Err(ProviderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn service_bulk_update_and_delete() {
        let pool = setup_pool().await;
        let service = ProviderService::new(
            Arc::new(SqliteProviderRepository::new(pool)),
            default_providers(reqwest::Client::new()),
        );
        let mut ids = Vec::new();
        for name in ["Kodi A", "Kodi B"] {
            let created = service
                .create(
                    ProviderKind::Metadata,
                    ProviderDefinition::new(ProviderKind::Metadata, name, "Kodi"),
                )
                .await
                .unwrap();
            ids.push(created.id);
        }

        assert!(service.bulk_update(ProviderKind::Metadata, None).await.unwrap().is_empty());

        let tag = TagId::new();
        let updated = service
            .bulk_update(
                ProviderKind::Metadata,
                Some(ProviderBulkUpdate {
                    ids: ids.clone(),
                    tags: Some(vec![tag]),
                    apply_tags: Some(ApplyTags::Add),
                    fields: Map::new(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|d| d.tags == vec![tag]));

        assert_eq!(service.bulk_delete(ProviderKind::Metadata, &ids).await.unwrap(), 2);
        assert!(service.list(ProviderKind::Metadata).await.unwrap().is_empty());
    }
}
