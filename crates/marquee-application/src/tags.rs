// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use marquee_domain::{Tag, Validate};
use marquee_infrastructure::repositories::TagRepository;
use tracing::info;

use crate::library::LibraryError;

#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    pub async fn list(&self) -> Result<Vec<Tag>, LibraryError> {
        Ok(self.tags.list().await?)
    }

    /// Labels are unique; adding an existing label returns the stored tag.
    pub async fn add(&self, label: &str) -> Result<Tag, LibraryError> {
        let tag = Tag::new(label);
        tag.validate().map_err(LibraryError::Validation)?;
        if let Some(existing) = self.tags.get_by_label(&tag.label).await? {
            return Ok(existing);
        }
        let tag = self.tags.create(tag).await?;
        info!(target: "application", tag_id = %tag.id, label = %tag.label, "tag added");
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_pool;
    use marquee_infrastructure::sqlite_adapters::SqliteTagRepository;

    #[tokio::test]
    async fn add_normalizes_and_deduplicates() {
        let service = TagService::new(Arc::new(SqliteTagRepository::new(setup_pool().await)));
        let first = service.add(" 4K ").await.unwrap();
        assert_eq!(first.label, "4k");
        let again = service.add("4k").await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(service.list().await.unwrap().len(), 1);

        assert!(matches!(service.add("  ").await, Err(LibraryError::Validation(_))));
    }
}
