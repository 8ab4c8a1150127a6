//! Content catalog lookup.
//!
//! The checkout flow treats the catalog as an authoritative price oracle
//! consulted once per checkout start. The item kind is resolved here, at
//! the boundary, into a [`CatalogItem`] variant.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{CatalogItem, ContentType, Listing};

/// Catalog lookup failure.
#[derive(Debug, thiserror::Error)]
#[error("catalog unavailable: {0}")]
pub struct CatalogError(pub String);

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        Self(e.to_string())
    }
}

/// Read-only access to purchasable content.
#[async_trait]
pub trait ContentCatalog: Send + Sync + fmt::Debug {
    /// Looks up an item by kind and id, active or not.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the backing store cannot be read.
    async fn lookup(
        &self,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<Option<CatalogItem>, CatalogError>;
}

/// Catalog held in memory; used for local development and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<HashMap<(ContentType, i64), CatalogItem>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    pub async fn upsert(&self, content_type: ContentType, listing: Listing) {
        let key = (content_type, listing.id);
        self.items
            .write()
            .await
            .insert(key, CatalogItem::new(content_type, listing));
    }
}

#[async_trait]
impl ContentCatalog for InMemoryCatalog {
    async fn lookup(
        &self,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        Ok(self
            .items
            .read()
            .await
            .get(&(content_type, object_id))
            .cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{AccessType, Amount};

    #[tokio::test]
    async fn lookup_is_keyed_by_kind_and_id() {
        let catalog = InMemoryCatalog::new();
        catalog
            .upsert(
                ContentType::Podcast,
                Listing {
                    id: 3,
                    title: "Episode 1".to_string(),
                    slug: "episode-1".to_string(),
                    price: Amount::new(10_000),
                    discount_percent: 0,
                    access_type: AccessType::Paid,
                    is_active: true,
                },
            )
            .await;

        let Ok(Some(item)) = catalog.lookup(ContentType::Podcast, 3).await else {
            panic!("podcast 3 should exist");
        };
        assert_eq!(item.content_type(), ContentType::Podcast);
        assert!(matches!(catalog.lookup(ContentType::Book, 3).await, Ok(None)));
    }
}
