//! Catalog lookups against the `books`, `podcasts`, and `courses` tables.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::catalog::{CatalogError, ContentCatalog};
use crate::domain::{AccessType, Amount, CatalogItem, ContentType, Listing};

type ListingRow = (i64, String, String, i64, i32, String, bool);

/// Read-only catalog backed by the content tables.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    /// Creates a catalog over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn listing_from_row(row: ListingRow) -> Result<Listing, CatalogError> {
    let (id, title, slug, price, discount_percent, access_type, is_active) = row;
    Ok(Listing {
        id,
        title,
        slug,
        price: u64::try_from(price)
            .map(Amount::new)
            .map_err(|_| CatalogError(format!("item {id} has a negative price")))?,
        discount_percent: u16::try_from(discount_percent.clamp(0, 100)).unwrap_or(0),
        access_type: access_type.parse::<AccessType>().map_err(CatalogError)?,
        is_active,
    })
}

#[async_trait]
impl ContentCatalog for PgCatalog {
    async fn lookup(
        &self,
        content_type: ContentType,
        object_id: i64,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        // Table names come from a closed enum, never from input.
        let sql = format!(
            "SELECT id, title, slug, price, discount_percent, access_type, is_active \
             FROM {} WHERE id = $1",
            content_type.table()
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(object_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(listing_from_row)
            .transpose()
            .map(|listing| listing.map(|l| CatalogItem::new(content_type, l)))
    }
}
