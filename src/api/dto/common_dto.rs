//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::ledger::Page;

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl PaginationMeta {
    /// Metadata for `page` out of `total` matches.
    #[must_use]
    pub fn new(page: Page, total: u64) -> Self {
        let per_page = u64::from(page.per_page.max(1));
        Self {
            page: page.page,
            per_page: page.per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_per_page() -> u32 {
    20
}

/// Clamps a requested page to `page >= 1` and `1 <= per_page <= 100`.
#[must_use]
pub fn clamp_page(page: u32, per_page: u32) -> Page {
    Page {
        page: page.max(1),
        per_page: per_page.clamp(1, 100),
    }
}

impl PaginationParams {
    /// Clamps `per_page` to the allowed maximum of 100.
    #[must_use]
    pub fn clamped(&self) -> Page {
        clamp_page(self.page, self.per_page)
    }
}
