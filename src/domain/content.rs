//! Catalog content referenced by purchases.
//!
//! The catalog itself is owned by another part of the platform. This module
//! models the small slice of it the checkout flow needs: which kind of item
//! it is, whether it is on sale, what it costs, and where the buyer lands
//! once access is granted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Amount;

/// Kind of purchasable content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// An e-book.
    Book,
    /// A podcast episode.
    Podcast,
    /// A video course.
    Course,
}

impl ContentType {
    /// All content types, in display order.
    pub const ALL: [Self; 3] = [Self::Book, Self::Podcast, Self::Course];

    /// Returns the wire / storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Podcast => "podcast",
            Self::Course => "course",
        }
    }

    /// Returns the catalog table holding items of this type.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Book => "books",
            Self::Podcast => "podcasts",
            Self::Course => "courses",
        }
    }

    const fn path_segment(self) -> &'static str {
        self.table()
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Book => "Book",
            Self::Podcast => "Podcast",
            Self::Course => "Course",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised content type string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown content type: {0:?}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(Self::Book),
            "podcast" => Ok(Self::Podcast),
            "course" => Ok(Self::Course),
            other => Err(UnknownContentType(other.to_string())),
        }
    }
}

/// How an item is offered to readers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Open to everyone, no purchase needed.
    #[default]
    Free,
    /// Sold individually.
    Paid,
    /// Reserved for members; still purchasable individually.
    Premium,
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            "premium" => Ok(Self::Premium),
            other => Err(format!("unknown access type: {other:?}")),
        }
    }
}

/// Sale-relevant fields shared by every catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Catalog primary key.
    pub id: i64,
    /// Display title.
    pub title: String,
    /// URL slug of the detail page.
    pub slug: String,
    /// List price before discount.
    pub price: Amount,
    /// Discount in percent; values above 100 make the item free.
    pub discount_percent: u16,
    /// Free / paid / premium.
    pub access_type: AccessType,
    /// Whether the item is published.
    pub is_active: bool,
}

impl Listing {
    /// Price after applying the discount, rounded down to a whole Toman.
    #[must_use]
    pub fn final_price(&self) -> Amount {
        let keep = u128::from(100_u16.saturating_sub(self.discount_percent));
        let discounted = u128::from(self.price.toman()) * keep / 100;
        Amount::new(u64::try_from(discounted).unwrap_or(u64::MAX))
    }
}

/// A catalog item resolved once at the system boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogItem {
    /// A book listing.
    Book(Listing),
    /// A podcast listing.
    Podcast(Listing),
    /// A course listing.
    Course(Listing),
}

impl CatalogItem {
    /// Wraps a listing in the variant matching `content_type`.
    #[must_use]
    pub fn new(content_type: ContentType, listing: Listing) -> Self {
        match content_type {
            ContentType::Book => Self::Book(listing),
            ContentType::Podcast => Self::Podcast(listing),
            ContentType::Course => Self::Course(listing),
        }
    }

    /// Returns the shared listing fields.
    #[must_use]
    pub const fn listing(&self) -> &Listing {
        match self {
            Self::Book(l) | Self::Podcast(l) | Self::Course(l) => l,
        }
    }

    /// Returns the content type of this item.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        match self {
            Self::Book(_) => ContentType::Book,
            Self::Podcast(_) => ContentType::Podcast,
            Self::Course(_) => ContentType::Course,
        }
    }

    /// Catalog primary key.
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.listing().id
    }

    /// Whether the item may be sold.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.listing().is_active
    }

    /// Price the buyer pays today.
    #[must_use]
    pub fn final_price(&self) -> Amount {
        self.listing().final_price()
    }

    /// Returns `true` when the item is readable without a purchase.
    #[must_use]
    pub fn is_open_access(&self) -> bool {
        self.listing().access_type == AccessType::Free
    }

    /// Site-relative URL of the item's detail page.
    #[must_use]
    pub fn detail_url(&self) -> String {
        format!(
            "/{}/{}/",
            self.content_type().path_segment(),
            self.listing().slug
        )
    }

    /// Description sent to the payment provider.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "{} purchase: {}",
            self.content_type().label(),
            self.listing().title
        )
    }
}
