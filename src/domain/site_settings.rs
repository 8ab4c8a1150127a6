//! Site-wide settings loaded once per process and passed explicitly.

use serde::{Deserialize, Serialize};

/// Operator-editable site configuration.
///
/// Stored as a single row; when the row does not exist yet it is created
/// from [`SiteSettings::default`] on first access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Brand name used in payment descriptions.
    pub site_name: String,
    /// Support phone shown next to failed-payment references.
    pub support_phone: String,
    /// When on, new checkouts are refused.
    pub maintenance_mode: bool,
    /// Message returned while in maintenance.
    pub maintenance_message: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Mahboob".to_string(),
            support_phone: String::new(),
            maintenance_mode: false,
            maintenance_message:
                "The site is being updated. Please try again in a little while.".to_string(),
        }
    }
}
