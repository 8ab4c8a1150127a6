//! The single-row `site_settings` table.

use sqlx::PgPool;

use crate::domain::SiteSettings;

/// Loads site settings, creating row 1 with defaults if it is missing.
///
/// # Errors
///
/// Returns the underlying [`sqlx::Error`] on database failure.
pub async fn load_site_settings(pool: &PgPool) -> Result<SiteSettings, sqlx::Error> {
    let defaults = SiteSettings::default();
    sqlx::query(
        "INSERT INTO site_settings (id, site_name, support_phone, maintenance_mode, maintenance_message) \
         VALUES (1, $1, $2, $3, $4) ON CONFLICT (id) DO NOTHING",
    )
    .bind(&defaults.site_name)
    .bind(&defaults.support_phone)
    .bind(defaults.maintenance_mode)
    .bind(&defaults.maintenance_message)
    .execute(pool)
    .await?;

    let (site_name, support_phone, maintenance_mode, maintenance_message) =
        sqlx::query_as::<_, (String, String, bool, String)>(
            "SELECT site_name, support_phone, maintenance_mode, maintenance_message \
             FROM site_settings WHERE id = 1",
        )
        .fetch_one(pool)
        .await?;

    Ok(SiteSettings {
        site_name,
        support_phone,
        maintenance_mode,
        maintenance_message,
    })
}
