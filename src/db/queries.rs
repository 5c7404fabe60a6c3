use sqlx::{Pool, Sqlite};

use crate::db::models::{License, NewLicense};

pub async fn get_license_by_key(
    pool: &Pool<Sqlite>,
    key: &str,
) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn get_license_by_event_id(
    pool: &Pool<Sqlite>,
    event_id: &str,
) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as::<_, License>("SELECT * FROM licenses WHERE stripe_event_id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

/// Inserts a new license row. Uniqueness of both the key and the payment
/// event id is enforced by the table's UNIQUE constraints; a violation
/// surfaces as a database error.
pub async fn insert_license(
    pool: &Pool<Sqlite>,
    license: &NewLicense<'_>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO licenses (key, phone, stripe_event_id, metadata) VALUES (?, ?, ?, ?)",
    )
    .bind(license.key)
    .bind(license.phone)
    .bind(license.stripe_event_id)
    .bind(license.metadata)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Binds a device to an unactivated license. The `activated = 0` guard
/// makes this a single-row conditional update, so concurrent instances
/// cannot both win; returns whether a row changed.
pub async fn activate_license(
    pool: &Pool<Sqlite>,
    license_id: i64,
    device_id: &str,
    metadata: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE licenses SET activated = 1, device_id = ?, activated_at = datetime('now'),
         metadata = ? WHERE license_id = ? AND activated = 0",
    )
    .bind(device_id)
    .bind(metadata)
    .bind(license_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
