use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;

/// Atomically allocate the next counter value for an
/// (organization, key name, project) scope.
///
/// The upsert performs find-and-increment in a single statement, so two
/// concurrent creates in the same scope can never observe the same value
/// and no value is ever skipped. A store failure propagates and fails the
/// whole creation rather than assigning a guessed key.
pub async fn next_sequence_value(
    pool: &PgPool,
    organization_id: Uuid,
    key_name: &str,
    project_slug: Option<&str>,
) -> Result<i64, StoreError> {
    // Project slug is part of the primary key; normalize "no project" to ''
    let slug = project_slug.unwrap_or("");

    let (value,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO sequence_counters (organization_id, key_name, project_slug, value)
        VALUES ($1, $2, $3, 1)
        ON CONFLICT (organization_id, key_name, project_slug)
        DO UPDATE SET value = sequence_counters.value + 1
        RETURNING value
        "#,
    )
    .bind(organization_id)
    .bind(key_name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(value)
}
