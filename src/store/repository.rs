use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::filter::RecordFilter;
use super::record::{NewRecord, StoredRecord, UpdatePatch};
use super::StoreError;

const RECORD_COLUMNS: &str =
    "id, collection, organization_id, project_slug, key, created_at, updated_at, doc";

/// Executes single collection operations against the `records` table.
/// Every method takes a tenant-scoped filter or organization id; there is
/// no way to reach another organization's rows through this type.
pub struct Repository {
    collection: String,
    pool: PgPool,
}

impl Repository {
    pub fn new(collection: impl Into<String>, pool: PgPool) -> Result<Self, StoreError> {
        let collection = collection.into();
        Self::validate_collection_name(&collection)?;
        Ok(Self { collection, pool })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Find all records matching the filter, newest first
    pub async fn find(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM records WHERE collection = $1 AND {} ORDER BY created_at DESC",
            RECORD_COLUMNS,
            filter.where_sql(2)
        );

        let mut query = sqlx::query_as::<_, StoredRecord>(&sql)
            .bind(&self.collection)
            .bind(filter.organization_id);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(slug) = &filter.project_slug {
            query = query.bind(slug);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    /// Insert one normalized record with its allocated key (if any)
    pub async fn insert(
        &self,
        organization_id: Uuid,
        record: &NewRecord,
        key: Option<i64>,
    ) -> Result<Uuid, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO records (collection, organization_id, project_slug, key, created_at, doc)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&self.collection)
        .bind(organization_id)
        .bind(record.project_slug.as_deref())
        .bind(key)
        .bind(Utc::now())
        .bind(Json(&record.doc))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Merge a patch into one record within the organization. `created_at`
    /// is untouched, `updated_at` is set server-side. Returns None when no
    /// record matched.
    pub async fn update(
        &self,
        organization_id: Uuid,
        patch: &UpdatePatch,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let sql = format!(
            r#"
            UPDATE records
            SET doc = doc || $1, updated_at = $2
            WHERE collection = $3 AND organization_id = $4 AND id = $5
            RETURNING {}
            "#,
            RECORD_COLUMNS
        );

        let updated = sqlx::query_as::<_, StoredRecord>(&sql)
            .bind(Json(&patch.doc))
            .bind(Utc::now())
            .bind(&self.collection)
            .bind(organization_id)
            .bind(patch.id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(updated)
    }

    /// Delete every listed record belonging to the organization and return
    /// how many rows actually went away
    pub async fn delete_many(
        &self,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM records WHERE collection = $1 AND organization_id = $2 AND id = ANY($3)",
        )
        .bind(&self.collection)
        .bind(organization_id)
        .bind(ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    fn validate_collection_name(name: &str) -> Result<(), StoreError> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) if first.is_ascii_lowercase() => {
                chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            }
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(StoreError::InvalidCollection(name.to_string()))
        }
    }
}
