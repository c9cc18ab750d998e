use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::forms::FormMaster;
use crate::middleware::Session;
use crate::store::filter::RecordFilter;
use crate::store::record::{parse_id_list, NewRecord, StoredRecord, UpdatePatch};
use crate::store::repository::Repository;
use crate::store::sequence;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    /// Narrow the result set to one project
    pub slug: Option<String>,
    /// Narrow the result set to one document
    pub id: Option<String>,
}

/// GET /api/:collection - tenant-scoped list, newest first
pub async fn get(
    Path(collection): Path<String>,
    Query(query): Query<RecordQuery>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<Value>> {
    let filter = filter_from(&session, &query)?;
    let repository = Repository::new(&collection, state.store.pool().clone())?;

    let records = repository.find(&filter).await?;
    Ok(Json(to_api_array(records)))
}

/// POST /api/:collection - create one record, respond with the refreshed
/// list view so the caller never has to re-fetch
pub async fn post(
    Path(collection): Path<String>,
    Query(query): Query<RecordQuery>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<Value>,
) -> ApiResult<Vec<Value>> {
    let filter = filter_from(&session, &query)?;
    let repository = Repository::new(&collection, state.store.pool().clone())?;

    let record = NewRecord::from_api_input(payload, &session)?;

    validate_against_master(&state, &session, &collection, &record).await?;

    // Allocate before insert so a counter failure aborts the whole create
    let key = match &record.key_name {
        Some(name) => Some(
            sequence::next_sequence_value(
                state.store.pool(),
                session.organization_id,
                name,
                record.project_slug.as_deref(),
            )
            .await?,
        ),
        None => None,
    };

    repository.insert(session.organization_id, &record, key).await?;

    let records = repository.find(&filter).await?;
    Ok(Json(to_api_array(records)))
}

/// PUT /api/:collection - update one record by `_id` from the body
pub async fn put(
    Path(collection): Path<String>,
    Query(query): Query<RecordQuery>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<Value>,
) -> ApiResult<Vec<Value>> {
    let filter = filter_from(&session, &query)?;
    let repository = Repository::new(&collection, state.store.pool().clone())?;

    let patch = UpdatePatch::from_api_input(payload)?;

    let updated = repository.update(session.organization_id, &patch).await?;
    if updated.is_none() {
        return Err(ApiError::not_found(format!(
            "Record {} not found in {}",
            patch.id, collection
        )));
    }

    let records = repository.find(&filter).await?;
    Ok(Json(to_api_array(records)))
}

/// DELETE /api/:collection - bulk delete by identifier list
pub async fn delete(
    Path(collection): Path<String>,
    Query(query): Query<RecordQuery>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<Value>,
) -> ApiResult<Vec<Value>> {
    let filter = filter_from(&session, &query)?;
    let repository = Repository::new(&collection, state.store.pool().clone())?;

    let ids = parse_id_list(&payload)
        .map_err(|_| ApiError::bad_request("Invalid IDs format"))?;

    let deleted = repository.delete_many(session.organization_id, &ids).await?;
    if deleted == 0 {
        let attempted: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        return Err(ApiError::not_found_with("Nothing deleted", json!(attempted)));
    }

    let records = repository.find(&filter).await?;
    Ok(Json(to_api_array(records)))
}

fn filter_from(session: &Session, query: &RecordQuery) -> Result<RecordFilter, ApiError> {
    // Everyone is organization-scoped; the role travels in the session but
    // does not narrow visibility further (pending product decision).
    Ok(RecordFilter::from_params(
        session.organization_id,
        query.id.as_deref(),
        query.slug.clone(),
    )?)
}

fn to_api_array(records: Vec<StoredRecord>) -> Vec<Value> {
    records.iter().map(StoredRecord::to_api_value).collect()
}

/// If the collection has a companion master (e.g. `teamchartermaster` for
/// `teamcharter`) with a field configuration for this organization, the
/// body must satisfy it
async fn validate_against_master(
    state: &AppState,
    session: &Session,
    collection: &str,
    record: &NewRecord,
) -> Result<(), ApiError> {
    if collection.ends_with("master") {
        return Ok(());
    }

    let master_repo = Repository::new(
        format!("{}master", collection),
        state.store.pool().clone(),
    )?;
    let masters = master_repo
        .find(&RecordFilter::organization(session.organization_id))
        .await?;

    let Some(master) = masters.first().and_then(|m| FormMaster::from_doc(&m.doc.0)) else {
        return Ok(());
    };

    master
        .validate(&record.doc)
        .map_err(|field_errors| ApiError::validation_error("Validation failed", Some(field_errors)))
}
