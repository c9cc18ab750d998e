use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::middleware::Session;

/// GET /api/auth/whoami - echo the authenticated session context
pub async fn whoami(Extension(session): Extension<Session>) -> ApiResult<Value> {
    Ok(Json(json!({
        "_id": session.user_id,
        "organizationId": session.organization_id,
        "organization": session.organization,
        "email": session.email,
        "role": session.role,
    })))
}
