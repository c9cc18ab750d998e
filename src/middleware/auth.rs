use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::session::Claims;

/// Authenticated session context extracted from the bearer token.
/// Downstream handlers scope every store operation by `organization_id`.
#[derive(Clone, Debug)]
pub struct Session {
    pub organization_id: Uuid,
    pub organization: String,
    pub email: String,
    pub role: String,
    pub user_id: Uuid,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            organization_id: claims.organization_id,
            organization: claims.organization,
            email: claims.email,
            role: claims.role,
            user_id: claims.user_id,
        }
    }
}

/// Session gate: rejects requests without a valid session before any store
/// work happens, and injects the session context for downstream handlers.
pub async fn session_gate_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<serde_json::Value>)> {
    let token = extract_bearer_token(&headers).map_err(unauthenticated)?;

    let claims = validate_jwt(&token).map_err(unauthenticated)?;

    let session = Session::from(claims);
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn unauthenticated(detail: String) -> (StatusCode, Json<serde_json::Value>) {
    tracing::debug!("Rejected unauthenticated request: {}", detail);
    let api_error = ApiError::unauthorized("Not Authenticated!");
    (
        StatusCode::from_u16(api_error.status_code()).unwrap_or(StatusCode::UNAUTHORIZED),
        Json(api_error.to_json()),
    )
}

/// Extract the token from an `Authorization: Bearer ...` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate the token and extract session claims
fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid token: {}", e))?;

    Ok(token_data.claims)
}
