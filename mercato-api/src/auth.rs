use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/guest", post(login_guest))
}

/// POST /v1/auth/guest
///
/// Issues a customer token with a fresh user id. The id anchors the caller's
/// cart and orders for the token's lifetime.
async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let user_id = Uuid::new_v4();
    let claims = CustomerClaims {
        sub: user_id.to_string(),
        role: "CUSTOMER".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(AuthResponse { token, user_id }))
}
