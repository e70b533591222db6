use axum::{
    extract::State,
    routing::post,
    Json, Router,
};
use mercato_order::Refund;
use serde::Deserialize;

use crate::cart::MessageResponse;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub ref_code: String,
    pub message: String,
    pub email: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(request_refund))
}

/// POST /v1/refunds
///
/// Records a refund request against a fulfilled order. Processing happens
/// out of band; nothing is refunded automatically.
async fn request_refund(
    State(state): State<AppState>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let order = state
        .orders
        .get_order_by_ref_code(&request.ref_code)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("This order does not exist".to_string()))?;

    state.orders.set_refund_requested(order.id).await.map_err(AppError::from_boxed)?;

    let refund = Refund::new(order.id, request.message, request.email);
    state.refunds.create_refund(&refund).await.map_err(AppError::from_boxed)?;

    tracing::info!(order_id = %order.id, "refund requested");
    Ok(Json(MessageResponse {
        message: "Your request was received.".to_string(),
    }))
}
