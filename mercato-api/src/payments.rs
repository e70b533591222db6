use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use mercato_core::payment::{CheckoutSessionRequest, GatewayError, SessionMetadata};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::cart::{MessageResponse, OrderSummaryResponse};
use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PaymentLandingResponse {
    pub publishable_key: String,
    pub order: OrderSummaryResponse,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub url: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/checkout-session", post(create_checkout_session))
        .route("/success", get(payment_success))
        .route("/cancel", get(payment_cancel))
        .route("/{option}", get(payment_landing))
}

/// GET /v1/payments/{option}
///
/// Landing for the hosted-payment page. Requires a billing address already
/// attached to the active order.
async fn payment_landing(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(option): Path<String>,
) -> Result<Json<PaymentLandingResponse>, AppError> {
    let user_id = claims.user_id()?;

    if option != "stripe" && option != "paypal" {
        return Err(AppError::ValidationError(
            "Invalid payment option selected".to_string(),
        ));
    }

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;

    if order.billing_address.is_none() {
        return Err(AppError::ValidationError(
            "You have not added a billing address".to_string(),
        ));
    }

    Ok(Json(PaymentLandingResponse {
        publishable_key: state.publishable_key.clone(),
        order: OrderSummaryResponse::from(&order),
    }))
}

/// POST /v1/payments/checkout-session
///
/// Opens a hosted checkout session for the active order's total. Nothing is
/// persisted here; fulfillment happens when the gateway's webhook confirms
/// the completed session.
async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let user_id = claims.user_id()?;

    let order = state
        .orders
        .active_order(user_id)
        .await.map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("You do not have an active order".to_string()))?;

    let amount_minor = (order.total() * Decimal::ONE_HUNDRED)
        .trunc()
        .to_i64()
        .ok_or_else(|| {
            AppError::InternalServerError(format!("order total out of range: {}", order.total()))
        })?;

    let request = CheckoutSessionRequest {
        amount_minor,
        currency: "usd".to_string(),
        product_summary: format!("Order of {} item(s)", order.items.len()),
        metadata: SessionMetadata {
            user_id,
            order_id: order.id,
            coupon_id: order.coupon.as_ref().map(|c| c.id),
        },
    };

    let session = state
        .gateway
        .create_checkout_session(&request)
        .await
        .map_err(gateway_error_to_app)?;

    tracing::info!(order_id = %order.id, session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Each gateway failure category surfaces as its own user-facing message.
/// None are retried.
fn gateway_error_to_app(err: GatewayError) -> AppError {
    match err {
        GatewayError::CardDeclined(message) => AppError::ValidationError(message),
        GatewayError::RateLimited => AppError::ValidationError("Rate limit error".to_string()),
        GatewayError::InvalidRequest(_) => {
            AppError::ValidationError("Invalid parameters".to_string())
        }
        GatewayError::AuthenticationFailed => {
            AppError::ValidationError("Not authenticated".to_string())
        }
        GatewayError::Connection(_) => AppError::ValidationError("Network error".to_string()),
        GatewayError::Gateway(_) => AppError::ValidationError(
            "Something went wrong. You were not charged. Please try again.".to_string(),
        ),
        other => {
            tracing::error!("unexpected gateway failure: {}", other);
            AppError::ValidationError(
                "A serious error occurred. We have been notified.".to_string(),
            )
        }
    }
}

/// GET /v1/payments/success
async fn payment_success() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Your order was successful!".to_string(),
    })
}

/// GET /v1/payments/cancel
async fn payment_cancel() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Your payment was cancelled".to_string(),
    })
}
