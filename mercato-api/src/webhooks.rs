use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use mercato_core::payment::{CompletedSession, GatewayError, WebhookEvent};
use mercato_core::refcode;
use mercato_order::Payment;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// POST /v1/webhooks/stripe
///
/// The gateway's delivery endpoint. The raw body is verified against the
/// `Stripe-Signature` header before anything is decoded; a failed check is a
/// 400 with no state change. Fulfillment is idempotent on the charge id, so
/// redelivered events are acknowledged without effect.
async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, AppError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            AppError::ValidationError("Missing Stripe-Signature header".to_string())
        })?;

    let event = state
        .gateway
        .verify_webhook(&body, signature)
        .map_err(|err| match err {
            GatewayError::InvalidSignature | GatewayError::MalformedPayload(_) => {
                tracing::warn!("rejected webhook delivery: {}", err);
                AppError::ValidationError(err.to_string())
            }
            other => AppError::InternalServerError(other.to_string()),
        })?;

    match event {
        WebhookEvent::CheckoutSessionCompleted(session) => {
            fulfill_order(&state, session).await?;
        }
        WebhookEvent::Ignored(type_) => {
            tracing::debug!("acknowledged webhook event of type {}", type_);
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

async fn fulfill_order(state: &AppState, session: CompletedSession) -> Result<(), AppError> {
    let charge_id = session
        .payment_intent_id
        .clone()
        .unwrap_or_else(|| session.session_id.clone());

    // 1. Idempotence: a charge already recorded means this is a redelivery
    if state
        .payments
        .find_by_charge_id(&charge_id)
        .await
        .map_err(AppError::from_boxed)?
        .is_some()
    {
        tracing::info!(%charge_id, "charge already recorded, skipping");
        return Ok(());
    }

    // 2. Locate the order named by the session metadata
    let order = state
        .orders
        .get_order(session.metadata.order_id)
        .await
        .map_err(AppError::from_boxed)?
        .ok_or_else(|| AppError::NotFoundError("Order not found".to_string()))?;

    if order.ordered {
        tracing::info!(order_id = %order.id, "order already fulfilled, skipping");
        return Ok(());
    }

    // 3. Record the charge in major units. Two deliveries of the same event
    // can both pass the check above; the charge_id unique constraint decides
    // the winner, and the loser acknowledges like any other redelivery.
    let amount = Decimal::new(session.amount_total_minor, 2);
    let payment = Payment::new(charge_id, session.metadata.user_id, amount);
    if let Err(err) = state.payments.create_payment(&payment).await {
        if state
            .payments
            .find_by_charge_id(&payment.charge_id)
            .await
            .map_err(AppError::from_boxed)?
            .is_some()
        {
            tracing::info!(charge_id = %payment.charge_id, "charge recorded concurrently, skipping");
            return Ok(());
        }
        return Err(AppError::from_boxed(err));
    }

    // 4. Close the order and its lines under a fresh reference code
    let ref_code = refcode::generate();
    state
        .orders
        .mark_fulfilled(order.id, payment.id, &ref_code)
        .await
        .map_err(AppError::from_boxed)?;

    tracing::info!(
        order_id = %order.id,
        payment_id = %payment.id,
        %ref_code,
        "order fulfilled"
    );
    Ok(())
}
