use async_trait::async_trait;
use hmac::{Hmac, Mac};
use mercato_core::payment::{
    decode_event, CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway,
    WebhookEvent,
};
use serde::Deserialize;
use sha2::Sha256;

use crate::app_config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Tolerance for the signed timestamp, guarding against replayed deliveries
const SIGNATURE_TOLERANCE_SECONDS: i64 = 300;

/// Stripe hosted-checkout client. Sessions are created over the form-encoded
/// HTTP API; webhook deliveries are verified with the `t=...,v1=...` HMAC
/// signature scheme before any event is decoded.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }

    fn verify_signature(&self, payload: &[u8], signature_header: &str) -> Result<(), GatewayError> {
        let mut timestamp: Option<i64> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse().ok(),
                Some(("v1", value)) => candidates.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(GatewayError::InvalidSignature)?;
        if candidates.is_empty() {
            return Err(GatewayError::InvalidSignature);
        }

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age.abs() > SIGNATURE_TOLERANCE_SECONDS {
            return Err(GatewayError::InvalidSignature);
        }

        for candidate in candidates {
            let Ok(expected) = hex::decode(candidate) else {
                continue;
            };
            let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
                .map_err(|_| GatewayError::InvalidSignature)?;
            mac.update(format!("{}.", timestamp).as_bytes());
            mac.update(payload);
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(GatewayError::InvalidSignature)
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    type_: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let amount_minor = request.amount_minor.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("success_url", &self.success_url),
            ("cancel_url", &self.cancel_url),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", &self.currency),
            ("line_items[0][price_data][unit_amount]", &amount_minor),
            (
                "line_items[0][price_data][product_data][name]",
                &request.product_summary,
            ),
        ];

        let user_id = request.metadata.user_id.to_string();
        let order_id = request.metadata.order_id.to_string();
        params.push(("metadata[user_id]", &user_id));
        params.push(("metadata[order_id]", &order_id));
        let coupon_id = request.metadata.coupon_id.map(|id| id.to_string());
        if let Some(coupon_id) = &coupon_id {
            params.push(("metadata[coupon_id]", coupon_id));
        }

        let response = self
            .http
            .post(CHECKOUT_SESSIONS_URL)
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let session: SessionResponse = response
                .json()
                .await
                .map_err(|e| GatewayError::Gateway(e.to_string()))?;
            return Ok(CheckoutSession {
                id: session.id,
                url: session.url,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|r| r.error)
            .unwrap_or(ApiError {
                type_: None,
                message: None,
            });
        let message = error.message.unwrap_or_else(|| status.to_string());

        match (status.as_u16(), error.type_.as_deref()) {
            (_, Some("card_error")) | (402, _) => Err(GatewayError::CardDeclined(message)),
            (429, _) => Err(GatewayError::RateLimited),
            (400, _) => Err(GatewayError::InvalidRequest(message)),
            (401, _) => Err(GatewayError::AuthenticationFailed),
            _ => Err(GatewayError::Gateway(message)),
        }
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        self.verify_signature(payload, signature_header)?;
        decode_event(payload)
    }
}
