use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque metadata attached to a hosted checkout session and echoed back by
/// the gateway on completion. Only durable identifiers travel here; amounts
/// are resolved from the store at fulfillment time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMetadata {
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub coupon_id: Option<Uuid>,
}

/// Request to open a hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Charge amount in the smallest currency unit
    pub amount_minor: i64,
    pub currency: String,
    /// Human-readable summary shown on the hosted payment page
    pub product_summary: String,
    pub metadata: SessionMetadata,
}

/// A hosted checkout session created at the gateway
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub id: String,
    /// URL of the hosted payment page
    pub url: Option<String>,
}

/// The completed session object extracted from a verified webhook event
#[derive(Debug, Clone)]
pub struct CompletedSession {
    pub session_id: String,
    pub payment_intent_id: Option<String>,
    /// Total charged, in the smallest currency unit
    pub amount_total_minor: i64,
    pub metadata: SessionMetadata,
}

/// A verified webhook event
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutSessionCompleted(CompletedSession),
    /// Any event type fulfillment does not act on
    Ignored(String),
}

/// Gateway failures, categorized so each maps to a distinct user-facing
/// message. None of these are retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Card declined: {0}")]
    CardDeclined(String),

    #[error("Rate limited by payment gateway")]
    RateLimited,

    #[error("Invalid request to payment gateway: {0}")]
    InvalidRequest(String),

    #[error("Payment gateway authentication failed")]
    AuthenticationFailed,

    #[error("Network error communicating with payment gateway: {0}")]
    Connection(String),

    #[error("Webhook signature verification failed")]
    InvalidSignature,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session. Mutates no persisted state.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Verify a webhook payload against its signature header and decode the
    /// event. Verification failure is a hard boundary: the caller must reject
    /// the delivery and change no state.
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, GatewayError>;
}

// ============================================================================
// Event envelope decoding (shared by gateway implementations)
// ============================================================================

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    type_: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: SessionObject,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    payment_intent: Option<String>,
    amount_total: Option<i64>,
    #[serde(default)]
    metadata: RawMetadata,
}

/// Gateway metadata arrives as a string map
#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    user_id: Option<String>,
    order_id: Option<String>,
    coupon_id: Option<String>,
}

/// Decode an already-verified webhook body into a [`WebhookEvent`].
///
/// Only `checkout.session.completed` carries fulfillment data; for that type
/// the session object must hold the `user_id` and `order_id` metadata keys
/// needed to locate the records, or the payload is rejected as malformed.
pub fn decode_event(payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let envelope: EventEnvelope = serde_json::from_slice(payload)
        .map_err(|e| GatewayError::MalformedPayload(e.to_string()))?;

    if envelope.type_ != "checkout.session.completed" {
        tracing::debug!("ignoring webhook event of type {}", envelope.type_);
        return Ok(WebhookEvent::Ignored(envelope.type_));
    }

    let object = envelope.data.object;
    let user_id = parse_metadata_uuid(object.metadata.user_id.as_deref(), "user_id")?;
    let order_id = parse_metadata_uuid(object.metadata.order_id.as_deref(), "order_id")?;
    let coupon_id = match object.metadata.coupon_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            GatewayError::MalformedPayload(format!("invalid coupon_id metadata: {}", raw))
        })?),
    };
    let amount_total_minor = object.amount_total.ok_or_else(|| {
        GatewayError::MalformedPayload("session object missing amount_total".to_string())
    })?;

    Ok(WebhookEvent::CheckoutSessionCompleted(CompletedSession {
        session_id: object.id,
        payment_intent_id: object.payment_intent,
        amount_total_minor,
        metadata: SessionMetadata {
            user_id,
            order_id,
            coupon_id,
        },
    }))
}

fn parse_metadata_uuid(raw: Option<&str>, key: &str) -> Result<Uuid, GatewayError> {
    let raw = raw
        .ok_or_else(|| GatewayError::MalformedPayload(format!("missing {} metadata", key)))?;
    Uuid::parse_str(raw)
        .map_err(|_| GatewayError::MalformedPayload(format!("invalid {} metadata: {}", key, raw)))
}

// ============================================================================
// Mock gateway (deterministic, for tests and local development)
// ============================================================================

/// Signature header the mock accepts
pub const MOCK_SIGNATURE: &str = "t=0,v1=mock";

#[derive(Default)]
pub struct MockGateway {
    recorded: std::sync::Mutex<Vec<CheckoutSessionRequest>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkout session requests seen so far
    pub fn requests(&self) -> Vec<CheckoutSessionRequest> {
        self.recorded
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        if let Ok(mut guard) = self.recorded.lock() {
            guard.push(request.clone());
        }
        let id = format!("cs_mock_{}", request.metadata.order_id.simple());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.mock.local/pay/{}", id)),
            id,
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, GatewayError> {
        if signature_header != MOCK_SIGNATURE {
            return Err(GatewayError::InvalidSignature);
        }
        decode_event(payload)
    }
}
