pub mod payment;
pub mod refcode;
pub mod repository;

pub use payment::{
    CheckoutSession, CheckoutSessionRequest, CompletedSession, GatewayError, MockGateway,
    PaymentGateway, SessionMetadata, WebhookEvent,
};
