use async_trait::async_trait;
use ambulette_shared::{Booking, BookingRequest, SendOtpResponse};

/// Failure talking to the booking backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Backend rejected request with status {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Admin session missing or expired")]
    Unauthenticated,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Backend-supplied `detail`, if the backend sent one
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Message to show the user: the backend detail when present, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        self.detail().unwrap_or(fallback).to_string()
    }

    /// `rejected` for a refusal without detail, `unreachable` when the
    /// request never got a usable answer
    pub fn describe(&self, rejected: &str, unreachable: &str) -> String {
        match self {
            GatewayError::Rejected { .. } => self.user_message(rejected),
            GatewayError::Unauthenticated => "Session expired, please log in again".to_string(),
            GatewayError::Transport(_) | GatewayError::Decode(_) => unreachable.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthenticated) || self.status() == Some(401)
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// One-time-passcode dispatch and validation
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Ask the backend to text a fresh code to `phone`
    async fn send_otp(&self, phone: &str) -> GatewayResult<SendOtpResponse>;

    /// Check `code` against the one issued for `phone`
    async fn verify_otp(&self, phone: &str, code: &str) -> GatewayResult<()>;
}

/// Public booking endpoints
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn create_booking(&self, request: &BookingRequest) -> GatewayResult<Booking>;

    async fn bookings_by_phone(&self, phone: &str) -> GatewayResult<Vec<Booking>>;
}
