use ambulette_core::{AdminFormError, BookingFormError, GatewayError, OtpError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    BookingForm(#[from] BookingFormError),

    #[error(transparent)]
    AdminForm(#[from] AdminFormError),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Phone number must be verified first")]
    NotVerified,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Caught before any request left the process
    pub fn is_local(&self) -> bool {
        !matches!(self, AppError::Gateway(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;
