pub mod admin;
pub mod booking;
pub mod gateway;
pub mod notice;
pub mod otp;

pub use admin::{AdminFormError, DraftCheck};
pub use booking::{BookingForm, BookingFormError};
pub use gateway::{BookingGateway, GatewayError, GatewayResult, OtpGateway};
pub use notice::{Notice, NoticeLevel, NoticeLog, Notifier, TracingNotifier};
pub use otp::{
    OtpError, OtpPhase, OtpPolicy, OtpSession, PendingRequest, SendFailureMode, SendOutcome,
    VerifyOutcome,
};
