pub mod auth;
pub mod booking;
pub mod fleet;
pub mod otp;
pub mod resource;
pub mod staff;

pub use auth::*;
pub use booking::*;
pub use fleet::*;
pub use otp::*;
pub use resource::AdminResource;
pub use staff::*;
