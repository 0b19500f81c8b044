pub mod cli;
pub mod dashboard;
pub mod error;
pub mod lookup;
pub mod reports;
pub mod submission;
pub mod verification;

pub use dashboard::{AdminDashboard, DashboardData};
pub use error::AppError;
pub use lookup::BookingLookup;
pub use reports::FleetReport;
pub use submission::BookingSubmission;
pub use verification::PhoneVerification;
