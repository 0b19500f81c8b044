use ambulette_shared::{BookingRequest, Location};
use chrono::NaiveDateTime;

/// Formats accepted for a `datetime-local` style timestamp
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingFormError {
    #[error("Please fill in all required fields ({0} is missing)")]
    MissingField(&'static str),

    #[error("Drop-off time must be after pickup time")]
    InvalidWindow,

    #[error("Please verify your phone number before booking")]
    PhoneNotVerified,

    #[error("Invalid date and time: {0}")]
    InvalidDateTime(String),
}

/// Booking form as the rider fills it in. Nothing is sent until it validates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub health_condition: String,
    pub pickup_location: Option<Location>,
    pub drop_location: Option<Location>,
    pub from_date: Option<NaiveDateTime>,
    pub to_date: Option<NaiveDateTime>,
}

impl BookingForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check required fields, the time window and the phone verification,
    /// in that order, and build the request body.
    pub fn validate(&self, phone_verified: bool) -> Result<BookingRequest, BookingFormError> {
        let name = required(&self.name, "name")?;
        let phone = required(&self.phone, "phone")?;
        let pickup = self
            .pickup_location
            .clone()
            .ok_or(BookingFormError::MissingField("pickup location"))?;
        let drop = self
            .drop_location
            .clone()
            .ok_or(BookingFormError::MissingField("drop location"))?;
        let from_date = self.from_date.ok_or(BookingFormError::MissingField("from date"))?;
        let to_date = self.to_date.ok_or(BookingFormError::MissingField("to date"))?;

        if to_date <= from_date {
            return Err(BookingFormError::InvalidWindow);
        }
        if !phone_verified {
            return Err(BookingFormError::PhoneNotVerified);
        }

        Ok(BookingRequest {
            name,
            phone,
            email: optional(&self.email),
            health_condition: optional(&self.health_condition),
            pickup_location: pickup,
            drop_location: drop,
            from_date,
            to_date,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn required(value: &str, field: &'static str) -> Result<String, BookingFormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(BookingFormError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse `2025-03-01T09:00` (seconds optional)
pub fn parse_datetime_local(value: &str) -> Result<NaiveDateTime, BookingFormError> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| BookingFormError::InvalidDateTime(value.to_string()))
}
