use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point picked on the map: human-readable address plus coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(address: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
        }
    }
}

/// Booking lifecycle as tracked by the backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl Default for BookingStatus {
    fn default() -> Self {
        BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Assigned => "assigned",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A rider's transport request between two locations within a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub health_condition: Option<String>,
    pub pickup_location: Location,
    pub drop_location: Location,
    pub from_date: NaiveDateTime,
    pub to_date: NaiveDateTime,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub assigned_ambulance_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

/// Body of `POST /api/bookings`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_condition: Option<String>,
    pub pickup_location: Location,
    pub drop_location: Location,
    pub from_date: NaiveDateTime,
    pub to_date: NaiveDateTime,
}

/// Body of `POST /api/bookings/by-phone`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

/// Body of `PUT /api/admin/bookings/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusUpdate {
    pub status: BookingStatus,
}
