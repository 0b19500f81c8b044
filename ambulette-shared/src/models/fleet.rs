use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AmbulanceStatus {
    Available,
    InService,
    Maintenance,
}

impl Default for AmbulanceStatus {
    fn default() -> Self {
        AmbulanceStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ambulance {
    pub id: String,
    pub license_plate: String,
    pub model: String,
    pub capacity: u32,
    #[serde(default)]
    pub status: AmbulanceStatus,
}

/// Create/update body for an ambulance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceDraft {
    pub license_plate: String,
    pub model: String,
    pub capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AmbulanceStatus>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    OnDuty,
    OffDuty,
}

impl Default for DriverStatus {
    fn default() -> Self {
        DriverStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub license_number: String,
    #[serde(default)]
    pub status: DriverStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDraft {
    pub name: String,
    pub phone: String,
    pub license_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DriverStatus>,
}

/// A driver paired with a vehicle for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverAssignment {
    pub id: String,
    pub driver_id: String,
    pub ambulance_id: String,
    pub date: NaiveDate,
}

/// Body of `POST /api/admin/assign-driver`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: String,
    pub ambulance_id: String,
    pub date: NaiveDate,
}

/// Body of `POST /api/admin/assign-ambulance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignAmbulanceRequest {
    pub booking_id: String,
    pub ambulance_id: String,
}
