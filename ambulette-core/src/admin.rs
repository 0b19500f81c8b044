use ambulette_shared::{
    AmbulanceDraft, AssignAmbulanceRequest, AssignDriverRequest, AttendanceDraft, DriverDraft,
    EmployeeDraft, ExpenseDraft,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminFormError {
    #[error("Please fill in all required fields ({0} is missing)")]
    MissingField(&'static str),

    #[error("Capacity must be at least 1")]
    InvalidCapacity,

    #[error("Expense amount must be positive")]
    InvalidAmount,

    #[error("Check-out must be after check-in")]
    InvalidShift,

    #[error("Driver phone number must be verified with OTP first")]
    PhoneNotVerified,
}

/// Client-side check run before an admin form is submitted
pub trait DraftCheck {
    fn check(&self) -> Result<(), AdminFormError>;
}

fn present(value: &str, field: &'static str) -> Result<(), AdminFormError> {
    if value.trim().is_empty() {
        Err(AdminFormError::MissingField(field))
    } else {
        Ok(())
    }
}

impl DraftCheck for AmbulanceDraft {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.license_plate, "license plate")?;
        present(&self.model, "model")?;
        if self.capacity == 0 {
            return Err(AdminFormError::InvalidCapacity);
        }
        Ok(())
    }
}

impl DraftCheck for DriverDraft {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.name, "name")?;
        present(&self.phone, "phone")?;
        present(&self.license_number, "license number")
    }
}

impl DraftCheck for AssignDriverRequest {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.driver_id, "driver")?;
        present(&self.ambulance_id, "ambulance")
    }
}

impl DraftCheck for AssignAmbulanceRequest {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.booking_id, "booking")?;
        present(&self.ambulance_id, "ambulance")
    }
}

impl DraftCheck for EmployeeDraft {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.name, "name")?;
        present(&self.phone, "phone")?;
        present(&self.role, "role")
    }
}

impl DraftCheck for AttendanceDraft {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.employee_id, "employee")?;
        match (self.check_in, self.check_out) {
            (Some(start), Some(end)) if end <= start => Err(AdminFormError::InvalidShift),
            (None, Some(_)) => Err(AdminFormError::MissingField("check-in")),
            _ => Ok(()),
        }
    }
}

impl DraftCheck for ExpenseDraft {
    fn check(&self) -> Result<(), AdminFormError> {
        present(&self.category, "category")?;
        if self.amount_cents <= 0 {
            return Err(AdminFormError::InvalidAmount);
        }
        Ok(())
    }
}
