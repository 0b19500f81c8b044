use ambulette_client::{AdminSession, ApiClient};
use ambulette_core::otp::OtpPolicy;
use ambulette_core::{DraftCheck, GatewayResult, Notice, Notifier, AdminFormError};
use ambulette_shared::{
    AdminResource, Ambulance, AmbulanceDraft, AssignAmbulanceRequest, AssignDriverRequest,
    AttendanceRecord, Booking, BookingStatus, Driver, DriverAssignment, DriverDraft, Employee,
    Expense, MessageResponse,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::verification::PhoneVerification;

/// Everything the admin screens show, as of the last refresh
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub ambulances: Vec<Ambulance>,
    pub drivers: Vec<Driver>,
    pub bookings: Vec<Booking>,
    pub assignments: Vec<DriverAssignment>,
    pub employees: Vec<Employee>,
    pub attendance: Vec<AttendanceRecord>,
    pub expenses: Vec<Expense>,
}

pub struct AdminDashboard {
    api: Arc<ApiClient>,
    notifier: Arc<dyn Notifier>,
    driver_verification: PhoneVerification,
    data: DashboardData,
}

impl AdminDashboard {
    pub fn new(api: Arc<ApiClient>, notifier: Arc<dyn Notifier>, policy: OtpPolicy) -> Self {
        let otp: Arc<dyn ambulette_core::OtpGateway> = api.clone();
        Self {
            driver_verification: PhoneVerification::new(otp, Arc::clone(&notifier), policy),
            api,
            notifier,
            data: DashboardData::default(),
        }
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    pub fn session(&self) -> Option<AdminSession> {
        self.api.session()
    }

    /// OTP check for the phone of the driver being added
    pub fn driver_verification(&mut self) -> &mut PhoneVerification {
        &mut self.driver_verification
    }

    /// Sign in only; callers load the listings with `refresh`
    pub async fn login(&mut self, username: &str, password: &str) -> AppResult<AdminSession> {
        if username.trim().is_empty() || password.is_empty() {
            self.notifier.notify(Notice::error("Please enter both username and password"));
            return Err(AppError::AdminForm(AdminFormError::MissingField("credentials")));
        }

        match self.api.login(username, password).await {
            Ok(session) => {
                self.notifier.notify(Notice::success("Login successful!"));
                Ok(session)
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error(e.describe("Invalid credentials", "Login failed. Please try again.")));
                Err(e.into())
            }
        }
    }

    pub fn logout(&mut self) {
        self.api.logout();
        self.data = DashboardData::default();
    }

    /// Reload every listing concurrently
    pub async fn refresh(&mut self) -> AppResult<&DashboardData> {
        let api = &self.api;
        let loaded = tokio::try_join!(
            api.list::<Ambulance>(),
            api.list::<Driver>(),
            api.list_bookings(),
            api.driver_assignments(),
            api.list::<Employee>(),
            api.list::<AttendanceRecord>(),
            api.list::<Expense>(),
        );

        match loaded {
            Ok((ambulances, drivers, bookings, assignments, employees, attendance, expenses)) => {
                self.data = DashboardData {
                    ambulances,
                    drivers,
                    bookings,
                    assignments,
                    employees,
                    attendance,
                    expenses,
                };
                info!(
                    ambulances = self.data.ambulances.len(),
                    drivers = self.data.drivers.len(),
                    bookings = self.data.bookings.len(),
                    "dashboard refreshed"
                );
                Ok(&self.data)
            }
            Err(e) => {
                warn!(error = %e, "dashboard refresh failed");
                self.notifier
                    .notify(Notice::error(e.describe("Failed to load dashboard data", "Error loading dashboard data")));
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Generic resources: ambulances, employees, attendance, expenses
    // ------------------------------------------------------------------

    pub async fn add<R>(&mut self, draft: &R::Draft) -> AppResult<R>
    where
        R: AdminResource,
        R::Draft: DraftCheck,
    {
        self.check(draft)?;
        let api = Arc::clone(&self.api);
        let (failed, errored) = failure_messages::<R>("add", "adding");
        self.apply(
            format!("{} added successfully", R::LABEL),
            (failed.as_str(), errored.as_str()),
            api.create::<R>(draft),
        )
        .await
    }

    pub async fn update<R>(&mut self, id: &str, draft: &R::Draft) -> AppResult<R>
    where
        R: AdminResource,
        R::Draft: DraftCheck,
    {
        self.check(draft)?;
        let api = Arc::clone(&self.api);
        let (failed, errored) = failure_messages::<R>("update", "updating");
        self.apply(
            format!("{} updated successfully", R::LABEL),
            (failed.as_str(), errored.as_str()),
            api.update::<R>(id, draft),
        )
        .await
    }

    pub async fn remove<R: AdminResource>(&mut self, id: &str) -> AppResult<()> {
        let api = Arc::clone(&self.api);
        let (failed, errored) = failure_messages::<R>("delete", "deleting");
        self.apply(
            format!("{} deleted successfully", R::LABEL),
            (failed.as_str(), errored.as_str()),
            api.delete::<R>(id),
        )
        .await
    }

    pub async fn add_ambulance(&mut self, draft: &AmbulanceDraft) -> AppResult<Ambulance> {
        self.add::<Ambulance>(draft).await
    }

    /// Drivers are only created once their phone passed OTP verification
    pub async fn add_driver(&mut self, draft: &DriverDraft) -> AppResult<Driver> {
        self.check(draft)?;
        if !self.driver_verification.is_verified_for(&draft.phone) {
            return Err(self.reject(AdminFormError::PhoneNotVerified));
        }
        let driver = self.add::<Driver>(draft).await?;
        self.driver_verification.reset();
        Ok(driver)
    }

    // ------------------------------------------------------------------
    // Assignments and booking status
    // ------------------------------------------------------------------

    pub async fn assign_driver(&mut self, request: &AssignDriverRequest) -> AppResult<DriverAssignment> {
        self.check(request)?;
        let api = Arc::clone(&self.api);
        self.apply(
            "Driver assigned successfully".to_string(),
            ("Failed to assign driver", "Error assigning driver"),
            api.assign_driver(request),
        )
        .await
    }

    pub async fn delete_assignment(&mut self, id: &str) -> AppResult<()> {
        let api = Arc::clone(&self.api);
        self.apply(
            "Driver assignment removed".to_string(),
            ("Failed to remove driver assignment", "Error removing driver assignment"),
            api.delete_driver_assignment(id),
        )
        .await
    }

    pub async fn assign_ambulance(&mut self, request: &AssignAmbulanceRequest) -> AppResult<MessageResponse> {
        if request.check().is_err() {
            self.notifier.notify(Notice::error("Please select both booking and ambulance"));
            return Err(AppError::AdminForm(AdminFormError::MissingField("booking or ambulance")));
        }
        let api = Arc::clone(&self.api);
        self.apply(
            "Ambulance assigned to booking successfully".to_string(),
            ("Failed to assign ambulance to booking", "Error assigning ambulance to booking"),
            api.assign_ambulance(request),
        )
        .await
    }

    pub async fn set_booking_status(&mut self, booking_id: &str, status: BookingStatus) -> AppResult<Booking> {
        let api = Arc::clone(&self.api);
        self.apply(
            format!("Booking marked {}", status),
            ("Failed to update booking status", "Error updating booking status"),
            api.update_booking_status(booking_id, status),
        )
        .await
    }

    fn check(&self, draft: &impl DraftCheck) -> AppResult<()> {
        draft.check().map_err(|e| self.reject(e))
    }

    fn reject(&self, error: AdminFormError) -> AppError {
        self.notifier.notify(Notice::error(error.to_string()));
        error.into()
    }

    /// Run one mutation; success reloads the dashboard
    async fn apply<T>(
        &mut self,
        success: String,
        (rejected, unreachable): (&str, &str),
        call: impl Future<Output = GatewayResult<T>>,
    ) -> AppResult<T> {
        match call.await {
            Ok(value) => {
                self.notifier.notify(Notice::success(success));
                let _ = self.refresh().await;
                Ok(value)
            }
            Err(e) => {
                self.notifier.notify(Notice::error(e.describe(rejected, unreachable)));
                Err(e.into())
            }
        }
    }
}

/// "Failed to add ambulance" / "Error adding ambulance"
fn failure_messages<R: AdminResource>(verb: &str, gerund: &str) -> (String, String) {
    let label = R::LABEL.to_lowercase();
    (format!("Failed to {} {}", verb, label), format!("Error {} {}", gerund, label))
}
