//! In-process stand-in for the booking backend, served by axum on an
//! ephemeral port. OTP codes are random; tests read them back through
//! [`MockBackend::issued_code`] the way a person would read their SMS.

#![allow(dead_code)]

use ambulette_client::app_config::ApiConfig;
use ambulette_client::ApiClient;
use ambulette_core::{NoticeLog, OtpPolicy};
use ambulette_shared::{
    AdminClaims, AdminResource, Ambulance, AmbulanceDraft, AssignAmbulanceRequest,
    AssignDriverRequest, AttendanceDraft, AttendanceRecord, Booking, BookingRequest,
    BookingStatus, BookingStatusUpdate, Driver, DriverAssignment, DriverDraft, DriverStatus,
    Employee, EmployeeDraft, Expense, ExpenseDraft, LoginRequest, LoginResponse,
    MessageResponse, PhoneQuery, SendOtpRequest, SendOtpResponse, VerifyOtpRequest,
};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

#[derive(Default)]
pub struct Store {
    otps: HashMap<String, String>,
    verified: HashSet<String>,
    sends: usize,
    fail_sends: bool,
    fail_lists: bool,
    secret: String,
    bookings: Vec<Booking>,
    ambulances: Vec<Ambulance>,
    drivers: Vec<Driver>,
    assignments: Vec<DriverAssignment>,
    employees: Vec<Employee>,
    attendance: Vec<AttendanceRecord>,
    expenses: Vec<Expense>,
}

type Shared = Arc<Mutex<Store>>;

fn lock(state: &Shared) -> MutexGuard<'_, Store> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(detail: &str) -> Self {
        ApiError(StatusCode::BAD_REQUEST, detail.to_string())
    }

    fn not_found(detail: &str) -> Self {
        ApiError(StatusCode::NOT_FOUND, detail.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Proof that the request carried a valid admin bearer token
pub struct Admin;

impl FromRequestParts<Shared> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Shared) -> Result<Self, Self::Rejection> {
        let unauthorized = || ApiError(StatusCode::UNAUTHORIZED, "Could not validate credentials".into());
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(unauthorized)?;

        let secret = lock(state).secret.clone();
        decode::<AdminClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
            .map(|_| Admin)
            .map_err(|_| unauthorized())
    }
}

/// Admin collections backed by one `Vec` in the store
trait Stored: AdminResource + Clone {
    fn table(store: &mut Store) -> &mut Vec<Self>;

    fn build(id: String, draft: Self::Draft) -> Self;

    /// Backend-side rule checked before a create
    fn admit(_store: &Store, _draft: &Self::Draft) -> Result<(), ApiError> {
        Ok(())
    }
}

impl Stored for Ambulance {
    fn table(store: &mut Store) -> &mut Vec<Self> {
        &mut store.ambulances
    }

    fn build(id: String, d: AmbulanceDraft) -> Self {
        Ambulance {
            id,
            license_plate: d.license_plate,
            model: d.model,
            capacity: d.capacity,
            status: d.status.unwrap_or_default(),
        }
    }
}

impl Stored for Driver {
    fn table(store: &mut Store) -> &mut Vec<Self> {
        &mut store.drivers
    }

    fn build(id: String, d: DriverDraft) -> Self {
        Driver {
            id,
            name: d.name,
            phone: d.phone,
            license_number: d.license_number,
            status: d.status.unwrap_or(DriverStatus::Available),
        }
    }

    fn admit(store: &Store, draft: &DriverDraft) -> Result<(), ApiError> {
        if store.verified.contains(&draft.phone) {
            Ok(())
        } else {
            Err(ApiError::bad_request("Phone number not verified"))
        }
    }
}

impl Stored for Employee {
    fn table(store: &mut Store) -> &mut Vec<Self> {
        &mut store.employees
    }

    fn build(id: String, d: EmployeeDraft) -> Self {
        Employee { id, name: d.name, phone: d.phone, role: d.role, email: d.email, hire_date: d.hire_date }
    }
}

impl Stored for AttendanceRecord {
    fn table(store: &mut Store) -> &mut Vec<Self> {
        &mut store.attendance
    }

    fn build(id: String, d: AttendanceDraft) -> Self {
        AttendanceRecord {
            id,
            employee_id: d.employee_id,
            date: d.date,
            status: d.status,
            check_in: d.check_in,
            check_out: d.check_out,
        }
    }
}

impl Stored for Expense {
    fn table(store: &mut Store) -> &mut Vec<Self> {
        &mut store.expenses
    }

    fn build(id: String, d: ExpenseDraft) -> Self {
        Expense {
            id,
            category: d.category,
            amount_cents: d.amount_cents,
            date: d.date,
            description: d.description,
            ambulance_id: d.ambulance_id,
        }
    }
}

async fn list_resource<R: Stored>(_: Admin, State(state): State<Shared>) -> ApiResult<Vec<R>> {
    let mut store = lock(&state);
    if store.fail_lists {
        return Err(ApiError(StatusCode::INTERNAL_SERVER_ERROR, "Listing unavailable".into()));
    }
    Ok(Json(R::table(&mut store).clone()))
}

async fn create_resource<R>(_: Admin, State(state): State<Shared>, Json(draft): Json<R::Draft>) -> ApiResult<R>
where
    R: Stored,
    R::Draft: DeserializeOwned,
{
    let mut store = lock(&state);
    R::admit(&store, &draft)?;
    let item = R::build(Uuid::new_v4().to_string(), draft);
    R::table(&mut store).push(item.clone());
    Ok(Json(item))
}

async fn update_resource<R>(
    _: Admin,
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(draft): Json<R::Draft>,
) -> ApiResult<R>
where
    R: Stored,
    R::Draft: DeserializeOwned,
{
    let mut store = lock(&state);
    let slot = R::table(&mut store)
        .iter_mut()
        .find(|r| r.id() == id)
        .ok_or_else(|| ApiError::not_found(&format!("{} not found", R::LABEL)))?;
    *slot = R::build(id, draft);
    Ok(Json(slot.clone()))
}

async fn delete_resource<R: Stored>(
    _: Admin,
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let mut store = lock(&state);
    let table = R::table(&mut store);
    let before = table.len();
    table.retain(|r| r.id() != id);
    if table.len() == before {
        return Err(ApiError::not_found(&format!("{} not found", R::LABEL)));
    }
    Ok(Json(MessageResponse { message: format!("{} deleted", R::LABEL) }))
}

fn resource_routes<R>(router: Router<Shared>) -> Router<Shared>
where
    R: Stored,
    R::Draft: DeserializeOwned,
{
    router
        .route(
            &format!("/api/admin/{}", R::COLLECTION),
            get(list_resource::<R>).post(create_resource::<R>),
        )
        .route(
            &format!("/api/admin/{}/{{id}}", R::COLLECTION),
            put(update_resource::<R>).delete(delete_resource::<R>),
        )
}

async fn send_otp(State(state): State<Shared>, Json(req): Json<SendOtpRequest>) -> ApiResult<SendOtpResponse> {
    let mut store = lock(&state);
    store.sends += 1;
    if store.fail_sends {
        return Err(ApiError(StatusCode::SERVICE_UNAVAILABLE, "SMS gateway unavailable".into()));
    }
    let code = rand::thread_rng().gen_range(100_000..=999_999).to_string();
    store.otps.insert(req.phone, code);
    Ok(Json(SendOtpResponse {
        message: "OTP sent successfully".into(),
        expires_at: Some((Utc::now() + Duration::minutes(5)).naive_utc()),
    }))
}

async fn verify_otp(State(state): State<Shared>, Json(req): Json<VerifyOtpRequest>) -> ApiResult<MessageResponse> {
    let mut store = lock(&state);
    match store.otps.get(&req.phone).cloned() {
        None => Err(ApiError::bad_request("No OTP found for this phone number")),
        Some(code) if code != req.otp => Err(ApiError::bad_request("Invalid OTP")),
        Some(_) => {
            store.otps.remove(&req.phone);
            store.verified.insert(req.phone);
            Ok(Json(MessageResponse { message: "OTP verified successfully".into() }))
        }
    }
}

async fn create_booking(State(state): State<Shared>, Json(req): Json<BookingRequest>) -> ApiResult<Booking> {
    let mut store = lock(&state);
    if !store.verified.contains(&req.phone) {
        return Err(ApiError::bad_request("Phone number not verified"));
    }
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        phone: req.phone,
        email: req.email,
        health_condition: req.health_condition,
        pickup_location: req.pickup_location,
        drop_location: req.drop_location,
        from_date: req.from_date,
        to_date: req.to_date,
        status: BookingStatus::Pending,
        assigned_ambulance_id: None,
        created_at: Some(Utc::now().naive_utc()),
    };
    store.bookings.push(booking.clone());
    Ok(Json(booking))
}

async fn bookings_by_phone(State(state): State<Shared>, Json(q): Json<PhoneQuery>) -> Json<Vec<Booking>> {
    let store = lock(&state);
    Json(store.bookings.iter().filter(|b| b.phone == q.phone).cloned().collect())
}

async fn list_bookings(_: Admin, State(state): State<Shared>) -> Json<Vec<Booking>> {
    Json(lock(&state).bookings.clone())
}

async fn login(State(state): State<Shared>, Json(req): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    if req.username != ADMIN_USER || req.password.expose() != ADMIN_PASSWORD {
        return Err(ApiError(StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }
    let claims = AdminClaims {
        sub: req.username,
        exp: (Utc::now() + Duration::minutes(30)).timestamp() as usize,
    };
    let secret = lock(&state).secret.clone();
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(LoginResponse { access_token: token, token_type: "bearer".into() }))
}

async fn assign_driver(
    _: Admin,
    State(state): State<Shared>,
    Json(req): Json<AssignDriverRequest>,
) -> ApiResult<DriverAssignment> {
    let mut store = lock(&state);
    if !store.drivers.iter().any(|d| d.id == req.driver_id) {
        return Err(ApiError::not_found("Driver not found"));
    }
    if !store.ambulances.iter().any(|a| a.id == req.ambulance_id) {
        return Err(ApiError::not_found("Ambulance not found"));
    }
    let assignment = DriverAssignment {
        id: Uuid::new_v4().to_string(),
        driver_id: req.driver_id,
        ambulance_id: req.ambulance_id,
        date: req.date,
    };
    store.assignments.push(assignment.clone());
    Ok(Json(assignment))
}

async fn list_assignments(_: Admin, State(state): State<Shared>) -> Json<Vec<DriverAssignment>> {
    Json(lock(&state).assignments.clone())
}

async fn delete_assignment(
    _: Admin,
    State(state): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let mut store = lock(&state);
    let before = store.assignments.len();
    store.assignments.retain(|a| a.id != id);
    if store.assignments.len() == before {
        return Err(ApiError::not_found("Assignment not found"));
    }
    Ok(Json(MessageResponse { message: "Assignment deleted".into() }))
}

async fn assign_ambulance(
    _: Admin,
    State(state): State<Shared>,
    Json(req): Json<AssignAmbulanceRequest>,
) -> ApiResult<MessageResponse> {
    let mut store = lock(&state);
    if !store.ambulances.iter().any(|a| a.id == req.ambulance_id) {
        return Err(ApiError::not_found("Ambulance not found"));
    }
    let booking = store
        .bookings
        .iter_mut()
        .find(|b| b.id == req.booking_id)
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    booking.assigned_ambulance_id = Some(req.ambulance_id);
    booking.status = BookingStatus::Assigned;
    Ok(Json(MessageResponse { message: "Ambulance assigned successfully".into() }))
}

async fn update_booking_status(
    _: Admin,
    State(state): State<Shared>,
    Path(id): Path<String>,
    Json(update): Json<BookingStatusUpdate>,
) -> ApiResult<Booking> {
    let mut store = lock(&state);
    let booking = store
        .bookings
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| ApiError::not_found("Booking not found"))?;
    booking.status = update.status;
    Ok(Json(booking.clone()))
}

fn router(state: Shared) -> Router {
    let router = Router::new()
        .route("/healthz", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/send-otp", post(send_otp))
        .route("/api/verify-otp", post(verify_otp))
        .route("/api/bookings", post(create_booking).get(list_bookings))
        .route("/api/bookings/by-phone", post(bookings_by_phone))
        .route("/api/admin/login", post(login))
        .route("/api/admin/assign-driver", post(assign_driver))
        .route("/api/admin/driver-assignments", get(list_assignments))
        .route("/api/admin/driver-assignments/{id}", delete(delete_assignment))
        .route("/api/admin/assign-ambulance", post(assign_ambulance))
        .route("/api/admin/bookings/{id}/status", put(update_booking_status));

    let router = resource_routes::<Ambulance>(router);
    let router = resource_routes::<Driver>(router);
    let router = resource_routes::<Employee>(router);
    let router = resource_routes::<AttendanceRecord>(router);
    let router = resource_routes::<Expense>(router);
    router.with_state(state)
}

pub struct MockBackend {
    pub base_url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(Store {
            secret: "mock-backend-secret".into(),
            ..Store::default()
        }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{}", addr), state }
    }

    pub fn client(&self) -> Arc<ApiClient> {
        Arc::new(ApiClient::new(&ApiConfig { base_url: self.base_url.clone(), timeout_seconds: 5 }).unwrap())
    }

    /// The code most recently texted to `phone`
    pub fn issued_code(&self, phone: &str) -> Option<String> {
        lock(&self.state).otps.get(phone).cloned()
    }

    pub fn send_count(&self) -> usize {
        lock(&self.state).sends
    }

    pub fn fail_sends(&self, fail: bool) {
        lock(&self.state).fail_sends = fail;
    }

    /// Admin collection listings answer 500 while set
    pub fn fail_lists(&self, fail: bool) {
        lock(&self.state).fail_lists = fail;
    }

    pub fn bookings(&self) -> Vec<Booking> {
        lock(&self.state).bookings.clone()
    }

    /// Invalidate every token issued so far
    pub fn rotate_secret(&self) {
        lock(&self.state).secret = format!("rotated-{}", Uuid::new_v4());
    }
}

pub fn notices() -> Arc<NoticeLog> {
    Arc::new(NoticeLog::new())
}

pub fn policy() -> OtpPolicy {
    OtpPolicy::default()
}
