use ambulette_core::gateway::{BookingGateway, GatewayError, GatewayResult, OtpGateway};
use ambulette_shared::pii::MaskedPhone;
use ambulette_shared::{
    AdminResource, AssignAmbulanceRequest, AssignDriverRequest, Booking, BookingRequest,
    BookingStatus, BookingStatusUpdate, DriverAssignment, ErrorDetail, LoginRequest,
    LoginResponse, MessageResponse, PhoneQuery, SendOtpRequest, SendOtpResponse,
    VerifyOtpRequest,
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::app_config::ApiConfig;
use crate::session::AdminSession;

/// reqwest adapter for the booking backend's REST API
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<AdminSession>>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn admin_url(&self, collection: &str, id: Option<&str>) -> String {
        match id {
            Some(id) => self.url(&format!("/api/admin/{}/{}", collection, id)),
            None => self.url(&format!("/api/admin/{}", collection)),
        }
    }

    // ------------------------------------------------------------------
    // Admin session
    // ------------------------------------------------------------------

    pub async fn login(&self, username: &str, password: &str) -> GatewayResult<AdminSession> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.into(),
        };
        let reply: LoginResponse = send_json(self.http.post(self.url("/api/admin/login")).json(&body)).await?;

        let session = AdminSession::from_token(username, reply.access_token);
        if let Ok(mut slot) = self.session.write() {
            *slot = Some(session.clone());
        }
        info!(username, "admin signed in");
        Ok(session)
    }

    pub fn logout(&self) {
        if let Ok(mut slot) = self.session.write() {
            if slot.take().is_some() {
                info!("admin signed out");
            }
        }
    }

    pub fn session(&self) -> Option<AdminSession> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    /// Attach the bearer token, refusing locally when there is none or it expired
    fn authorized(&self, builder: RequestBuilder) -> GatewayResult<RequestBuilder> {
        let session = self.session().ok_or(GatewayError::Unauthenticated)?;
        if session.is_expired() {
            warn!(username = session.username(), "admin token expired");
            self.logout();
            return Err(GatewayError::Unauthenticated);
        }
        Ok(builder.bearer_auth(session.token()))
    }

    async fn admin_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> GatewayResult<T> {
        let result = send_json(self.authorized(builder)?).await;
        self.drop_session_on_401(result)
    }

    async fn admin_empty(&self, builder: RequestBuilder) -> GatewayResult<()> {
        let result = send_empty(self.authorized(builder)?).await;
        self.drop_session_on_401(result)
    }

    fn drop_session_on_401<T>(&self, result: GatewayResult<T>) -> GatewayResult<T> {
        if let Err(e) = &result {
            if e.status() == Some(401) {
                self.logout();
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Admin CRUD
    // ------------------------------------------------------------------

    pub async fn list<R: AdminResource>(&self) -> GatewayResult<Vec<R>> {
        self.admin_json(self.http.get(self.admin_url(R::COLLECTION, None))).await
    }

    pub async fn create<R: AdminResource>(&self, draft: &R::Draft) -> GatewayResult<R> {
        let created: R = self
            .admin_json(self.http.post(self.admin_url(R::COLLECTION, None)).json(draft))
            .await?;
        info!(id = created.id(), "{} created", R::LABEL);
        Ok(created)
    }

    pub async fn update<R: AdminResource>(&self, id: &str, draft: &R::Draft) -> GatewayResult<R> {
        let updated = self
            .admin_json(self.http.put(self.admin_url(R::COLLECTION, Some(id))).json(draft))
            .await?;
        info!(id, "{} updated", R::LABEL);
        Ok(updated)
    }

    pub async fn delete<R: AdminResource>(&self, id: &str) -> GatewayResult<()> {
        self.admin_empty(self.http.delete(self.admin_url(R::COLLECTION, Some(id)))).await?;
        info!(id, "{} deleted", R::LABEL);
        Ok(())
    }

    /// Every booking, admin only
    pub async fn list_bookings(&self) -> GatewayResult<Vec<Booking>> {
        self.admin_json(self.http.get(self.url("/api/bookings"))).await
    }

    pub async fn update_booking_status(&self, id: &str, status: BookingStatus) -> GatewayResult<Booking> {
        let url = self.url(&format!("/api/admin/bookings/{}/status", id));
        self.admin_json(self.http.put(url).json(&BookingStatusUpdate { status })).await
    }

    pub async fn assign_driver(&self, request: &AssignDriverRequest) -> GatewayResult<DriverAssignment> {
        self.admin_json(self.http.post(self.url("/api/admin/assign-driver")).json(request)).await
    }

    pub async fn driver_assignments(&self) -> GatewayResult<Vec<DriverAssignment>> {
        self.admin_json(self.http.get(self.url("/api/admin/driver-assignments"))).await
    }

    pub async fn delete_driver_assignment(&self, id: &str) -> GatewayResult<()> {
        let url = self.url(&format!("/api/admin/driver-assignments/{}", id));
        self.admin_empty(self.http.delete(url)).await
    }

    pub async fn assign_ambulance(&self, request: &AssignAmbulanceRequest) -> GatewayResult<MessageResponse> {
        self.admin_json(self.http.post(self.url("/api/admin/assign-ambulance")).json(request)).await
    }

    pub async fn health(&self) -> GatewayResult<()> {
        send_empty(self.http.get(self.url("/healthz"))).await
    }
}

#[async_trait]
impl OtpGateway for ApiClient {
    async fn send_otp(&self, phone: &str) -> GatewayResult<SendOtpResponse> {
        let body = SendOtpRequest { phone: phone.to_string() };
        let reply: SendOtpResponse = send_json(self.http.post(self.url("/api/send-otp")).json(&body)).await?;
        // Test backends put the code in the message
        debug!(phone = %MaskedPhone(phone), message = %reply.message, "otp dispatched");
        Ok(reply)
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> GatewayResult<()> {
        let body = VerifyOtpRequest { phone: phone.to_string(), otp: code.to_string() };
        send_empty(self.http.post(self.url("/api/verify-otp")).json(&body)).await
    }
}

#[async_trait]
impl BookingGateway for ApiClient {
    async fn create_booking(&self, request: &BookingRequest) -> GatewayResult<Booking> {
        let booking: Booking = send_json(self.http.post(self.url("/api/bookings")).json(request)).await?;
        info!(booking_id = %booking.id, "booking created");
        Ok(booking)
    }

    async fn bookings_by_phone(&self, phone: &str) -> GatewayResult<Vec<Booking>> {
        let body = PhoneQuery { phone: phone.to_string() };
        send_json(self.http.post(self.url("/api/bookings/by-phone")).json(&body)).await
    }
}

async fn dispatch(builder: RequestBuilder) -> GatewayResult<Response> {
    let response = builder.send().await.map_err(|e| {
        error!("HTTP request failed: {}", e);
        GatewayError::Transport(e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = decode_detail(&body);
    warn!(status = status.as_u16(), detail = detail.as_deref().unwrap_or(""), "backend rejected request");
    Err(GatewayError::Rejected { status: status.as_u16(), detail })
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> GatewayResult<T> {
    let response = dispatch(builder).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))
}

async fn send_empty(builder: RequestBuilder) -> GatewayResult<()> {
    dispatch(builder).await.map(|_| ())
}

/// FastAPI-style `{"detail": "..."}`; anything else yields no detail
fn decode_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorDetail>(body)
        .ok()
        .map(|e| e.detail)
        .filter(|d| !d.trim().is_empty())
}
