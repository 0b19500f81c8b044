use ambulette_core::otp::{OtpPolicy, VerifyOutcome};
use ambulette_core::{BookingGateway, Notice, Notifier, OtpGateway};
use ambulette_shared::pii::MaskedPhone;
use ambulette_shared::Booking;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::verification::PhoneVerification;

/// "My bookings": prove control of a phone number, then list its bookings
pub struct BookingLookup {
    phone: String,
    verification: PhoneVerification,
    gateway: Arc<dyn BookingGateway>,
    notifier: Arc<dyn Notifier>,
    bookings: Vec<Booking>,
    /// Filled by the verification hook, taken by the next load
    just_verified: Arc<Mutex<Option<String>>>,
}

impl BookingLookup {
    pub fn new(
        otp: Arc<dyn OtpGateway>,
        gateway: Arc<dyn BookingGateway>,
        notifier: Arc<dyn Notifier>,
        policy: OtpPolicy,
    ) -> Self {
        let just_verified = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&just_verified);
        let verification = PhoneVerification::new(otp, Arc::clone(&notifier), policy).on_verified(
            move |phone: &str| {
                *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(phone.to_string());
            },
        );

        Self {
            phone: String::new(),
            verification,
            gateway,
            notifier,
            bookings: Vec::new(),
            just_verified,
        }
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// A different number hides the previous number's bookings
    pub fn set_phone(&mut self, phone: &str) {
        if self.phone != phone {
            self.bookings.clear();
        }
        self.phone = phone.to_string();
        self.verification.set_phone(phone);
        self.just_verified.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
    }

    pub fn verification(&mut self) -> &mut PhoneVerification {
        &mut self.verification
    }

    /// Verify the entered code. The verification hook marks the number, and
    /// the bookings are loaded once for it.
    pub async fn verify(&mut self, code: &str) -> AppResult<VerifyOutcome> {
        self.verification.set_code(code);
        let outcome = self.verification.verify().await?;

        let verified = self
            .just_verified
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if verified.as_deref() == Some(self.phone.as_str()) {
            // Errors are already surfaced as notices
            let _ = self.fetch().await;
        }
        Ok(outcome)
    }

    pub async fn fetch(&mut self) -> AppResult<&[Booking]> {
        if !self.verification.is_verified_for(&self.phone) {
            self.notifier.notify(Notice::error("Please verify your phone number first"));
            return Err(AppError::NotVerified);
        }

        match self.gateway.bookings_by_phone(&self.phone).await {
            Ok(bookings) => {
                info!(phone = %MaskedPhone(&self.phone), count = bookings.len(), "bookings loaded");
                if bookings.is_empty() {
                    self.notifier.notify(Notice::info("No bookings found for this phone number"));
                } else {
                    self.notifier.notify(Notice::success(format!("Found {} booking(s)", bookings.len())));
                }
                self.bookings = bookings;
                Ok(&self.bookings)
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error(e.describe("Failed to fetch bookings", "Error fetching bookings")));
                Err(AppError::Gateway(e))
            }
        }
    }
}
