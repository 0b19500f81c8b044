use ambulette_core::otp::OtpPolicy;
use ambulette_core::{BookingForm, BookingGateway, Notice, Notifier, OtpGateway};
use ambulette_shared::Booking;
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::verification::PhoneVerification;

/// Public booking form: fields, phone verification and the single create call
pub struct BookingSubmission {
    form: BookingForm,
    verification: PhoneVerification,
    bookings: Arc<dyn BookingGateway>,
    notifier: Arc<dyn Notifier>,
}

impl BookingSubmission {
    pub fn new(
        otp: Arc<dyn OtpGateway>,
        bookings: Arc<dyn BookingGateway>,
        notifier: Arc<dyn Notifier>,
        policy: OtpPolicy,
    ) -> Self {
        Self {
            form: BookingForm::new(),
            verification: PhoneVerification::new(otp, Arc::clone(&notifier), policy),
            bookings,
            notifier,
        }
    }

    pub fn form(&self) -> &BookingForm {
        &self.form
    }

    /// Apply an edit to the form. The verification follows the phone field,
    /// so changing the number forces a new OTP.
    pub fn edit(&mut self, change: impl FnOnce(&mut BookingForm)) {
        change(&mut self.form);
        self.verification.set_phone(&self.form.phone);
    }

    pub fn verification(&mut self) -> &mut PhoneVerification {
        &mut self.verification
    }

    pub async fn submit(&mut self) -> AppResult<Booking> {
        // The verified number has to be the one on the form
        let verified = self.verification.is_verified_for(&self.form.phone);
        let request = match self.form.validate(verified) {
            Ok(request) => request,
            Err(e) => {
                self.notifier.notify(Notice::error(e.to_string()));
                return Err(e.into());
            }
        };

        match self.bookings.create_booking(&request).await {
            Ok(booking) => {
                info!(booking_id = %booking.id, "booking submitted");
                self.notifier.notify(Notice::success(format!(
                    "Booking created successfully! Booking ID: {}",
                    booking.id
                )));
                self.form.reset();
                self.verification.reset();
                Ok(booking)
            }
            Err(e) => {
                self.notifier
                    .notify(Notice::error(e.describe("Failed to create booking", "Error creating booking")));
                Err(AppError::Gateway(e))
            }
        }
    }
}
