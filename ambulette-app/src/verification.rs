use ambulette_core::otp::{OtpPolicy, OtpSession, PendingRequest, SendOutcome, VerifyOutcome};
use ambulette_core::{Notice, Notifier, OtpError, OtpGateway};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type VerifiedHook = Box<dyn Fn(&str) + Send + Sync>;

/// Drives an [`OtpSession`] against the backend and runs its one-second
/// countdown. Shared by the booking form, the booking lookup and the admin
/// driver form.
pub struct PhoneVerification {
    session: Arc<Mutex<OtpSession>>,
    gateway: Arc<dyn OtpGateway>,
    notifier: Arc<dyn Notifier>,
    on_verified: Option<VerifiedHook>,
    countdown: Option<JoinHandle<()>>,
}

impl PhoneVerification {
    pub fn new(gateway: Arc<dyn OtpGateway>, notifier: Arc<dyn Notifier>, policy: OtpPolicy) -> Self {
        Self {
            session: Arc::new(Mutex::new(OtpSession::new(policy))),
            gateway,
            notifier,
            on_verified: None,
            countdown: None,
        }
    }

    /// Called with the phone number once the backend accepts a code
    pub fn on_verified(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_verified = Some(Box::new(hook));
        self
    }

    fn lock(&self) -> MutexGuard<'_, OtpSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> OtpSession {
        self.lock().clone()
    }

    pub fn phone(&self) -> String {
        self.lock().phone().to_string()
    }

    pub fn is_verified(&self) -> bool {
        self.lock().is_verified()
    }

    /// Verified for exactly this phone number
    pub fn is_verified_for(&self, phone: &str) -> bool {
        let session = self.lock();
        session.is_verified() && session.phone() == phone
    }

    pub fn set_phone(&self, phone: &str) -> bool {
        self.lock().set_phone(phone)
    }

    pub fn set_code(&self, code: &str) {
        self.lock().set_code(code);
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub async fn send(&mut self) -> Result<SendOutcome, OtpError> {
        let ticket = self.begin(|s| s.begin_send())?;
        Ok(self.dispatch(ticket).await)
    }

    pub async fn resend(&mut self) -> Result<SendOutcome, OtpError> {
        let ticket = self.begin(|s| s.begin_resend())?;
        Ok(self.dispatch(ticket).await)
    }

    pub async fn verify(&mut self) -> Result<VerifyOutcome, OtpError> {
        let ticket = self.begin(|s| s.begin_verify())?;
        let code = ticket.code.clone().unwrap_or_default();

        let result = self.gateway.verify_otp(&ticket.phone, &code).await;
        let outcome = self.lock().finish_verify(&ticket, result.is_ok());

        match (&outcome, result) {
            (VerifyOutcome::Verified, _) => {
                self.notifier.notify(Notice::success("Phone number verified successfully!"));
                if let Some(hook) = &self.on_verified {
                    hook(&ticket.phone);
                }
            }
            (VerifyOutcome::Rejected, Err(e)) => {
                self.notifier.notify(Notice::error(e.describe("Invalid OTP", "Error verifying OTP")));
            }
            _ => {}
        }
        Ok(outcome)
    }

    fn begin(
        &self,
        step: impl FnOnce(&mut OtpSession) -> Result<PendingRequest, OtpError>,
    ) -> Result<PendingRequest, OtpError> {
        let result = step(&mut *self.lock());
        if let Err(e) = &result {
            self.notifier.notify(Notice::error(e.to_string()));
        }
        result
    }

    async fn dispatch(&mut self, ticket: PendingRequest) -> SendOutcome {
        let result = self.gateway.send_otp(&ticket.phone).await;
        let outcome = self.lock().finish_send(&ticket, result.is_ok());

        match (&outcome, &result) {
            (SendOutcome::Sent, _) => self.notifier.notify(Notice::success("OTP sent successfully!")),
            (SendOutcome::SentDegraded | SendOutcome::Failed, Err(e)) => {
                self.notifier.notify(Notice::error(e.describe("Failed to send OTP", "Error sending OTP")));
            }
            _ => {}
        }
        if matches!(outcome, SendOutcome::Sent | SendOutcome::SentDegraded) {
            self.start_countdown();
        }
        outcome
    }

    /// One shared interval for both countdowns; it stops once both hit zero
    fn start_countdown(&mut self) {
        if let Some(previous) = self.countdown.take() {
            previous.abort();
        }
        let session = Arc::clone(&self.session);
        self.countdown = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let running = session
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .tick();
                if !running {
                    break;
                }
            }
        }));
    }
}

impl Drop for PhoneVerification {
    fn drop(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
    }
}
