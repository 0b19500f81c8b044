//! Phone verification state machine.
//!
//! `Idle -> Sent { expires_in } -> Verified`, where a `Sent` session whose
//! expiry countdown reached zero is expired and may be resent. The resend
//! cooldown is tracked beside the phase so that editing the phone number
//! cannot bypass it.
//!
//! Network calls are split into `begin_*` / `finish_*` halves: `begin_*`
//! checks preconditions and marks a request in flight, `finish_*` applies the
//! backend's answer. A [`PendingRequest`] ticket ties the two together so an
//! answer for a phone number that has since been edited is dropped.

use ambulette_shared::pii::MaskedPhone;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const OTP_TTL_SECONDS: u32 = 300;
pub const RESEND_COOLDOWN_SECONDS: u32 = 60;
pub const OTP_CODE_LENGTH: usize = 6;

/// What a failed dispatch does to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendFailureMode {
    /// Stay where we were; the user can press Send again
    #[default]
    Strict,
    /// Move to `Sent` anyway and start both countdowns
    FailOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    pub expiry_seconds: u32,
    pub cooldown_seconds: u32,
    pub code_length: usize,
    pub send_failure: SendFailureMode,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            expiry_seconds: OTP_TTL_SECONDS,
            cooldown_seconds: RESEND_COOLDOWN_SECONDS,
            code_length: OTP_CODE_LENGTH,
            send_failure: SendFailureMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPhase {
    Idle,
    Sent { expires_in: u32 },
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("Please enter a phone number first")]
    MissingPhone,

    #[error("Please enter the OTP")]
    MissingCode,

    #[error("Please wait {remaining}s before requesting another code")]
    CooldownActive { remaining: u32 },

    #[error("OTP has expired, request a new one")]
    Expired,

    #[error("OTP is still valid, resend is available once it expires")]
    NotExpired,

    #[error("No OTP has been sent yet")]
    NotSent,

    #[error("A code was already sent to this number")]
    AlreadySent,

    #[error("Phone number is already verified")]
    AlreadyVerified,

    #[error("A request is already in progress")]
    Busy,
}

/// Ticket for an outstanding backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub phone: String,
    pub code: Option<String>,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Dispatch failed but the session proceeded under `FailOpen`
    SentDegraded,
    Failed,
    /// The phone number changed while the request was in flight
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Rejected,
    Stale,
}

#[derive(Debug, Clone)]
pub struct OtpSession {
    phone: String,
    code: String,
    phase: OtpPhase,
    cooldown: u32,
    in_flight: bool,
    generation: u64,
    policy: OtpPolicy,
}

impl OtpSession {
    pub fn new(policy: OtpPolicy) -> Self {
        Self {
            phone: String::new(),
            code: String::new(),
            phase: OtpPhase::Idle,
            cooldown: 0,
            in_flight: false,
            generation: 0,
            policy,
        }
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> OtpPhase {
        self.phase
    }

    pub fn expires_in(&self) -> u32 {
        match self.phase {
            OtpPhase::Sent { expires_in } => expires_in,
            _ => 0,
        }
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.phase, OtpPhase::Sent { .. })
    }

    pub fn is_expired(&self) -> bool {
        self.phase == OtpPhase::Sent { expires_in: 0 }
    }

    pub fn is_verified(&self) -> bool {
        self.phase == OtpPhase::Verified
    }

    /// Replace the phone number. Any change drops the session back to `Idle`
    /// and orphans requests in flight. Returns whether a reset happened.
    pub fn set_phone(&mut self, phone: &str) -> bool {
        if self.phone == phone {
            return false;
        }
        self.phone = phone.to_string();
        let was_active = self.phase != OtpPhase::Idle || self.in_flight;
        self.code.clear();
        self.phase = OtpPhase::Idle;
        self.in_flight = false;
        self.generation += 1;
        if was_active {
            info!(phone = %MaskedPhone(&self.phone), "phone changed, verification reset");
        }
        was_active
    }

    /// Keep only ASCII digits, at most `code_length` of them
    pub fn set_code(&mut self, raw: &str) {
        self.code = raw
            .chars()
            .filter(|c| c.is_ascii_digit())
            .take(self.policy.code_length)
            .collect();
    }

    pub fn can_send(&self) -> bool {
        self.check_send().is_ok()
    }

    pub fn can_verify(&self) -> bool {
        self.check_verify().is_ok()
    }

    pub fn can_resend(&self) -> bool {
        !self.in_flight && self.is_expired()
    }

    fn check_send(&self) -> Result<(), OtpError> {
        if self.in_flight {
            return Err(OtpError::Busy);
        }
        match self.phase {
            OtpPhase::Verified => return Err(OtpError::AlreadyVerified),
            OtpPhase::Sent { .. } => return Err(OtpError::AlreadySent),
            OtpPhase::Idle => {}
        }
        if self.phone.trim().is_empty() {
            return Err(OtpError::MissingPhone);
        }
        if self.cooldown > 0 {
            return Err(OtpError::CooldownActive { remaining: self.cooldown });
        }
        Ok(())
    }

    fn check_verify(&self) -> Result<(), OtpError> {
        if self.in_flight {
            return Err(OtpError::Busy);
        }
        match self.phase {
            OtpPhase::Idle => Err(OtpError::NotSent),
            OtpPhase::Verified => Err(OtpError::AlreadyVerified),
            OtpPhase::Sent { expires_in: 0 } => Err(OtpError::Expired),
            OtpPhase::Sent { .. } if self.code.is_empty() => Err(OtpError::MissingCode),
            OtpPhase::Sent { .. } => Ok(()),
        }
    }

    fn ticket(&self, code: Option<String>) -> PendingRequest {
        PendingRequest {
            phone: self.phone.clone(),
            code,
            generation: self.generation,
        }
    }

    pub fn begin_send(&mut self) -> Result<PendingRequest, OtpError> {
        self.check_send()?;
        self.in_flight = true;
        Ok(self.ticket(None))
    }

    pub fn finish_send(&mut self, ticket: &PendingRequest, delivered: bool) -> SendOutcome {
        if ticket.generation != self.generation {
            return SendOutcome::Stale;
        }
        self.in_flight = false;

        let outcome = match (delivered, self.policy.send_failure) {
            (true, _) => SendOutcome::Sent,
            (false, SendFailureMode::FailOpen) => SendOutcome::SentDegraded,
            (false, SendFailureMode::Strict) => return SendOutcome::Failed,
        };

        self.phase = OtpPhase::Sent { expires_in: self.policy.expiry_seconds };
        self.cooldown = self.policy.cooldown_seconds;
        info!(
            phone = %MaskedPhone(&self.phone),
            degraded = outcome == SendOutcome::SentDegraded,
            "otp sent"
        );
        outcome
    }

    /// Only once the code expired: clear the entry and the cooldown, then send again
    pub fn begin_resend(&mut self) -> Result<PendingRequest, OtpError> {
        if self.in_flight {
            return Err(OtpError::Busy);
        }
        match self.phase {
            OtpPhase::Sent { expires_in: 0 } => {}
            OtpPhase::Sent { .. } => return Err(OtpError::NotExpired),
            OtpPhase::Idle => return Err(OtpError::NotSent),
            OtpPhase::Verified => return Err(OtpError::AlreadyVerified),
        }
        self.code.clear();
        self.phase = OtpPhase::Idle;
        self.cooldown = 0;
        self.begin_send()
    }

    pub fn begin_verify(&mut self) -> Result<PendingRequest, OtpError> {
        self.check_verify()?;
        self.in_flight = true;
        Ok(self.ticket(Some(self.code.clone())))
    }

    pub fn finish_verify(&mut self, ticket: &PendingRequest, accepted: bool) -> VerifyOutcome {
        if ticket.generation != self.generation {
            return VerifyOutcome::Stale;
        }
        self.in_flight = false;
        if !accepted {
            debug!(phone = %MaskedPhone(&self.phone), "otp rejected");
            return VerifyOutcome::Rejected;
        }
        self.phase = OtpPhase::Verified;
        self.code.clear();
        info!(phone = %MaskedPhone(&self.phone), "phone verified");
        VerifyOutcome::Verified
    }

    /// One second elapsed. Returns whether any countdown is still running.
    pub fn tick(&mut self) -> bool {
        if let OtpPhase::Sent { expires_in } = &mut self.phase {
            *expires_in = expires_in.saturating_sub(1);
        }
        self.cooldown = self.cooldown.saturating_sub(1);
        self.countdown_running()
    }

    pub fn countdown_running(&self) -> bool {
        self.expires_in() > 0 || self.cooldown > 0
    }

    /// Forget everything except the policy
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::new(self.policy)
        };
    }
}

impl Default for OtpSession {
    fn default() -> Self {
        Self::new(OtpPolicy::default())
    }
}
