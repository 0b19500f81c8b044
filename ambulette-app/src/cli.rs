use ambulette_core::booking::parse_datetime_local;
use ambulette_core::otp::VerifyOutcome;
use ambulette_core::OtpError;
use ambulette_shared::Location;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::error::{AppError, AppResult};
use crate::verification::PhoneVerification;

#[derive(Debug, Parser)]
#[command(name = "ambulette", about = "Book ambulette rides and manage the fleet")]
pub struct Args {
    /// Backend base URL, overrides `api.base_url`
    #[arg(long, env = "AMBULETTE_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a phone number and submit a booking
    Book {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        condition: Option<String>,
        /// ADDRESS@LAT,LNG
        #[arg(long, value_parser = parse_location)]
        pickup: Location,
        #[arg(long = "drop", value_parser = parse_location)]
        dropoff: Location,
        /// YYYY-MM-DDTHH:MM
        #[arg(long, value_parser = parse_datetime)]
        from: NaiveDateTime,
        #[arg(long, value_parser = parse_datetime)]
        to: NaiveDateTime,
    },
    /// Verify a phone number and list its bookings
    Lookup {
        #[arg(long)]
        phone: String,
    },
    /// Sign in and print a dashboard listing as JSON
    Admin {
        #[arg(long, env = "AMBULETTE_ADMIN_USER")]
        username: String,
        #[arg(long, env = "AMBULETTE_ADMIN_PASSWORD")]
        password: String,
        #[arg(value_enum)]
        view: AdminView,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AdminView {
    Ambulances,
    Drivers,
    Bookings,
    Assignments,
    Employees,
    Attendance,
    Expenses,
    Report,
}

/// `ADDRESS@LAT,LNG`; the address may itself contain `@`
pub fn parse_location(raw: &str) -> Result<Location, String> {
    let (address, coords) = raw
        .rsplit_once('@')
        .ok_or_else(|| format!("expected ADDRESS@LAT,LNG, got {:?}", raw))?;
    let (lat, lng) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG after '@', got {:?}", coords))?;

    let latitude: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude {:?}", lat))?;
    let longitude: f64 = lng.trim().parse().map_err(|_| format!("invalid longitude {:?}", lng))?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("coordinates out of range: {},{}", latitude, longitude));
    }
    if address.trim().is_empty() {
        return Err("address is empty".to_string());
    }
    Ok(Location::new(address.trim(), latitude, longitude))
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    parse_datetime_local(raw).map_err(|e| e.to_string())
}

/// One line typed at the OTP prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Code(String),
    Resend,
    Quit,
}

impl PromptInput {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "resend" | "r" => PromptInput::Resend,
            "quit" | "q" | "exit" => PromptInput::Quit,
            _ => PromptInput::Code(line.trim().to_string()),
        }
    }
}

/// Send a code, then read codes (or `resend`) until the phone is verified.
/// Returns `false` when the user quits or input ends first.
pub async fn verify_interactively<R>(
    verification: &mut PhoneVerification,
    input: &mut Lines<R>,
) -> AppResult<bool>
where
    R: AsyncBufRead + Unpin,
{
    if let Err(e) = verification.send().await {
        if e != OtpError::AlreadyVerified {
            return Err(e.into());
        }
        return Ok(true);
    }

    loop {
        let session = verification.snapshot();
        if session.is_verified() {
            return Ok(true);
        }
        if session.is_sent() {
            println!(
                "Enter the code sent to your phone ({}s left, 'resend' after expiry, 'quit' to stop):",
                session.expires_in()
            );
        } else {
            println!("No code is active. Type 'resend' to try again or 'quit' to stop:");
        }

        let line = match input.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(false),
            Err(e) => return Err(AppError::InvalidInput(e.to_string())),
        };

        // Precondition failures are already reported as notices
        match PromptInput::parse(&line) {
            PromptInput::Quit => return Ok(false),
            PromptInput::Resend if session.is_sent() => {
                let _ = verification.resend().await;
            }
            PromptInput::Resend => {
                let _ = verification.send().await;
            }
            PromptInput::Code(code) => {
                verification.set_code(&code);
                if let Ok(VerifyOutcome::Verified) = verification.verify().await {
                    return Ok(true);
                }
            }
        }
    }
}
