use ambulette_app::cli::{self, AdminView, Args, Command};
use ambulette_app::{AdminDashboard, BookingLookup, BookingSubmission, FleetReport};
use ambulette_client::{ApiClient, Config};
use ambulette_core::{Notifier, TracingNotifier};
use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load().context("Failed to load config")?;
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }

    let default_filter = config
        .log
        .filter
        .clone()
        .unwrap_or_else(|| "ambulette=info,ambulette_app=info,ambulette_client=info".into());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Using backend at {}", config.api.base_url);
    let api = Arc::new(ApiClient::new(&config.api)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let policy = config.otp.policy();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    match args.command {
        Command::Book { name, phone, email, condition, pickup, dropoff, from, to } => {
            let mut submission = BookingSubmission::new(api.clone(), api, notifier, policy);
            submission.edit(|form| {
                form.name = name;
                form.phone = phone;
                form.email = email.unwrap_or_default();
                form.health_condition = condition.unwrap_or_default();
                form.pickup_location = Some(pickup);
                form.drop_location = Some(dropoff);
                form.from_date = Some(from);
                form.to_date = Some(to);
            });

            if !cli::verify_interactively(submission.verification(), &mut stdin).await? {
                bail!("Phone number was not verified");
            }
            let booking = submission.submit().await?;
            print_json(&booking)?;
        }
        Command::Lookup { phone } => {
            let mut lookup = BookingLookup::new(api.clone(), api, notifier, policy);
            lookup.set_phone(&phone);

            if !cli::verify_interactively(lookup.verification(), &mut stdin).await? {
                bail!("Phone number was not verified");
            }
            let bookings = lookup.fetch().await?;
            print_json(&bookings)?;
        }
        Command::Admin { username, password, view } => {
            let mut dashboard = AdminDashboard::new(api, notifier, policy);
            dashboard.login(&username, &password).await?;
            let data = dashboard.refresh().await?;

            match view {
                AdminView::Ambulances => print_json(&data.ambulances)?,
                AdminView::Drivers => print_json(&data.drivers)?,
                AdminView::Bookings => print_json(&data.bookings)?,
                AdminView::Assignments => print_json(&data.assignments)?,
                AdminView::Employees => print_json(&data.employees)?,
                AdminView::Attendance => print_json(&data.attendance)?,
                AdminView::Expenses => print_json(&data.expenses)?,
                AdminView::Report => print_json(&FleetReport::build(data))?,
            }
        }
    }

    Ok(())
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
