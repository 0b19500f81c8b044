use ambulette_shared::{AmbulanceStatus, AttendanceStatus, BookingStatus};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::dashboard::DashboardData;

/// Operational summary derived from a dashboard snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FleetReport {
    pub bookings_by_status: BTreeMap<BookingStatus, usize>,
    /// Pending bookings that still have no ambulance
    pub unassigned_bookings: usize,
    pub ambulances_by_status: BTreeMap<AmbulanceStatus, usize>,
    /// Distinct drivers on the roster per day
    pub drivers_assigned_by_date: BTreeMap<NaiveDate, usize>,
    /// Share of recorded employees present, 0.0 to 1.0
    pub attendance_rate_by_date: BTreeMap<NaiveDate, f64>,
    pub expenses_by_category: BTreeMap<String, i64>,
    pub total_expenses_cents: i64,
}

impl FleetReport {
    pub fn build(data: &DashboardData) -> Self {
        let mut report = FleetReport::default();

        for booking in &data.bookings {
            *report.bookings_by_status.entry(booking.status).or_default() += 1;
            if booking.status == BookingStatus::Pending && booking.assigned_ambulance_id.is_none() {
                report.unassigned_bookings += 1;
            }
        }

        for ambulance in &data.ambulances {
            *report.ambulances_by_status.entry(ambulance.status).or_default() += 1;
        }

        let mut rostered: BTreeMap<NaiveDate, BTreeSet<&str>> = BTreeMap::new();
        for assignment in &data.assignments {
            rostered.entry(assignment.date).or_default().insert(&assignment.driver_id);
        }
        report.drivers_assigned_by_date = rostered.into_iter().map(|(day, drivers)| (day, drivers.len())).collect();

        let mut attendance: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
        for record in &data.attendance {
            let (present, total) = attendance.entry(record.date).or_default();
            *total += 1;
            if record.status == AttendanceStatus::Present {
                *present += 1;
            }
        }
        report.attendance_rate_by_date = attendance
            .into_iter()
            .map(|(day, (present, total))| (day, present as f64 / total as f64))
            .collect();

        for expense in &data.expenses {
            *report.expenses_by_category.entry(expense.category.clone()).or_default() += expense.amount_cents;
            report.total_expenses_cents += expense.amount_cents;
        }

        report
    }
}
