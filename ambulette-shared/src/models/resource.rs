use serde::{de::DeserializeOwned, Serialize};

use super::{
    Ambulance, AmbulanceDraft, AttendanceDraft, AttendanceRecord, Driver, DriverDraft, Employee,
    EmployeeDraft, Expense, ExpenseDraft,
};

/// An entity managed through `/api/admin/{COLLECTION}` list/create/update/delete
pub trait AdminResource: Serialize + DeserializeOwned + Send + Sync + 'static {
    type Draft: Serialize + Send + Sync;

    const COLLECTION: &'static str;
    const LABEL: &'static str;

    fn id(&self) -> &str;
}

macro_rules! admin_resource {
    ($ty:ty, $draft:ty, $collection:literal, $label:literal) => {
        impl AdminResource for $ty {
            type Draft = $draft;

            const COLLECTION: &'static str = $collection;
            const LABEL: &'static str = $label;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

admin_resource!(Ambulance, AmbulanceDraft, "ambulances", "Ambulance");
admin_resource!(Driver, DriverDraft, "drivers", "Driver");
admin_resource!(Employee, EmployeeDraft, "employees", "Employee");
admin_resource!(AttendanceRecord, AttendanceDraft, "attendance", "Attendance record");
admin_resource!(Expense, ExpenseDraft, "expenses", "Expense");
