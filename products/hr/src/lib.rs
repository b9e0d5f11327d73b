//! HR vertical slice.
//!
//! Everything here derives presentation data from a [`RecordTable`] without
//! mutating it. Views are recomputed in full on every call.
//!
//! [`RecordTable`]: entity::RecordTable

pub mod analytics;
pub mod capture;
pub mod dashboard;
pub mod detail;
pub mod filter;
pub mod roles;
pub mod salary;
pub mod workspace;

pub use analytics::{AnalyticsView, TopSalary, TrendPoint, analytics};
pub use capture::{
    CaptureError, CaptureSession, MediaDevices, MediaStream, RelayDevice, RelayStream, StreamGuard,
};
pub use dashboard::{CandidateCard, Dashboard, SalaryPoint, dashboard};
pub use detail::{EmployeeDetail, EmployeeInfo, FitPoint, MapLocation, employee_detail};
pub use filter::{FilterCriteria, FilteredRecord, PhotoFilter, filter_records};
pub use roles::{RoleCount, distinct_locations, distinct_roles, group_by_role};
pub use salary::{SalaryAggregate, SalaryEntry, aggregate_salaries};
pub use workspace::{CapturedPhoto, PhotoResult, Workspace, WorkspaceError, photo_result};

/// JavaScript-style `Math.round`: halves round toward positive infinity.
pub(crate) fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

#[cfg(test)]
pub(crate) mod fixtures {
    use entity::{EmployeeRecord, RecordTable};

    pub fn table(rows: &[(&str, &str, &str, &str)]) -> RecordTable {
        rows.iter()
            .map(|(name, role, location, salary)| EmployeeRecord::new(*name, *role, *location, *salary))
            .collect()
    }

    pub fn staff() -> RecordTable {
        table(&[
            ("Tiger Nixon", "System Architect", "Edinburgh", "$320,800"),
            ("Garrett Winters", "Accountant", "Tokyo", "$170,750"),
            ("Ashton Cox", "Junior Technical Author", "San Francisco", "$86,000"),
            ("Cedric Kelly", "Senior Javascript Developer", "Edinburgh", "$433,060"),
            ("Airi Satou", "Accountant", "Tokyo", "$162,700"),
        ])
    }
}
