//! Domain records shared by the portal crates.
//!
//! Rows arrive from the dataset endpoint as positional JSON arrays; this crate
//! owns the single parse step that turns them into [`EmployeeRecord`]s.

pub mod employee;
pub mod photo;
pub mod salary;
pub mod session_user;

pub use employee::{EmployeeRecord, RecordTable, RowIssue};
pub use photo::{PhotoError, PhotoOverrides, PhotoPayload};
pub use salary::{Salary, parse_salary};
pub use session_user::{Role, SessionUser};
