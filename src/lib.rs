//! Attendance core: the check-in/check-out session lifecycle and the
//! per-day status computation engine, against a fixed UTC+7 calendar.
//!
//! Transport, authentication and the request-approval workflow live in
//! the embedding service; this crate exposes the operations they call.

pub mod anomaly;
pub mod approvals;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod report;
pub mod session;
pub mod status;
pub mod store;

pub use anomaly::AnomalyLogger;
pub use approvals::{MySqlOvertimeApprovals, OvertimeApprovals};
pub use config::AttendanceConfig;
pub use error::AttendanceError;
pub use model::attendance::{AttendanceRecord, DaySnapshot};
pub use session::SessionManager;
pub use status::{compute_attendance, potential_ot_minutes, ComputedStatus, Status};
pub use store::{mysql::MySqlAttendanceStore, AttendanceStore, StoreError};
