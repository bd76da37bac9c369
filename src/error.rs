use thiserror::Error;

use crate::store::StoreError;

/// Crate-level error taxonomy. Business-rule violations are expected and
/// user-facing; storage faults stay opaque and are never masked or
/// retried here.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// A record for this user and date already exists (lost create race
    /// or a second same-day check-in after checkout).
    #[error("already checked in today")]
    AlreadyCheckedIn,
    /// Some session is still open; policy is strict regardless of its age.
    #[error("an open session exists; check out before checking in again")]
    OpenSessionExists,
    #[error("no open session; check in first")]
    MustCheckInFirst,
    /// Lost conditional-update race on checkout.
    #[error("session is already checked out")]
    AlreadyCheckedOut,
    /// The open session outlived the checkout grace period.
    #[error("session expired, contact an administrator")]
    SessionExpired,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage failure")]
    Storage(#[from] StoreError),
}

impl AttendanceError {
    /// Stable machine-readable reason for transport layers.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            Self::OpenSessionExists => "OPEN_SESSION_EXISTS",
            Self::MustCheckInFirst => "MUST_CHECK_IN_FIRST",
            Self::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Storage(_) => "STORAGE_FAILURE",
        }
    }

    /// True for expected, user-facing rejections; false for faults.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}
