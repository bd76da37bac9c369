use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

use crate::calendar;

/// Session summaries embedded in a MULTIPLE_ACTIVE_SESSIONS payload are
/// capped; the count field still reports the real total.
pub const SESSION_SUMMARY_CAP: usize = 10;

/// Entries become eligible for deletion this many days after creation.
pub const RETENTION_DAYS: i64 = 90;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    StaleOpenSession,
    MultipleActiveSessions,
}

/// Which lifecycle operation observed the stale session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectedAt {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleOpenSession {
    pub date: String,
    pub check_in_at: DateTime<Utc>,
    pub detected_at: DetectedAt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub date: String,
    pub check_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleActiveSessions {
    pub count: usize,
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    #[error("invalid date key '{0}'")]
    BadDateKey(String),
    #[error("session count {0} is below the multiple-session threshold")]
    CountTooLow(usize),
    #[error("session summary list is empty")]
    NoSessions,
    #[error("session summary list has {len} entries, cap is {cap}")]
    TooManySessions { len: usize, cap: usize },
}

/// Type-tagged anomaly payload. Shape is validated against the tag before
/// an entry is accepted for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnomalyPayload {
    StaleOpenSession(StaleOpenSession),
    MultipleActiveSessions(MultipleActiveSessions),
}

impl AnomalyPayload {
    pub fn anomaly_type(&self) -> AnomalyType {
        match self {
            Self::StaleOpenSession(_) => AnomalyType::StaleOpenSession,
            Self::MultipleActiveSessions(_) => AnomalyType::MultipleActiveSessions,
        }
    }

    pub fn validate(&self) -> Result<(), PayloadError> {
        match self {
            Self::StaleOpenSession(payload) => {
                if calendar::parse_date_key(&payload.date).is_none() {
                    return Err(PayloadError::BadDateKey(payload.date.clone()));
                }
                Ok(())
            }
            Self::MultipleActiveSessions(payload) => {
                if payload.count < 2 {
                    return Err(PayloadError::CountTooLow(payload.count));
                }
                if payload.sessions.is_empty() {
                    return Err(PayloadError::NoSessions);
                }
                if payload.sessions.len() > SESSION_SUMMARY_CAP {
                    return Err(PayloadError::TooManySessions {
                        len: payload.sessions.len(),
                        cap: SESSION_SUMMARY_CAP,
                    });
                }
                if let Some(bad) = payload
                    .sessions
                    .iter()
                    .find(|s| calendar::parse_date_key(&s.date).is_none())
                {
                    return Err(PayloadError::BadDateKey(bad.date.clone()));
                }
                Ok(())
            }
        }
    }
}

/// Immutable, write-once anomaly record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub id: String,
    pub user_id: u64,
    pub anomaly_type: AnomalyType,
    pub payload: AnomalyPayload,
    pub created_at: DateTime<Utc>,
}

impl AnomalyEntry {
    /// Builds a validated entry; the payload shape must match its tag.
    pub fn new(
        user_id: u64,
        payload: AnomalyPayload,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PayloadError> {
        payload.validate()?;
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            anomaly_type: payload.anomaly_type(),
            payload,
            created_at,
        })
    }
}
