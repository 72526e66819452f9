//! Silences: time-bounded, operator-created suppressions of alerts
//! matching a set of matchers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::labels::Labels;
use crate::matcher::{all_match, Matcher};

/// Lifecycle state of a silence relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SilenceState {
    Pending,
    Active,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Silence {
    pub id: Uuid,
    pub matchers: Vec<Matcher>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: String,
    pub comment: String,
    pub updated_at: DateTime<Utc>,
}

impl Silence {
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `matchers` is empty (a
    /// silence with no matchers would suppress every alert) or if
    /// `starts_at > ends_at`.
    pub fn new(
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Self, CoreError> {
        if matchers.is_empty() {
            return Err(CoreError::Validation(
                "a silence must carry at least one matcher".into(),
            ));
        }
        if starts_at > ends_at {
            return Err(CoreError::Validation(
                "silence starts_at must not be after ends_at".into(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            matchers,
            starts_at,
            ends_at,
            created_by: created_by.into(),
            comment: comment.into(),
            updated_at: now,
        })
    }

    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> SilenceState {
        if now < self.starts_at {
            SilenceState::Pending
        } else if now < self.ends_at {
            SilenceState::Active
        } else {
            SilenceState::Expired
        }
    }

    #[must_use]
    pub fn state(&self) -> SilenceState {
        self.state_at(Utc::now())
    }

    /// Whether this silence, if active, would suppress an alert carrying
    /// `labels`. Callers must check [`Silence::state`] separately; a
    /// pending or expired silence that matches is not currently
    /// suppressing anything.
    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        all_match(&self.matchers, labels)
    }
}
