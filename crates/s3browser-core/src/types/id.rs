//! Queue item identity.
//!
//! A [`JobId`] is a creation timestamp (second resolution) followed by a
//! short random suffix, e.g. `20240131154502-3fa9c01b`. Identities sort
//! roughly chronologically as plain strings, which is the key order the
//! durable store iterates in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the random suffix appended to the timestamp.
const SUFFIX_LEN: usize = 8;

/// Format of the timestamp component.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Identity of a queued job, unique within its partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identity stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an identity stamped with the given instant.
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            now.format(TIMESTAMP_FORMAT),
            &random[..SUFFIX_LEN]
        ))
    }

    /// Return the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity has not been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the identity and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
