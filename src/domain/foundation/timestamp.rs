//! UTC instants carried on room items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant, serialized as RFC 3339 so browser clients parse it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// True when both instants fall on the same UTC calendar day.
    pub fn same_day(&self, other: &Timestamp) -> bool {
        self.0.date_naive() == other.0.date_naive()
    }
}
