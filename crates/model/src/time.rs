use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch, as carried by the exporter's
/// `{"$date": ...}` timestamp wrappers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeMs(pub i64);

impl TimeMs {
    #[must_use]
    pub fn millis(self) -> i64 {
        self.0
    }
}

impl From<i64> for TimeMs {
    fn from(ms: i64) -> Self {
        Self(ms)
    }
}

impl fmt::Display for TimeMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
