use crate::time::TimeMs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Completeness of a record's reported execution window.
///
/// `NoStartDiscrete` marks function records that only report an end:
/// functions are discrete signals, so a slice over an open-started window
/// is meaningless and is withheld instead of queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Complete,
    NoStart,
    NoStartDiscrete,
    NoEnd,
    Invalid,
}

impl WindowState {
    /// Classifies a window from bound presence. `discrete` marks function
    /// records.
    #[must_use]
    pub fn classify(start: Option<TimeMs>, end: Option<TimeMs>, discrete: bool) -> Self {
        match (start, end) {
            (Some(_), Some(_)) => WindowState::Complete,
            (None, Some(_)) if discrete => WindowState::NoStartDiscrete,
            (None, Some(_)) => WindowState::NoStart,
            (Some(_), None) => WindowState::NoEnd,
            (None, None) => WindowState::Invalid,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WindowState::Complete => "complete",
            WindowState::NoStart => "no-start",
            WindowState::NoStartDiscrete => "no-start-discrete",
            WindowState::NoEnd => "no-end",
            WindowState::Invalid => "invalid",
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
