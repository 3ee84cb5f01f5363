use crate::error::{QueryError, Result};
use batchtrace_index::ProcessIndex;
use batchtrace_model::{EntityKind, Record, TimeMs, WindowState};
use batchtrace_source::{SensorFrame, SensorReader};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A measurement slice together with the window completeness it was
/// computed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedMeasures {
    pub state: WindowState,
    pub frame: Option<SensorFrame>,
}

/// Correlates indexed records with the measurement table through their
/// reported execution window.
///
/// Partial windows degrade instead of failing: the missing side of the
/// query goes unbounded and the returned state names it. The one
/// exception is a function record without a start: functions are discrete
/// signals, so the slice is withheld rather than queried open-started.
/// Only a window with neither bound is an error, and that error is
/// per-call; the shared index stays untouched.
pub struct SensorCorrelator {
    index: Arc<ProcessIndex>,
    reader: Arc<dyn SensorReader>,
}

impl SensorCorrelator {
    #[must_use]
    pub fn new(index: Arc<ProcessIndex>, reader: Arc<dyn SensorReader>) -> Self {
        Self { index, reader }
    }

    /// Window completeness of a record, discreteness taken from its
    /// indexed kind.
    #[must_use]
    pub fn classify(&self, record: &Record) -> WindowState {
        let discrete = self.index.kind_of(record.id()) == Some(EntityKind::Function);
        WindowState::classify(record.window_start(), record.window_end(), discrete)
    }

    /// Measurements over the record's execution window, projected to
    /// `sensors` when given.
    pub async fn measures_for(
        &self,
        record: &Record,
        sensors: Option<&[String]>,
    ) -> Result<CorrelatedMeasures> {
        let start = record.window_start();
        let end = record.window_end();
        let state = self.classify(record);
        let frame = match state {
            WindowState::Complete => Some(self.reader.time_query(start, end, sensors).await?),
            WindowState::NoStart => {
                log::warn!("{} reports no execution start, slicing up to its end", record.id());
                Some(self.reader.time_query(None, end, sensors).await?)
            }
            WindowState::NoStartDiscrete => {
                log::warn!(
                    "{} is a discrete signal without an execution start, withholding measurements",
                    record.id()
                );
                return Ok(CorrelatedMeasures {
                    state: WindowState::NoStart,
                    frame: None,
                });
            }
            WindowState::NoEnd => {
                log::warn!("{} reports no execution end, slicing from its start", record.id());
                Some(self.reader.time_query(start, None, sensors).await?)
            }
            WindowState::Invalid => {
                return Err(QueryError::NoExecutionWindow {
                    id: record.id().to_string(),
                })
            }
        };
        Ok(CorrelatedMeasures { state, frame })
    }

    /// Measurements over an arbitrary interval; bounds inclusive, `None`
    /// unbounded.
    pub async fn measures_for_interval(
        &self,
        start: Option<TimeMs>,
        end: Option<TimeMs>,
        sensors: Option<&[String]>,
    ) -> Result<SensorFrame> {
        Ok(self.reader.time_query(start, end, sensors).await?)
    }
}
