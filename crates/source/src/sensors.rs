use crate::error::{Result, SourceError};
use async_trait::async_trait;
use batchtrace_model::TimeMs;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the mandatory time column. Always carried in query results,
/// whatever the projection asks for.
pub const TIME_COLUMN: &str = "TIME";

pub const SENSOR_TABLE_SCHEMA_VERSION: u32 = 1;

/// One sampled row: a timestamp plus values aligned with the owning
/// frame's column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRow {
    pub time: TimeMs,
    pub values: Vec<f32>,
}

/// A tabular slice of sensor measurements, rows ordered by time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Sensor column names; the time column is implicit on each row.
    pub columns: Vec<String>,
    pub rows: Vec<SensorRow>,
}

impl SensorFrame {
    /// Full header with the leading time column.
    #[must_use]
    pub fn header(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.columns.len() + 1);
        out.push(TIME_COLUMN.to_string());
        out.extend(self.columns.iter().cloned());
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Boundary answering inclusive time-range queries over the measurement
/// table. `None` bounds are unbounded on that side.
#[async_trait]
pub trait SensorReader: Send + Sync {
    async fn time_query(
        &self,
        start: Option<TimeMs>,
        end: Option<TimeMs>,
        columns: Option<&[String]>,
    ) -> Result<SensorFrame>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSensorTable {
    schema_version: u32,
    columns: Vec<String>,
    rows: Vec<SensorRow>,
}

/// The full measurement table held in memory, rows sorted by time.
///
/// Range selection is a pair of binary searches over the time column, so
/// repeated window queries never re-read storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySensorTable {
    columns: Vec<String>,
    rows: Vec<SensorRow>,
}

impl MemorySensorTable {
    /// Builds a table from parts; rows are sorted by time on entry.
    #[must_use]
    pub fn new(columns: Vec<String>, mut rows: Vec<SensorRow>) -> Self {
        rows.sort_by_key(|r| r.time);
        Self { columns, rows }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let persisted: PersistedSensorTable = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != SENSOR_TABLE_SCHEMA_VERSION {
            return Err(SourceError::SchemaVersion {
                found: persisted.schema_version,
                expected: SENSOR_TABLE_SCHEMA_VERSION,
            });
        }
        log::info!(
            "loaded sensor table from {}: {} columns, {} rows",
            path.display(),
            persisted.columns.len(),
            persisted.rows.len()
        );
        Ok(Self::new(persisted.columns, persisted.rows))
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedSensorTable {
            schema_version: SENSOR_TABLE_SCHEMA_VERSION,
            columns: self.columns.clone(),
            rows: self.rows.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn range(&self, start: Option<TimeMs>, end: Option<TimeMs>) -> &[SensorRow] {
        let lo = match start {
            Some(s) => self.rows.partition_point(|r| r.time < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.rows.partition_point(|r| r.time <= e),
            None => self.rows.len(),
        };
        if lo >= hi {
            &[]
        } else {
            &self.rows[lo..hi]
        }
    }

    /// Column indices for a projection; `None` means all columns. The time
    /// column may be named but is carried regardless.
    fn projection(&self, columns: Option<&[String]>) -> Result<Option<Vec<usize>>> {
        let Some(requested) = columns else {
            return Ok(None);
        };
        let mut picks = Vec::with_capacity(requested.len());
        for name in requested {
            if name == TIME_COLUMN {
                continue;
            }
            let at = self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| SourceError::UnknownColumn(name.clone()))?;
            picks.push(at);
        }
        Ok(Some(picks))
    }
}

#[async_trait]
impl SensorReader for MemorySensorTable {
    async fn time_query(
        &self,
        start: Option<TimeMs>,
        end: Option<TimeMs>,
        columns: Option<&[String]>,
    ) -> Result<SensorFrame> {
        let picks = self.projection(columns)?;
        let window = self.range(start, end);
        let frame = match picks {
            None => SensorFrame {
                columns: self.columns.clone(),
                rows: window.to_vec(),
            },
            Some(picks) => SensorFrame {
                columns: picks.iter().map(|&i| self.columns[i].clone()).collect(),
                rows: window
                    .iter()
                    .map(|row| SensorRow {
                        time: row.time,
                        // ragged rows read as NaN rather than panicking
                        values: picks
                            .iter()
                            .map(|&i| row.values.get(i).copied().unwrap_or(f32::NAN))
                            .collect(),
                    })
                    .collect(),
            },
        };
        log::debug!(
            "time_query [{:?}, {:?}] -> {} rows x {} columns",
            start,
            end,
            frame.len(),
            frame.columns.len()
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn table() -> MemorySensorTable {
        MemorySensorTable::new(
            vec!["temp".to_string(), "pressure".to_string()],
            vec![
                SensorRow { time: TimeMs(100), values: vec![20.0, 1.0] },
                SensorRow { time: TimeMs(200), values: vec![21.0, 1.1] },
                SensorRow { time: TimeMs(300), values: vec![22.0, 1.2] },
                SensorRow { time: TimeMs(400), values: vec![23.0, 1.3] },
            ],
        )
    }

    #[tokio::test]
    async fn range_bounds_are_inclusive() {
        let frame = table()
            .time_query(Some(TimeMs(200)), Some(TimeMs(300)), None)
            .await
            .unwrap();
        let times: Vec<i64> = frame.rows.iter().map(|r| r.time.millis()).collect();
        assert_eq!(times, vec![200, 300]);
    }

    #[tokio::test]
    async fn open_bounds_reach_the_table_edges() {
        let t = table();
        let head = t.time_query(None, Some(TimeMs(200)), None).await.unwrap();
        assert_eq!(head.len(), 2);
        let tail = t.time_query(Some(TimeMs(300)), None, None).await.unwrap();
        assert_eq!(tail.len(), 2);
        let all = t.time_query(None, None, None).await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn empty_range_is_an_empty_frame() {
        let frame = table()
            .time_query(Some(TimeMs(500)), Some(TimeMs(600)), None)
            .await
            .unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.columns.len(), 2);
    }

    #[tokio::test]
    async fn projection_selects_and_orders_columns() {
        let wanted = vec!["pressure".to_string()];
        let frame = table().time_query(None, None, Some(&wanted)).await.unwrap();
        assert_eq!(frame.columns, vec!["pressure".to_string()]);
        assert_eq!(frame.rows[0].values, vec![1.0]);
        assert_eq!(frame.header(), vec!["TIME".to_string(), "pressure".into()]);
    }

    #[tokio::test]
    async fn naming_the_time_column_is_allowed() {
        let wanted = vec![TIME_COLUMN.to_string(), "temp".to_string()];
        let frame = table().time_query(None, None, Some(&wanted)).await.unwrap();
        assert_eq!(frame.columns, vec!["temp".to_string()]);
    }

    #[tokio::test]
    async fn unknown_column_is_rejected() {
        let wanted = vec!["flow".to_string()];
        let err = table().time_query(None, None, Some(&wanted)).await.unwrap_err();
        assert!(matches!(err, SourceError::UnknownColumn(name) if name == "flow"));
    }

    #[tokio::test]
    async fn rows_are_sorted_on_construction() {
        let t = MemorySensorTable::new(
            vec!["x".to_string()],
            vec![
                SensorRow { time: TimeMs(300), values: vec![3.0] },
                SensorRow { time: TimeMs(100), values: vec![1.0] },
            ],
        );
        let frame = t.time_query(None, None, None).await.unwrap();
        assert_eq!(frame.rows[0].time, TimeMs(100));
    }

    #[tokio::test]
    async fn table_roundtrips_through_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("SENSORS.json");
        let t = table();
        t.save(&path).await.unwrap();

        let loaded = MemorySensorTable::load(&path).await.unwrap();
        assert_eq!(loaded.columns(), t.columns());
        let a = t.time_query(None, None, None).await.unwrap();
        let b = loaded.time_query(None, None, None).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn stale_schema_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("SENSORS.json");
        std::fs::write(
            &path,
            r#"{"schema_version": 99, "columns": [], "rows": []}"#,
        )
        .unwrap();
        let err = MemorySensorTable::load(&path).await.unwrap_err();
        assert!(matches!(err, SourceError::SchemaVersion { found: 99, .. }));
    }
}
