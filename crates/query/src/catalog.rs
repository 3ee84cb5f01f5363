use crate::error::{QueryError, Result};
use batchtrace_model::{fields, Collection, Record, TimeMs};
use batchtrace_source::RecordSource;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Wall-clock format of operator-reported step dates.
const OPERATOR_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Lookups over the reference collections that never enter the index:
/// recipes, sensors and operators.
///
/// Every call builds a fresh pipeline against the source, so results
/// follow the data on disk; callers needing repeated idempotent access
/// materialize once and keep the result.
pub struct Catalog {
    source: Arc<dyn RecordSource>,
}

impl Catalog {
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    /// The recipe collection, in export order.
    pub async fn recipes(&self) -> Result<Vec<Record>> {
        Ok(self.source.load(Collection::Recipes).await?.materialize())
    }

    /// `nom` of every sensor record, records without one skipped.
    pub async fn sensor_names(&self) -> Result<Vec<String>> {
        Ok(self
            .source
            .load(Collection::Sensors)
            .await?
            .map(|r| r.text(fields::NOM).map(str::to_string))
            .flatten()
            .materialize())
    }

    /// Unit and signal type of the sensors named `name`, flattened in
    /// that order per record; absent fields are skipped.
    pub async fn sensor_unit_type(&self, name: &str) -> Result<Vec<String>> {
        let name = name.to_string();
        Ok(self
            .source
            .load(Collection::Sensors)
            .await?
            .filter(move |r| r.text(fields::NOM) == Some(name.as_str()))
            .map(|r| {
                [fields::UNITE, fields::TYPE]
                    .into_iter()
                    .filter_map(|f| r.text(f).map(str::to_string))
                    .collect::<Vec<_>>()
            })
            .flatten()
            .materialize())
    }

    /// Badge identifier of every operator record.
    pub async fn operator_badges(&self) -> Result<Vec<String>> {
        Ok(self
            .source
            .load(Collection::Operators)
            .await?
            .map(|r| r.text(fields::CREATION).map(str::to_string))
            .flatten()
            .materialize())
    }

    /// Operators who worked the step labelled `step_lib`; `full_names`
    /// selects the `user` field over the badge.
    pub async fn operators_of_step(&self, step_lib: &str, full_names: bool) -> Result<Vec<String>> {
        let field = if full_names { fields::USER } else { fields::CREATION };
        let step = step_lib.to_string();
        Ok(self
            .source
            .load(Collection::Operators)
            .await?
            .filter(move |r| r.text(fields::LIB) == Some(step.as_str()))
            .map(move |r| r.text(field).map(str::to_string))
            .flatten()
            .materialize())
    }

    /// Operator records mentioning the step labelled `step_lib`.
    pub async fn operator_records_of_step(&self, step_lib: &str) -> Result<Vec<Record>> {
        let step = step_lib.to_string();
        Ok(self
            .source
            .load(Collection::Operators)
            .await?
            .filter(move |r| r.text(fields::LIB) == Some(step.as_str()))
            .materialize())
    }

    /// The step's execution window as reported by its operator record:
    /// `date0` / `date1` parsed as naive UTC wall-clock dates. Several
    /// records for one step keep the last after a warning.
    pub async fn step_window_from_operators(&self, step_lib: &str) -> Result<(TimeMs, TimeMs)> {
        let records = self.operator_records_of_step(step_lib).await?;
        if records.len() > 1 {
            log::warn!(
                "{} operator records mention step {:?}, keeping the last",
                records.len(),
                step_lib
            );
        }
        let record = records.last().ok_or_else(|| QueryError::StepNotWorked {
            step: step_lib.to_string(),
        })?;
        let start = parse_operator_date(record, step_lib, fields::DATE0)?;
        let end = parse_operator_date(record, step_lib, fields::DATE1)?;
        Ok((start, end))
    }
}

fn parse_operator_date(record: &Record, step: &str, field: &'static str) -> Result<TimeMs> {
    let raw = record
        .text(field)
        .ok_or_else(|| QueryError::MissingOperatorDate {
            step: step.to_string(),
            field,
        })?;
    let parsed =
        NaiveDateTime::parse_from_str(raw, OPERATOR_DATE_FORMAT).map_err(|source| {
            QueryError::OperatorDate {
                step: step.to_string(),
                value: raw.to_string(),
                source,
            }
        })?;
    Ok(TimeMs(parsed.and_utc().timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchtrace_source::MemorySource;
    use pretty_assertions::assert_eq;

    fn record(json: &str) -> Record {
        serde_json::from_str(json).unwrap()
    }

    fn sample_catalog() -> Catalog {
        let source = MemorySource::new()
            .with(
                Collection::Recipes,
                vec![record(r#"{"id": "R1", "lib": "standard run"}"#)],
            )
            .with(
                Collection::Sensors,
                vec![
                    record(r#"{"id": "C1", "nom": "temp", "unite": "degC", "type": "analog"}"#),
                    record(r#"{"id": "C2", "nom": "pressure", "unite": "bar", "type": "analog"}"#),
                    record(r#"{"id": "C3", "nom": "door", "type": "digital"}"#),
                ],
            )
            .with(
                Collection::Operators,
                vec![
                    record(
                        r#"{"id": "O1", "lib": "heat", "creation": "b-100",
                            "user": "R. Dupont", "date0": "01/01/1970 00:00:00",
                            "date1": "01/01/1970 01:00:00"}"#,
                    ),
                    record(
                        r#"{"id": "O2", "lib": "cool", "creation": "b-200",
                            "user": "A. Martin", "date0": "01/02/2023 10:30:00",
                            "date1": "01/02/2023 11:00:00"}"#,
                    ),
                    record(
                        r#"{"id": "O3", "lib": "heat", "creation": "b-300",
                            "user": "L. Petit", "date0": "02/01/1970 00:00:00",
                            "date1": "02/01/1970 01:00:00"}"#,
                    ),
                ],
            );
        Catalog::new(Arc::new(source))
    }

    fn catalog_with_operators(records: Vec<Record>) -> Catalog {
        let source = MemorySource::new().with(Collection::Operators, records);
        Catalog::new(Arc::new(source))
    }

    #[tokio::test]
    async fn recipes_come_back_in_export_order() {
        let catalog = sample_catalog();
        let recipes = catalog.recipes().await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].id(), "R1");
    }

    #[tokio::test]
    async fn sensor_names_list_every_named_sensor() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.sensor_names().await.unwrap(),
            ["temp", "pressure", "door"]
        );
    }

    #[tokio::test]
    async fn sensor_unit_type_pairs_unit_then_type() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.sensor_unit_type("temp").await.unwrap(),
            ["degC", "analog"]
        );
        // a sensor without a unit still reports its type
        assert_eq!(catalog.sensor_unit_type("door").await.unwrap(), ["digital"]);
        assert!(catalog.sensor_unit_type("flow").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn operator_badges_span_all_steps() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.operator_badges().await.unwrap(),
            ["b-100", "b-200", "b-300"]
        );
    }

    #[tokio::test]
    async fn operators_of_step_picks_badge_or_full_name() {
        let catalog = sample_catalog();
        assert_eq!(
            catalog.operators_of_step("heat", false).await.unwrap(),
            ["b-100", "b-300"]
        );
        assert_eq!(
            catalog.operators_of_step("heat", true).await.unwrap(),
            ["R. Dupont", "L. Petit"]
        );
        assert!(catalog.operators_of_step("dry", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn step_window_parses_day_first_dates() {
        let catalog = sample_catalog();
        let (start, end) = catalog.step_window_from_operators("cool").await.unwrap();
        assert_eq!(start, TimeMs(1_675_247_400_000));
        assert_eq!(end, TimeMs(1_675_249_200_000));
    }

    #[tokio::test]
    async fn duplicate_step_records_keep_the_last() {
        let catalog = sample_catalog();
        // "heat" appears on O1 and O3; O3 wins
        let (start, end) = catalog.step_window_from_operators("heat").await.unwrap();
        assert_eq!(start, TimeMs(86_400_000));
        assert_eq!(end, TimeMs(90_000_000));
    }

    #[tokio::test]
    async fn unworked_step_is_a_typed_error() {
        let catalog = sample_catalog();
        let err = catalog.step_window_from_operators("dry").await.unwrap_err();
        assert!(
            matches!(&err, QueryError::StepNotWorked { step } if step == "dry"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn missing_operator_date_names_the_field() {
        let catalog = catalog_with_operators(vec![record(
            r#"{"id": "O9", "lib": "rinse", "date0": "01/01/1970 00:00:00"}"#,
        )]);
        let err = catalog.step_window_from_operators("rinse").await.unwrap_err();
        match err {
            QueryError::MissingOperatorDate { step, field } => {
                assert_eq!(step, "rinse");
                assert_eq!(field, fields::DATE1);
            }
            other => panic!("expected MissingOperatorDate, got {other}"),
        }
    }

    #[tokio::test]
    async fn unparseable_operator_date_echoes_the_value() {
        let catalog = catalog_with_operators(vec![record(
            r#"{"id": "O9", "lib": "rinse", "date0": "1970-01-01 00:00",
                "date1": "01/01/1970 01:00:00"}"#,
        )]);
        let err = catalog.step_window_from_operators("rinse").await.unwrap_err();
        assert!(matches!(&err, QueryError::OperatorDate { .. }), "{err}");
        assert!(err.to_string().contains("1970-01-01 00:00"));
    }
}
