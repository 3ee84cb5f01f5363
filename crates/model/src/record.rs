use crate::error::ModelError;
use crate::time::TimeMs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved field names of the export contract.
///
/// Names are the exporter's own; they are part of the wire format and
/// must not be translated.
pub mod fields {
    /// Required unique identifier.
    pub const ID: &str = "id";
    /// Modification code; rewritten at index build time.
    pub const MODIFICATIONS: &str = "modifications";
    /// Execution window start.
    pub const TEMPS_EXECUTER: &str = "temps_executer";
    /// Execution window end.
    pub const TEMPS_TERMINER: &str = "temps_terminer";
    /// Human label; on operator records, the step label worked.
    pub const LIB: &str = "lib";
    /// Operator badge identifier.
    pub const CREATION: &str = "creation";
    /// Operator full name.
    pub const USER: &str = "user";
    /// Sensor name.
    pub const NOM: &str = "nom";
    /// Sensor measurement unit.
    pub const UNITE: &str = "unite";
    /// Sensor signal type.
    pub const TYPE: &str = "type";
    /// Owning step label on modification-bearing records.
    pub const ETAPE_ASSOCIEE: &str = "etape_associee";
    /// Operator-reported step start, `dd/mm/YYYY HH:MM:SS`.
    pub const DATE0: &str = "date0";
    /// Operator-reported step end, `dd/mm/YYYY HH:MM:SS`.
    pub const DATE1: &str = "date1";
}

/// Nested timestamp wrapper shape used by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateWrapper {
    #[serde(rename = "$date")]
    pub ms: TimeMs,
}

/// A single record field value.
///
/// The exporter emits JSON scalars plus the `{"$date": ms}` timestamp
/// wrapper; arrays and other nested documents are kept opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Timestamp(DateWrapper),
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Other(serde_json::Value),
}

impl FieldValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<TimeMs> {
        match self {
            FieldValue::Timestamp(w) => Some(w.ms),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<TimeMs> for FieldValue {
    fn from(t: TimeMs) -> Self {
        FieldValue::Timestamp(DateWrapper { ms: t })
    }
}

/// An immutable exported record: a string-keyed field map with a required
/// textual `id`.
///
/// Serialization round-trips the raw field map, so a record read from an
/// export and written back is byte-equivalent modulo key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, FieldValue>",
    into = "BTreeMap<String, FieldValue>"
)]
pub struct Record {
    id: String,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Builds a record from raw fields; `id` must be present and textual.
    pub fn from_fields(fields: BTreeMap<String, FieldValue>) -> Result<Self, ModelError> {
        let id = fields
            .get(fields::ID)
            .and_then(FieldValue::as_text)
            .ok_or(ModelError::MissingId)?
            .to_string();
        Ok(Self { id, fields })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Textual value of a field, when present and textual.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    /// Timestamp value of a field, when present and a `$date` wrapper.
    #[must_use]
    pub fn time(&self, name: &str) -> Option<TimeMs> {
        self.fields.get(name).and_then(FieldValue::as_time)
    }

    /// Reported execution window start.
    #[must_use]
    pub fn window_start(&self) -> Option<TimeMs> {
        self.time(fields::TEMPS_EXECUTER)
    }

    /// Reported execution window end.
    #[must_use]
    pub fn window_end(&self) -> Option<TimeMs> {
        self.time(fields::TEMPS_TERMINER)
    }

    /// Stored modification code.
    #[must_use]
    pub fn modification_code(&self) -> Option<&str> {
        self.text(fields::MODIFICATIONS)
    }

    /// Replaces the stored modification code. The index build uses this to
    /// strip the positional marker before grouping.
    pub fn set_modification_code(&mut self, code: impl Into<String>) {
        self.fields
            .insert(fields::MODIFICATIONS.to_string(), FieldValue::Text(code.into()));
    }

    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

impl TryFrom<BTreeMap<String, FieldValue>> for Record {
    type Error = ModelError;

    fn try_from(fields: BTreeMap<String, FieldValue>) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<Record> for BTreeMap<String, FieldValue> {
    fn from(record: Record) -> Self {
        record.fields
    }
}
