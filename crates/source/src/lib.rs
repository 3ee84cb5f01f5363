//! Data-source boundaries: exported JSON record collections and the
//! time-indexed sensor measurement table.
//!
//! ```text
//! <data-root>/
//!   RECETTES.json   ETAPES.json      SEQUENCES.json   OPERATIONS.json
//!   FONCTIONS.json  CAPTEURS.json    OPERATEURS.json
//!   SENSORS.json                     (measurement table)
//! ```
//!
//! [`RecordSource`] loads one collection into a
//! [`LazyCollection`](batchtrace_collection::LazyCollection) of records;
//! [`SensorReader`] answers inclusive time-range queries over the
//! measurement table with optional column projection. Both come with a
//! file-backed implementation and an in-memory one.

mod error;
mod record_source;
mod sensors;

pub use error::{Result, SourceError};
pub use record_source::{JsonDirSource, MemorySource, RecordSource};
pub use sensors::{
    MemorySensorTable, SensorFrame, SensorReader, SensorRow, SENSOR_TABLE_SCHEMA_VERSION,
    TIME_COLUMN,
};
