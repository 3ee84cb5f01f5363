//! Query services over a built process index.
//!
//! Four entry points, all sharing the index through `Arc`:
//! [`Navigator`] resolves ids and prefix-scoped descendants,
//! [`ModificationSearch`] answers exact, suffix and chronologically
//! ranked code lookups, [`SensorCorrelator`] slices the measurement
//! table by a record's execution window, and [`Catalog`] serves the
//! non-indexed reference collections straight from the source. Failures
//! are per call and typed; no query ever mutates the shared index.

mod catalog;
mod correlator;
mod error;
mod navigator;
mod search;

pub use catalog::Catalog;
pub use correlator::{CorrelatedMeasures, SensorCorrelator};
pub use error::{QueryError, Result};
pub use navigator::Navigator;
pub use search::ModificationSearch;
