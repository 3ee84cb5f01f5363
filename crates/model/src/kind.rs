use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named collection in the exported data set.
///
/// File stems are the exporter's own and are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Recipes,
    Steps,
    Sequences,
    Operations,
    Functions,
    Sensors,
    Operators,
}

impl Collection {
    /// File stem of the collection's JSON export (`<stem>.json`).
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Collection::Recipes => "RECETTES",
            Collection::Steps => "ETAPES",
            Collection::Sequences => "SEQUENCES",
            Collection::Operations => "OPERATIONS",
            Collection::Functions => "FONCTIONS",
            Collection::Sensors => "CAPTEURS",
            Collection::Operators => "OPERATEURS",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Recipes => "recipes",
            Collection::Steps => "steps",
            Collection::Sequences => "sequences",
            Collection::Operations => "operations",
            Collection::Functions => "functions",
            Collection::Sensors => "sensors",
            Collection::Operators => "operators",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four kinds that participate in the identifier hierarchy.
///
/// Sensor and operator records are reference data and never enter the
/// index; hierarchy between the four kinds is expressed solely through
/// identifier string prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Step,
    Sequence,
    Operation,
    Function,
}

impl EntityKind {
    /// Index build order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Step,
        EntityKind::Sequence,
        EntityKind::Operation,
        EntityKind::Function,
    ];

    /// Kinds whose records carry modification codes.
    pub const MODIFIED: [EntityKind; 3] = [
        EntityKind::Sequence,
        EntityKind::Operation,
        EntityKind::Function,
    ];

    #[must_use]
    pub fn collection(self) -> Collection {
        match self {
            EntityKind::Step => Collection::Steps,
            EntityKind::Sequence => Collection::Sequences,
            EntityKind::Operation => Collection::Operations,
            EntityKind::Function => Collection::Functions,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Step => "step",
            EntityKind::Sequence => "sequence",
            EntityKind::Operation => "operation",
            EntityKind::Function => "function",
        }
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "step" => Ok(EntityKind::Step),
            "sequence" => Ok(EntityKind::Sequence),
            "operation" => Ok(EntityKind::Operation),
            "function" => Ok(EntityKind::Function),
            other => Err(ModelError::InvalidKind {
                given: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
