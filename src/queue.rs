//! Error queues exchanged as JSON.
//!
//! Each error class lives in its own file mapping an error id to its matrix
//! region, e.g. `{"3": {"start": 12000, "end": 15500}}`. Fields other than
//! `start` and `end` are ignored. Resolved plans are written back in the same
//! shape, keyed by the same ids and in the same order.

use crate::assembly::{write_atomic, InsertSide};
use crate::resolver::ErrorRegion;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid error queue {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// The structural error classes handled by the rectifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Translocation,
    Inversion,
    Debris,
}

impl ErrorClass {
    pub const ALL: [ErrorClass; 3] = [
        ErrorClass::Translocation,
        ErrorClass::Inversion,
        ErrorClass::Debris,
    ];

    /// File name of this class's queue inside an errors directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ErrorClass::Translocation => "translocation_error.json",
            ErrorClass::Inversion => "inversion_error.json",
            ErrorClass::Debris => "debris_error.json",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::Translocation => write!(f, "translocation"),
            ErrorClass::Inversion => write!(f, "inversion"),
            ErrorClass::Debris => write!(f, "debris"),
        }
    }
}

/// Error regions of one class, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorQueue {
    pub class: ErrorClass,
    pub entries: Vec<(String, ErrorRegion)>,
}

impl ErrorQueue {
    pub fn new(class: ErrorClass) -> Self {
        Self {
            class,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = ErrorRegion> + '_ {
        self.entries.iter().map(|(_, region)| *region)
    }

    /// Parse a queue from JSON text.
    pub fn from_json(class: ErrorClass, text: &str) -> serde_json::Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(text)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (id, value) in raw {
            entries.push((id, serde_json::from_value(value)?));
        }
        Ok(Self { class, entries })
    }

    /// Read `dir/<class file>`. A missing file means no errors of this class.
    pub fn read_dir(dir: &Path, class: ErrorClass) -> Result<Option<Self>> {
        let path = dir.join(class.file_name());
        if !path.exists() {
            info!(%class, "no error queue");
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let queue = Self::from_json(class, &text).map_err(|source| QueueError::Json {
            path: path.clone(),
            source,
        })?;
        info!(%class, errors = queue.len(), path = %path.display(), "loaded error queue");
        Ok(Some(queue))
    }
}

/// Where a translocated region goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslocationPlan {
    pub start: u64,
    pub end: u64,
    pub moves_ctg: Vec<String>,
    pub insert_site: String,
    pub direction: InsertSide,
}

/// Contigs of an inverted region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InversionPlan {
    pub start: u64,
    pub end: u64,
    pub inv_ctg: Vec<String>,
}

/// Contigs of a debris region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebrisPlan {
    pub start: u64,
    pub end: u64,
    pub deb_ctg: Vec<String>,
}

/// Render plans keyed by error id, keeping their order.
pub fn plans_to_json<T: Serialize>(plans: &[(String, T)]) -> serde_json::Result<Value> {
    let mut map = Map::with_capacity(plans.len());
    for (id, plan) in plans {
        map.insert(id.clone(), serde_json::to_value(plan)?);
    }
    Ok(Value::Object(map))
}

/// Write plans as pretty-printed JSON, replacing `path` atomically.
pub fn write_plans<T: Serialize>(path: &Path, plans: &[(String, T)]) -> Result<()> {
    let value = plans_to_json(plans).map_err(|source| QueueError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, &value)?;
        writeln!(out)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_keeps_file_order() {
        let text = r#"{"7": {"start": 500, "end": 900, "score": 0.9},
                       "2": {"start": 10, "end": 40}}"#;
        let queue = ErrorQueue::from_json(ErrorClass::Inversion, text).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.entries[0].0, "7");
        assert_eq!(queue.entries[0].1, ErrorRegion::new(500, 900));
        assert_eq!(queue.entries[1].1, ErrorRegion::new(10, 40));
    }

    #[test]
    fn test_read_dir_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        assert!(ErrorQueue::read_dir(dir.path(), ErrorClass::Debris)
            .unwrap()
            .is_none());

        fs::write(dir.path().join("debris_error.json"), "{\"1\": {\"start\": 1}}").unwrap();
        let err = ErrorQueue::read_dir(dir.path(), ErrorClass::Debris).unwrap_err();
        assert!(matches!(err, QueueError::Json { .. }));
    }

    #[test]
    fn test_write_translocation_plans() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plans.json");
        let plans = vec![(
            "1".to_string(),
            TranslocationPlan {
                start: 100,
                end: 200,
                moves_ctg: vec!["A:::fragment_2".to_string()],
                insert_site: "C".to_string(),
                direction: InsertSide::Left,
            },
        )];
        write_plans(&path, &plans).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["1"]["direction"], "left");
        assert_eq!(value["1"]["moves_ctg"][0], "A:::fragment_2");
        assert_eq!(value["1"]["insert_site"], "C");
    }
}
