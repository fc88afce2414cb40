use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const BUILTIN_PHOBIAS: &str = include_str!("../../data/phobias.json");
pub const BUILTIN_MANIAS: &str = include_str!("../../data/manias.json");

#[derive(Debug, Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct PhobiaFile {
    phobias: FxHashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ManiaFile {
    manias: FxHashMap<String, String>,
}

/// Phobia and mania descriptions keyed by their d100 roll (`"1"`..`"100"`).
///
/// Loaded once and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PhobiaManiaTables {
    phobias: FxHashMap<String, String>,
    manias: FxHashMap<String, String>,
}

impl PhobiaManiaTables {
    /// The tables compiled into the crate.
    pub fn builtin() -> Result<Self, TableError> {
        Self::parse_json(BUILTIN_PHOBIAS, BUILTIN_MANIAS)
    }

    /// Parse `{"phobias": {...}}` and `{"manias": {...}}` documents.
    pub fn parse_json(phobias: &str, manias: &str) -> Result<Self, TableError> {
        let phobias: PhobiaFile = serde_json::from_str(phobias)?;
        let manias: ManiaFile = serde_json::from_str(manias)?;
        tracing::info!(
            phobias = phobias.phobias.len(),
            manias = manias.manias.len(),
            "loaded phobia/mania tables"
        );
        Ok(Self {
            phobias: phobias.phobias,
            manias: manias.manias,
        })
    }

    /// Load `phobias.json` and `manias.json` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self, TableError> {
        let phobias = std::fs::read_to_string(dir.join("phobias.json"))?;
        let manias = std::fs::read_to_string(dir.join("manias.json"))?;
        Self::parse_json(&phobias, &manias)
    }

    pub fn phobia(&self, roll: i64) -> Option<&str> {
        self.phobias.get(&roll.to_string()).map(String::as_str)
    }

    pub fn mania(&self, roll: i64) -> Option<&str> {
        self.manias.get(&roll.to_string()).map(String::as_str)
    }

    pub fn phobia_count(&self) -> usize {
        self.phobias.len()
    }

    pub fn mania_count(&self) -> usize {
        self.manias.len()
    }
}
