// File: src/persistence.rs
use crate::core::types::{RawToken, SchemeDetails};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Error, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Everything the in-memory engine keeps in its scheme file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeSnapshot {
    pub details: SchemeDetails,
    pub tokens: Vec<RawToken>,
}

/// Learned words and how often each was learned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedWords {
    pub words: BTreeMap<String, u32>,
}

/// Writes `value` next to `path` and renames it into place, so readers never
/// see a half-written file.
pub fn save_to_disk<T: Serialize>(value: &T, path: &Path) -> Result<(), Error> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, value).map_err(|e| Error::new(ErrorKind::Other, e))?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Reads the whole file first: lengths in a corrupt file are then checked
/// against the buffer instead of being allocated up front.
pub fn load_from_disk<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}
