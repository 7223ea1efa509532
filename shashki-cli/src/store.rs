//! Weight store backed by a JSON file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use shashki_core::WeightStore;

/// Flat `{"w_man": 1.0, ...}` object, rewritten on every batch
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, f32>,
}

impl JsonFileStore {
    /// Open a store; a missing file reads as empty
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read weights: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse weights: {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write weights: {}", self.path.display()))
    }
}

impl WeightStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    fn put_all(&mut self, entries: &[(&str, f32)]) -> Result<()> {
        for &(key, value) in entries {
            self.values.insert(key.to_string(), value);
        }
        self.flush()
    }

    fn clear(&mut self) -> Result<()> {
        self.values.clear();
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove weights: {}", self.path.display()))?;
        }
        Ok(())
    }
}
