// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// Saves and restores the JSON artifacts a preprocessing run
// leaves behind for the training loop:
//
//   prepared/
//     config.json    ← DataConfig (vocab object omitted)
//     scaler.json    ← fitted StandardScaler, if features exist
//     summary.json   ← counts and sizes of the prepared data
//     vocab.json     ← atom vocabulary (written by AtomVocab)
//
// The training side must normalise features with exactly the
// scaler fitted here, and size its output layer from
// vocab_output_size in config.json.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::data::scaler::StandardScaler;
use crate::domain::config::DataConfig;

pub const CONFIG_FILE:  &str = "config.json";
pub const SCALER_FILE:  &str = "scaler.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// All files are stored in the configured directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create the store, creating the directory if it doesn't exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_config(&self, cfg: &DataConfig) -> Result<PathBuf> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<DataConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_scaler(&self, scaler: &StandardScaler) -> Result<PathBuf> {
        self.write_json(SCALER_FILE, scaler)
    }

    pub fn load_scaler(&self) -> Result<StandardScaler> {
        self.read_json(SCALER_FILE)
    }

    pub fn save_summary<T: Serialize>(&self, summary: &T) -> Result<PathBuf> {
        self.write_json(SUMMARY_FILE, summary)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved '{}'", path.display());
        Ok(path)
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read '{}'. Make sure you have run 'prepare' first.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}
