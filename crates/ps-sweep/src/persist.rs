//! Persistence of the winning (model, img_size) bundle.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use ps_types::{BestRecord, PsResult, SweepError};

/// Serializes the best model together with its selecting img_size as a
/// single JSON bundle on durable storage. Write-once at the end of a run;
/// a prior artifact at the same path is overwritten.
pub struct ModelPersister {
    path: PathBuf,
}

impl ModelPersister {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Write the bundle, creating parent directories as needed.
    ///
    /// Fails with `NoWinner` — and writes nothing — while the best record
    /// still carries the sentinel, i.e. no candidate ever beat the initial
    /// error threshold.
    pub fn persist(&self, best: &BestRecord) -> PsResult<PathBuf> {
        let (img_size, model) = best.winner()?;

        debug!("Saving best model...");
        let bundle = serde_json::json!({
            "img_size": img_size,
            "model": model,
        });
        let bytes = serde_json::to_vec_pretty(&bundle)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| SweepError::Persistence {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        fs::write(&self.path, bytes).map_err(|e| SweepError::Persistence {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        debug!("Model saved to {}", self.path.display());
        Ok(self.path.clone())
    }
}
