use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use ps_types::{DataError, PsResult};

/// One image in the dataset. The full path is recorded per entry so every
/// image is read from its own location, never from a stale directory cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Numeric label parsed from the filename stem; defines sort order.
    pub index: u64,
    pub path: PathBuf,
}

/// Numeric-ordered view of the image directory plus the aligned label file.
///
/// Ordering is ascending **numeric**, not lexical: `9.png` sorts before
/// `10.png`. The label file must carry exactly one class string per image,
/// in the same order.
#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    pub entries: Vec<ImageEntry>,
    pub labels: Vec<String>,
}

impl DatasetCatalog {
    /// Scan the image directory and label file, validating alignment.
    /// Any failure here is fatal and aborts the sweep before submission.
    pub fn scan(image_dir: &Path, label_path: &Path) -> PsResult<Self> {
        if !image_dir.is_dir() {
            return Err(DataError::DirectoryMissing {
                path: image_dir.display().to_string(),
            }
            .into());
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(image_dir)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let path = dir_entry.path();
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let index: u64 = stem.parse().map_err(|_| DataError::NonNumericName {
                name: dir_entry.file_name().to_string_lossy().into_owned(),
            })?;
            entries.push(ImageEntry { index, path });
        }

        if entries.is_empty() {
            return Err(DataError::EmptyDataset {
                path: image_dir.display().to_string(),
            }
            .into());
        }

        entries.sort_by_key(|entry| entry.index);

        let raw = fs::read_to_string(label_path).map_err(|_| DataError::LabelFileMissing {
            path: label_path.display().to_string(),
        })?;
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if labels.len() != entries.len() {
            return Err(DataError::LabelMismatch {
                images: entries.len(),
                labels: labels.len(),
            }
            .into());
        }

        debug!(
            "Catalogued {} labeled images under {}",
            entries.len(),
            image_dir.display()
        );

        Ok(Self { entries, labels })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
