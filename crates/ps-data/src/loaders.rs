use image::GrayImage;
use tracing::info;

use ps_types::{DataError, PsResult};

use crate::catalog::DatasetCatalog;

/// A decoded grayscale image paired with its ground-truth class.
#[derive(Debug, Clone)]
pub struct LabeledImage {
    pub pixels: GrayImage,
    pub label: String,
}

/// The in-memory dataset. Decoded once, then shared read-only across
/// workers; each candidate evaluation derives its own downsampled copy.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub images: Vec<LabeledImage>,
}

impl Dataset {
    /// Decode every catalogued image to 8-bit grayscale.
    pub fn load(catalog: &DatasetCatalog) -> PsResult<Self> {
        let mut images = Vec::with_capacity(catalog.len());

        for (entry, label) in catalog.entries.iter().zip(&catalog.labels) {
            let decoded = image::open(&entry.path).map_err(|e| DataError::ImageRead {
                path: entry.path.display().to_string(),
                message: e.to_string(),
            })?;
            images.push(LabeledImage {
                pixels: decoded.to_luma8(),
                label: label.clone(),
            });
        }

        info!("Loaded {} labeled images", images.len());
        Ok(Self { images })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.images.iter().map(|img| img.label.clone()).collect()
    }
}
