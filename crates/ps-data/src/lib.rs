//! # ps-data
//!
//! Dataset cataloguing and image loading for PixelSweep.
//!
//! The catalog establishes the deterministic numeric ordering of the image
//! directory and validates it against the label file before any sweep task
//! is submitted. Loading decodes every image once; the resulting dataset is
//! shared read-only across workers.

pub mod catalog;
pub mod loaders;

pub use catalog::{DatasetCatalog, ImageEntry};
pub use loaders::{Dataset, LabeledImage};
