//! Sweep configuration surface.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{config_error, PsResult};

/// Default half-open img_size range: sizes 10 through 24.
pub const DEFAULT_SIZE_RANGE: (u32, u32) = (10, 25);

/// Sizes that have historically produced the lowest error rates; re-verified
/// on every sweep even when they fall inside the primary range.
pub const DEFAULT_SUPPLEMENTARY_SIZES: [u32; 4] = [14, 15, 16, 19];

pub const DEFAULT_ESTIMATOR_COUNT: usize = 240;
pub const DEFAULT_MAX_TASKS_PER_WORKER: usize = 3;

/// Top-level configuration for a sweep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Half-open candidate range `[low, high)`.
    pub image_size_range: (u32, u32),

    /// Extra sizes appended after the range. Overlap with the range is
    /// intentional re-verification, not a bug: each duplicate is evaluated
    /// independently.
    pub supplementary_sizes: Vec<u32>,

    /// Number of estimators handed to the classifier for every candidate.
    pub estimator_count: usize,

    /// Project features with PCA before fitting.
    pub use_pca: bool,

    /// Tasks a worker completes before it is retired and replaced, bounding
    /// memory growth from long-running numeric internals. `None` = unlimited.
    pub max_tasks_per_worker: Option<usize>,

    /// Pool size. `None` = host CPU concurrency.
    pub worker_count: Option<usize>,

    /// Per-candidate drain timeout in seconds. `None` = block until the
    /// task finishes. The clock starts when the drain reaches the
    /// candidate's slot, so earlier slots' drain time is not double
    /// counted against it.
    pub task_timeout_secs: Option<u64>,

    /// Directory of images whose filenames are numeric labels.
    pub image_dir: PathBuf,

    /// Ground-truth class file, one entry per line, in numeric image order.
    pub label_path: PathBuf,

    /// Where the winning (model, img_size) bundle is written.
    pub model_path: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            image_size_range: DEFAULT_SIZE_RANGE,
            supplementary_sizes: DEFAULT_SUPPLEMENTARY_SIZES.to_vec(),
            estimator_count: DEFAULT_ESTIMATOR_COUNT,
            use_pca: false,
            max_tasks_per_worker: Some(DEFAULT_MAX_TASKS_PER_WORKER),
            worker_count: None,
            task_timeout_secs: None,
            image_dir: PathBuf::from("data/images"),
            label_path: PathBuf::from("data/Y.txt"),
            model_path: PathBuf::from("models/best_model.json"),
        }
    }
}

impl SweepConfig {
    pub fn new(image_dir: PathBuf, label_path: PathBuf, model_path: PathBuf) -> Self {
        Self {
            image_dir,
            label_path,
            model_path,
            ..Self::default()
        }
    }

    pub fn with_size_range(mut self, low: u32, high: u32) -> Self {
        self.image_size_range = (low, high);
        self
    }

    pub fn with_supplementary_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.supplementary_sizes = sizes;
        self
    }

    pub fn with_estimator_count(mut self, n: usize) -> Self {
        self.estimator_count = n;
        self
    }

    pub fn with_pca(mut self, use_pca: bool) -> Self {
        self.use_pca = use_pca;
        self
    }

    pub fn with_max_tasks_per_worker(mut self, ceiling: Option<usize>) -> Self {
        self.max_tasks_per_worker = ceiling;
        self
    }

    pub fn with_worker_count(mut self, n: usize) -> Self {
        self.worker_count = Some(n);
        self
    }

    pub fn with_task_timeout_secs(mut self, seconds: Option<u64>) -> Self {
        self.task_timeout_secs = seconds;
        self
    }

    pub fn with_model_path(mut self, path: PathBuf) -> Self {
        self.model_path = path;
        self
    }

    /// Pool size after resolving `None` to the host CPU count.
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn validate(&self) -> PsResult<()> {
        let (low, high) = self.image_size_range;
        if low == 0 {
            return Err(config_error!("image sizes must be positive; range starts at 0"));
        }
        if low >= high {
            return Err(config_error!(
                "image_size_range low ({low}) must be below high ({high})"
            ));
        }
        if self.supplementary_sizes.iter().any(|&s| s == 0) {
            return Err(config_error!("supplementary sizes must be positive"));
        }
        if self.estimator_count == 0 {
            return Err(config_error!("estimator_count must be at least 1"));
        }
        if self.max_tasks_per_worker == Some(0) {
            return Err(config_error!(
                "max_tasks_per_worker must be positive (use unlimited instead of 0)"
            ));
        }
        if self.worker_count == Some(0) {
            return Err(config_error!("worker_count must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SweepConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.image_size_range, (10, 25));
        assert_eq!(config.supplementary_sizes, vec![14, 15, 16, 19]);
        assert_eq!(config.estimator_count, 240);
        assert!(!config.use_pca);
        assert_eq!(config.max_tasks_per_worker, Some(3));
    }

    #[test]
    fn builder_chain() {
        let config = SweepConfig::default()
            .with_size_range(8, 12)
            .with_supplementary_sizes(vec![10])
            .with_estimator_count(16)
            .with_pca(true)
            .with_worker_count(2);
        assert_eq!(config.image_size_range, (8, 12));
        assert_eq!(config.supplementary_sizes, vec![10]);
        assert_eq!(config.estimator_count, 16);
        assert!(config.use_pca);
        assert_eq!(config.resolved_worker_count(), 2);
    }

    #[test]
    fn rejects_inverted_range() {
        let config = SweepConfig::default().with_size_range(20, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_sizes() {
        let config = SweepConfig::default().with_size_range(0, 10);
        assert!(config.validate().is_err());

        let config = SweepConfig::default().with_supplementary_sizes(vec![14, 0]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_task_ceiling() {
        let config = SweepConfig::default().with_max_tasks_per_worker(Some(0));
        assert!(config.validate().is_err());

        let config = SweepConfig::default().with_max_tasks_per_worker(None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn resolved_worker_count_defaults_to_host() {
        let config = SweepConfig::default();
        assert!(config.resolved_worker_count() >= 1);
    }
}
