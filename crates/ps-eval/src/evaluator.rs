//! The per-candidate evaluation pipeline.

use std::sync::Arc;
use std::time::Instant;

use image::imageops::{self, FilterType};
use tracing::debug;

use ps_data::Dataset;
use ps_types::{Candidate, EvalError, Evaluation, PsResult};

use crate::classifier::{Classifier, SubspaceEnsemble};
use crate::reduce::Pca;
use crate::split::split_point;

const TEST_FRACTION: f64 = 0.2;

/// Cap on PCA components, matching the pipeline's historical setting.
const MAX_PCA_COMPONENTS: usize = 7;

/// Pool-wide fixed options handed to every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalOptions {
    pub estimator_count: usize,
    pub use_pca: bool,

    /// Log a confusion matrix after scoring. Diagnostic only; the sweep
    /// runner forces this off for evaluators running inside the pool.
    pub log_confusion: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            estimator_count: ps_types::DEFAULT_ESTIMATOR_COUNT,
            use_pca: false,
            log_confusion: false,
        }
    }
}

/// The external collaborator contract the orchestrator calls once per
/// candidate. Implementations must be deterministic for fixed inputs.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation>;
}

/// Bin → flatten → (PCA) → fixed split → fit → score.
pub struct PipelineEvaluator {
    dataset: Arc<Dataset>,
    options: EvalOptions,
}

impl PipelineEvaluator {
    pub fn new(dataset: Arc<Dataset>, options: EvalOptions) -> Self {
        Self { dataset, options }
    }

    /// Every image binned to `size × size` and flattened to f32 features.
    fn binned_features(&self, size: u32) -> Vec<Vec<f32>> {
        self.dataset
            .images
            .iter()
            .map(|img| {
                let resized = imageops::resize(&img.pixels, size, size, FilterType::Triangle);
                resized.pixels().map(|p| f32::from(p.0[0])).collect()
            })
            .collect()
    }
}

impl Evaluator for PipelineEvaluator {
    fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation> {
        if candidate == 0 {
            return Err(EvalError::InvalidCandidate { candidate }.into());
        }

        let start = Instant::now();

        let mut x = self.binned_features(candidate);
        let y = self.dataset.labels();

        if self.options.use_pca {
            let n_components = x.len().min(MAX_PCA_COMPONENTS);
            x = Pca::fit_transform(&x, n_components)?;
        }

        let train = split_point(x.len(), TEST_FRACTION);
        if train == 0 {
            return Err(EvalError::EmptySplit {
                side: "train".into(),
                samples: x.len(),
            }
            .into());
        }
        if train == x.len() {
            return Err(EvalError::EmptySplit {
                side: "test".into(),
                samples: x.len(),
            }
            .into());
        }

        let mut classifier =
            SubspaceEnsemble::new(self.options.estimator_count, u64::from(candidate));
        classifier.fit(&x[..train], &y[..train])?;
        let predicted = classifier.predict(&x[train..]);

        let actual = &y[train..];
        let correct = actual
            .iter()
            .zip(&predicted)
            .filter(|(a, p)| a == p)
            .count();
        let error_rate = 1.0 - correct as f64 / actual.len() as f64;
        let elapsed_seconds = start.elapsed().as_secs_f64();

        debug!("Time taken to classify: {elapsed_seconds:.3} seconds");
        debug!("Classification error: {error_rate:.4}");

        if self.options.log_confusion {
            log_confusion(actual, &predicted);
        }

        Ok(Evaluation {
            candidate,
            elapsed_seconds,
            error_rate,
            model: classifier.export(),
        })
    }
}

/// Debug-level confusion matrix, rows = actual, columns = predicted.
fn log_confusion(actual: &[String], predicted: &[String]) {
    let mut classes: Vec<&str> = actual
        .iter()
        .chain(predicted.iter())
        .map(String::as_str)
        .collect();
    classes.sort_unstable();
    classes.dedup();

    debug!("Confusion matrix (columns: {:?})", classes);
    for row_class in &classes {
        let counts: Vec<usize> = classes
            .iter()
            .map(|col_class| {
                actual
                    .iter()
                    .zip(predicted)
                    .filter(|(a, p)| a.as_str() == *row_class && p.as_str() == *col_class)
                    .count()
            })
            .collect();
        debug!("  {:>12}: {:?}", row_class, counts);
    }
}
