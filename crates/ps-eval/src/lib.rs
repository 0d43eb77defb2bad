//! # ps-eval
//!
//! Per-candidate train/evaluate pipeline for PixelSweep.
//!
//! Given one img_size candidate, the pipeline bins every dataset image to
//! `size × size`, flattens the pixels into features, optionally projects
//! them with PCA, fits the configured classifier on a fixed non-shuffled
//! 80/20 split, and scores the held-out tail. Everything is deterministic
//! for a given dataset and candidate; internal randomness is seeded from
//! the candidate value so repeated sweeps are comparable.
//!
//! The orchestrator only sees the [`Evaluator`] trait.

pub mod classifier;
pub mod evaluator;
pub mod reduce;
pub mod split;

pub use classifier::{Classifier, SubspaceEnsemble};
pub use evaluator::{EvalOptions, Evaluator, PipelineEvaluator};
pub use reduce::Pca;
pub use split::split_point;
