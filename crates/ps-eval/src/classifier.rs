//! Classifier seam between the sweep pipeline and the model algorithm.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use ps_types::{EvalError, PsResult};

/// Common trait for classifiers the pipeline can sweep over. The fitted
/// model crosses the orchestrator boundary only in its exported opaque
/// JSON form.
pub trait Classifier: Send {
    fn fit(&mut self, x: &[Vec<f32>], y: &[String]) -> PsResult<()>;

    fn predict(&self, x: &[Vec<f32>]) -> Vec<String>;

    /// Serialized form of the fitted model, carried through the sweep and
    /// persisted with the winning candidate.
    fn export(&self) -> serde_json::Value;
}

/// Randomized-subspace centroid ensemble.
///
/// Each member votes with a nearest-centroid rule over its own random
/// feature subset (`⌈√dim⌉` features, the usual subspace heuristic). The
/// member count maps to the configured estimator count, and every member's
/// subset is drawn from a seed derived from the candidate, so a given
/// (dataset, candidate) pair always trains the identical ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubspaceEnsemble {
    estimator_count: usize,
    seed: u64,
    members: Vec<EnsembleMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnsembleMember {
    /// Sorted indices of the features this member sees.
    features: Vec<usize>,
    centroids: Vec<Centroid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Centroid {
    label: String,
    values: Vec<f32>,
}

impl SubspaceEnsemble {
    pub fn new(estimator_count: usize, seed: u64) -> Self {
        Self {
            estimator_count,
            seed,
            members: Vec::new(),
        }
    }
}

impl EnsembleMember {
    /// Label of the nearest centroid over this member's feature subset.
    fn nearest(&self, row: &[f32]) -> Option<&str> {
        let mut best: Option<(&str, f32)> = None;
        for centroid in &self.centroids {
            let distance: f32 = self
                .features
                .iter()
                .zip(&centroid.values)
                .map(|(&fi, &c)| {
                    let d = row[fi] - c;
                    d * d
                })
                .sum();
            if best.map_or(true, |(_, current)| distance < current) {
                best = Some((&centroid.label, distance));
            }
        }
        best.map(|(label, _)| label)
    }
}

impl Classifier for SubspaceEnsemble {
    fn fit(&mut self, x: &[Vec<f32>], y: &[String]) -> PsResult<()> {
        if x.is_empty() || x.len() != y.len() {
            return Err(EvalError::FitFailed {
                message: format!("{} samples but {} labels", x.len(), y.len()),
            }
            .into());
        }
        let dim = x[0].len();
        if dim == 0 {
            return Err(EvalError::FitFailed {
                message: "samples have no features".into(),
            }
            .into());
        }
        let subspace = ((dim as f64).sqrt().ceil() as usize).clamp(1, dim);

        self.members.clear();
        for i in 0..self.estimator_count {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
            let mut features = rand::seq::index::sample(&mut rng, dim, subspace).into_vec();
            features.sort_unstable();

            // Per-class mean over the member's feature subset. BTreeMap
            // keeps class order deterministic.
            let mut sums: BTreeMap<&str, (Vec<f32>, usize)> = BTreeMap::new();
            for (row, label) in x.iter().zip(y) {
                let entry = sums
                    .entry(label.as_str())
                    .or_insert_with(|| (vec![0.0; subspace], 0));
                for (acc, &fi) in entry.0.iter_mut().zip(&features) {
                    *acc += row[fi];
                }
                entry.1 += 1;
            }
            let centroids = sums
                .into_iter()
                .map(|(label, (sum, count))| Centroid {
                    label: label.to_string(),
                    values: sum.into_iter().map(|v| v / count as f32).collect(),
                })
                .collect();

            self.members.push(EnsembleMember {
                features,
                centroids,
            });
        }
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Vec<String> {
        x.iter()
            .map(|row| {
                let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
                for member in &self.members {
                    if let Some(label) = member.nearest(row) {
                        *votes.entry(label).or_default() += 1;
                    }
                }
                // Strict > over the ascending key order resolves vote ties
                // to the lexicographically smallest label.
                let mut best: Option<(&str, usize)> = None;
                for (label, count) in votes {
                    if best.map_or(true, |(_, n)| count > n) {
                        best = Some((label, count));
                    }
                }
                best.map(|(label, _)| label.to_string()).unwrap_or_default()
            })
            .collect()
    }

    fn export(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
