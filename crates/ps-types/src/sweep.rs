//! Sweep result tracking and best-candidate selection state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PsResult, SweepError};

/// One value of the swept hyperparameter (the image-binning size).
pub type Candidate = u32;

/// Initial `least_error`; guaranteed to be beaten by any valid error rate
/// since error rates live in [0, 1].
pub const ERROR_SENTINEL: f64 = 100.0;

/// `best_candidate` value meaning "no winner found yet".
pub const CANDIDATE_SENTINEL: i64 = -1;

/// Result of one candidate evaluation. Produced exactly once per submitted
/// candidate; immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub candidate: Candidate,

    /// Wall-clock seconds the train/evaluate pipeline took for this size.
    pub elapsed_seconds: f64,

    /// Misclassification rate on the held-out split, in [0, 1].
    pub error_rate: f64,

    /// Opaque trained-model handle. Stored as JSON so the orchestrator
    /// never depends on classifier internals.
    pub model: serde_json::Value,
}

/// Per-slot record kept by the aggregator: either a completed evaluation or
/// a surfaced failure for that candidate. Failures are excluded from
/// best-selection but stay in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateOutcome {
    Completed(Evaluation),
    Failed { candidate: Candidate, error: String },
}

impl CandidateOutcome {
    pub fn candidate(&self) -> Candidate {
        match self {
            Self::Completed(eval) => eval.candidate,
            Self::Failed { candidate, .. } => *candidate,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Running best-so-far state, owned exclusively by the aggregator and
/// updated in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRecord {
    pub least_error: f64,
    pub best_candidate: i64,
    pub best_model: Option<serde_json::Value>,
}

impl BestRecord {
    pub fn new() -> Self {
        Self {
            least_error: ERROR_SENTINEL,
            best_candidate: CANDIDATE_SENTINEL,
            best_model: None,
        }
    }

    /// Strict less-than update: the first candidate in traversal order to
    /// reach a given error keeps the win; later equal-or-worse results
    /// never overwrite it.
    pub fn observe(&mut self, eval: &Evaluation) {
        if eval.error_rate < self.least_error {
            self.least_error = eval.error_rate;
            self.best_candidate = i64::from(eval.candidate);
            self.best_model = Some(eval.model.clone());
        }
    }

    pub fn has_winner(&self) -> bool {
        self.best_candidate != CANDIDATE_SENTINEL
    }

    /// The winning (img_size, model) pair, or `NoWinner` while the
    /// sentinel is still in place.
    pub fn winner(&self) -> PsResult<(Candidate, &serde_json::Value)> {
        match &self.best_model {
            Some(model) if self.has_winner() => Ok((self.best_candidate as Candidate, model)),
            _ => Err(SweepError::NoWinner.into()),
        }
    }
}

impl Default for BestRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state for a sweep run. No transition skips `Draining`;
/// `Finalizing` only begins once every submitted handle has yielded a
/// result or a surfaced failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SweepState {
    Idle,
    Submitting,
    Draining,
    Finalizing,
    Done,
    Failed,
}

/// Aggregate status of a sweep run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepStatus {
    pub id: Uuid,
    pub state: SweepState,
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl SweepStatus {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SweepState::Idle,
            submitted: 0,
            completed: 0,
            failed: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn mark_submitting(&mut self) {
        self.state = SweepState::Submitting;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_draining(&mut self, submitted: usize) {
        self.state = SweepState::Draining;
        self.submitted = submitted;
    }

    pub fn mark_finalizing(&mut self) {
        self.state = SweepState::Finalizing;
    }

    pub fn mark_done(&mut self) {
        self.state = SweepState::Done;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.state = SweepState::Failed;
        self.finished_at = Some(Utc::now());
        self.error = Some(error);
    }

    pub fn outstanding(&self) -> usize {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}

impl Default for SweepStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Final report for a finished sweep: the reduced best record plus the full
/// ordered outcome list for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub best: BestRecord,
    /// One entry per submitted candidate, in submission order.
    pub outcomes: Vec<CandidateOutcome>,
    pub total_seconds: f64,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(candidate: Candidate, error_rate: f64) -> Evaluation {
        Evaluation {
            candidate,
            elapsed_seconds: 1.0,
            error_rate,
            model: serde_json::json!({ "size": candidate }),
        }
    }

    #[test]
    fn best_record_starts_at_sentinels() {
        let best = BestRecord::new();
        assert_eq!(best.least_error, 100.0);
        assert_eq!(best.best_candidate, -1);
        assert!(best.best_model.is_none());
        assert!(!best.has_winner());
        assert!(best.winner().is_err());
    }

    #[test]
    fn observe_tracks_minimum() {
        let mut best = BestRecord::new();
        best.observe(&eval(10, 0.4));
        best.observe(&eval(11, 0.2));
        best.observe(&eval(12, 0.3));

        assert_eq!(best.best_candidate, 11);
        assert_eq!(best.least_error, 0.2);
        let (winner, model) = best.winner().unwrap();
        assert_eq!(winner, 11);
        assert_eq!(model, &serde_json::json!({ "size": 11 }));
    }

    #[test]
    fn ties_keep_first_in_traversal_order() {
        let mut best = BestRecord::new();
        best.observe(&eval(14, 0.25));
        best.observe(&eval(19, 0.25));

        assert_eq!(best.best_candidate, 14);
        assert_eq!(
            best.best_model.as_ref().unwrap(),
            &serde_json::json!({ "size": 14 })
        );
    }

    #[test]
    fn worse_results_never_overwrite() {
        let mut best = BestRecord::new();
        best.observe(&eval(15, 0.1));
        best.observe(&eval(16, 0.5));
        assert_eq!(best.best_candidate, 15);
        assert_eq!(best.least_error, 0.1);
    }

    #[test]
    fn any_valid_error_beats_the_sentinel() {
        let mut best = BestRecord::new();
        best.observe(&eval(10, 1.0));
        assert!(best.has_winner());
        assert_eq!(best.best_candidate, 10);
    }

    #[test]
    fn status_lifecycle() {
        let mut status = SweepStatus::new();
        assert_eq!(status.state, SweepState::Idle);
        assert!(status.started_at.is_none());

        status.mark_submitting();
        assert_eq!(status.state, SweepState::Submitting);
        assert!(status.started_at.is_some());

        status.mark_draining(19);
        assert_eq!(status.state, SweepState::Draining);
        assert_eq!(status.outstanding(), 19);

        status.completed = 18;
        status.failed = 1;
        status.mark_finalizing();
        assert_eq!(status.outstanding(), 0);

        status.mark_done();
        assert_eq!(status.state, SweepState::Done);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn status_failure_records_message() {
        let mut status = SweepStatus::new();
        status.mark_submitting();
        status.mark_failed("dataset missing".into());
        assert_eq!(status.state, SweepState::Failed);
        assert_eq!(status.error.as_deref(), Some("dataset missing"));
    }

    #[test]
    fn outcome_accessors() {
        let ok = CandidateOutcome::Completed(eval(12, 0.3));
        let bad = CandidateOutcome::Failed {
            candidate: 13,
            error: "boom".into(),
        };
        assert_eq!(ok.candidate(), 12);
        assert_eq!(bad.candidate(), 13);
        assert!(!ok.is_failed());
        assert!(bad.is_failed());
    }
}
