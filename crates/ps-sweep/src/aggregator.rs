//! Submission-order result aggregation and best-candidate selection.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ps_types::{BestRecord, CandidateOutcome, SweepStatus};

use crate::pool::TaskHandle;

/// Collects one outcome per submitted task, in submission order, then
/// reduces the set to a single [`BestRecord`].
///
/// Draining pulls completed values by submission-order handles — blocking on
/// the next handle until it is ready — so the strict less-than tie-break is
/// reproducible regardless of worker scheduling jitter. The running
/// [`BestRecord`] is owned exclusively here; workers never touch it.
pub struct ResultAggregator {
    status: SweepStatus,
    task_timeout: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl ResultAggregator {
    pub fn new(task_timeout: Option<Duration>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            status: SweepStatus::new(),
            task_timeout,
            cancel,
        }
    }

    pub fn status(&self) -> &SweepStatus {
        &self.status
    }

    /// `Idle → Submitting`: tasks are being handed to the pool.
    pub fn begin_submitting(&mut self) {
        self.status.mark_submitting();
    }

    /// `Submitting → Draining`: consume every handle in submission order.
    ///
    /// Failures (evaluator errors, panics, timeouts) occupy their slot in
    /// the outcome list instead of aborting the drain. Once the
    /// cancellation token is set, the remaining slots are recorded as
    /// cancelled so a partial result set is surfaced instead of hanging.
    pub fn drain(&mut self, handles: Vec<TaskHandle>) -> Vec<CandidateOutcome> {
        let total = handles.len();
        self.status.mark_draining(total);

        let mut outcomes = Vec::with_capacity(total);
        for (position, handle) in handles.into_iter().enumerate() {
            let candidate = handle.candidate();
            let outcome = handle.wait_cancellable(&self.cancel, self.task_timeout);

            match &outcome {
                CandidateOutcome::Completed(eval) => {
                    self.status.completed += 1;
                    info!(
                        "[{}/{}] img_size {}: error {:.4} ({:.2}s)",
                        position + 1,
                        total,
                        candidate,
                        eval.error_rate,
                        eval.elapsed_seconds
                    );
                }
                CandidateOutcome::Failed { error, .. } => {
                    self.status.failed += 1;
                    warn!(
                        "[{}/{}] img_size {} failed: {}",
                        position + 1,
                        total,
                        candidate,
                        error
                    );
                }
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    /// `Draining → Finalizing → Done`: reduce outcomes to the final
    /// [`BestRecord`] via sequential scan in submission order.
    pub fn finalize(&mut self, outcomes: &[CandidateOutcome]) -> BestRecord {
        self.status.mark_finalizing();

        let mut best = BestRecord::new();
        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Completed(eval) => {
                    debug!("-----------");
                    debug!("Img size: {}", eval.candidate);
                    debug!("Error: {}", eval.error_rate);
                    debug!("Time: {:.2}s", eval.elapsed_seconds);
                    best.observe(eval);
                }
                CandidateOutcome::Failed { candidate, error } => {
                    debug!("-----------");
                    debug!("Img size: {candidate} (failed: {error})");
                }
            }
        }

        self.status.mark_done();
        best
    }
}
