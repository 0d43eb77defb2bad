//! End-to-end sweep orchestration.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use ps_data::{Dataset, DatasetCatalog};
use ps_eval::{EvalOptions, Evaluator, PipelineEvaluator};
use ps_types::{PsError, PsResult, SweepConfig, SweepError, SweepReport};

use crate::aggregator::ResultAggregator;
use crate::generator::candidate_schedule;
use crate::persist::ModelPersister;
use crate::pool::WorkerPool;

/// Drives a full sweep: dataset validation, fan-out over the worker pool,
/// submission-order aggregation, best-candidate selection, persistence,
/// and the final summary.
pub struct SweepRunner {
    config: SweepConfig,
    cancel: Arc<AtomicBool>,
}

impl SweepRunner {
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Token a shutdown handler can set to stop the drain early and
    /// surface partial results.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Run the sweep against the configured on-disk dataset.
    pub fn run(&self) -> PsResult<SweepReport> {
        self.config.validate()?;

        // Dataset problems are fatal before any task is submitted.
        let catalog = DatasetCatalog::scan(&self.config.image_dir, &self.config.label_path)?;
        let dataset = Arc::new(Dataset::load(&catalog)?);

        let options = EvalOptions {
            estimator_count: self.config.estimator_count,
            use_pca: self.config.use_pca,
            // Rendering diagnostics from concurrent workers is unsafe;
            // always off inside the pool.
            log_confusion: false,
        };
        let evaluator = Arc::new(PipelineEvaluator::new(dataset, options));
        self.run_with_evaluator(evaluator)
    }

    /// Orchestrate the sweep with an arbitrary evaluator. This is the seam
    /// the end-to-end tests drive with deterministic stubs.
    pub fn run_with_evaluator(&self, evaluator: Arc<dyn Evaluator>) -> PsResult<SweepReport> {
        self.config.validate()?;

        info!("Finding optimized parameters...");
        info!("---------------");
        let start = Instant::now();

        let candidates = candidate_schedule(&self.config);
        let workers = self.config.resolved_worker_count();
        info!(
            "Sweeping {} candidates across {} workers",
            candidates.len(),
            workers
        );

        let mut pool = WorkerPool::new(
            workers,
            self.config.max_tasks_per_worker,
            Arc::clone(&self.cancel),
        )?;
        let mut aggregator = ResultAggregator::new(
            self.config.task_timeout_secs.map(Duration::from_secs),
            Arc::clone(&self.cancel),
        );

        aggregator.begin_submitting();
        let mut handles = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let evaluator = Arc::clone(&evaluator);
            handles.push(pool.submit(candidate, move || evaluator.evaluate(candidate))?);
        }
        // No further submissions; queued tasks still run.
        pool.close();

        let outcomes = aggregator.drain(handles);
        let best = aggregator.finalize(&outcomes);
        pool.join();

        let completed = outcomes.iter().filter(|o| !o.is_failed()).count();
        let failed = outcomes.len() - completed;
        let report = SweepReport {
            best,
            outcomes,
            total_seconds: start.elapsed().as_secs_f64(),
            completed,
            failed,
        };

        let persister = ModelPersister::new(self.config.model_path.clone());
        match persister.persist(&report.best) {
            Ok(path) => info!("Model saved to {}", path.display()),
            Err(err) => {
                if let PsError::Sweep(SweepError::Persistence { .. }) = &err {
                    // Keep the numeric result visible even though saving
                    // failed.
                    error!("{err}");
                    log_summary(&report);
                }
                return Err(err);
            }
        }

        log_summary(&report);
        Ok(report)
    }
}

fn log_summary(report: &SweepReport) {
    info!("------------------------------");
    info!("Best error rate: {}", report.best.least_error);
    info!("Best img size: {}", report.best.best_candidate);
    info!(
        "Total time: {:.2}s ({} ok, {} failed)",
        report.total_seconds, report.completed, report.failed
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ps_types::{Candidate, CandidateOutcome, EvalError, Evaluation};
    use std::fs;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    /// Deterministic stub: error rate decreases-then-increases around a
    /// configurable optimum, so the expected winner is known up front.
    struct StubEvaluator {
        optimum: Candidate,
    }

    impl Evaluator for StubEvaluator {
        fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation> {
            let distance = candidate.abs_diff(self.optimum) as f64;
            Ok(Evaluation {
                candidate,
                elapsed_seconds: 0.01,
                error_rate: (0.2 + distance * 0.1).min(1.0),
                model: serde_json::json!({ "stub": candidate }),
            })
        }
    }

    /// Stub that fails every candidate.
    struct AlwaysFailing;

    impl Evaluator for AlwaysFailing {
        fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation> {
            Err(EvalError::InvalidCandidate { candidate }.into())
        }
    }

    fn test_config(tmp: &TempDir) -> SweepConfig {
        SweepConfig::default()
            .with_size_range(10, 13)
            .with_supplementary_sizes(Vec::new())
            .with_worker_count(3)
            .with_max_tasks_per_worker(Some(2))
            .with_model_path(tmp.path().join("best_model.json"))
    }

    #[test]
    fn end_to_end_selects_the_lowest_error_candidate() {
        let tmp = TempDir::new().unwrap();
        let runner = SweepRunner::new(test_config(&tmp));

        let report = runner
            .run_with_evaluator(Arc::new(StubEvaluator { optimum: 10 }))
            .unwrap();

        assert_eq!(report.best.best_candidate, 10);
        assert!((report.best.least_error - 0.2).abs() < 1e-9);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.completed, 3);
        assert_eq!(report.failed, 0);

        // The artifact carries the winning pair.
        let raw = fs::read_to_string(tmp.path().join("best_model.json")).unwrap();
        let bundle: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(bundle["img_size"], 10);
        assert_eq!(bundle["model"]["stub"], 10);
    }

    #[test]
    fn repeated_runs_agree_on_the_winner() {
        let tmp = TempDir::new().unwrap();
        let runner = SweepRunner::new(test_config(&tmp));
        let evaluator = Arc::new(StubEvaluator { optimum: 11 });

        let first = runner.run_with_evaluator(evaluator.clone()).unwrap();
        let second = runner.run_with_evaluator(evaluator).unwrap();

        assert_eq!(first.best.best_candidate, second.best.best_candidate);
        assert_eq!(first.best.least_error, second.best.least_error);
    }

    #[test]
    fn duplicate_supplementary_candidates_are_reported_separately() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp)
            .with_size_range(10, 15)
            .with_supplementary_sizes(vec![14]);
        let runner = SweepRunner::new(config);

        let report = runner
            .run_with_evaluator(Arc::new(StubEvaluator { optimum: 14 }))
            .unwrap();

        // 5 range candidates + the duplicate 14.
        assert_eq!(report.outcomes.len(), 6);
        let fourteens = report
            .outcomes
            .iter()
            .filter(|o| o.candidate() == 14)
            .count();
        assert_eq!(fourteens, 2);
        assert_eq!(report.best.best_candidate, 14);
    }

    #[test]
    fn all_failures_abort_with_no_winner_and_no_artifact() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let model_path = config.model_path.clone();
        let runner = SweepRunner::new(config);

        let err = runner
            .run_with_evaluator(Arc::new(AlwaysFailing))
            .unwrap_err();

        assert!(matches!(
            err,
            PsError::Sweep(SweepError::NoWinner)
        ));
        assert!(!model_path.exists());
    }

    #[test]
    fn single_failure_does_not_abort_the_sweep() {
        struct FailsEleven;
        impl Evaluator for FailsEleven {
            fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation> {
                if candidate == 11 {
                    return Err(EvalError::InvalidCandidate { candidate }.into());
                }
                StubEvaluator { optimum: 12 }.evaluate(candidate)
            }
        }

        let tmp = TempDir::new().unwrap();
        let runner = SweepRunner::new(test_config(&tmp));
        let report = runner.run_with_evaluator(Arc::new(FailsEleven)).unwrap();

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.best.best_candidate, 12);
        assert!(matches!(
            report.outcomes[1],
            CandidateOutcome::Failed { candidate: 11, .. }
        ));
    }

    #[test]
    fn cancelled_run_surfaces_partial_results() {
        let tmp = TempDir::new().unwrap();
        let runner = SweepRunner::new(test_config(&tmp));
        runner.cancel_token().store(true, Ordering::Relaxed);

        let err = runner
            .run_with_evaluator(Arc::new(StubEvaluator { optimum: 10 }))
            .unwrap_err();

        // Every slot cancelled -> nothing beat the sentinel.
        assert!(matches!(err, PsError::Sweep(SweepError::NoWinner)));
    }

    #[test]
    fn cancelled_sweep_skips_the_queued_work() {
        /// Slow enough that running the queue would dominate the test.
        struct SlowStub;
        impl Evaluator for SlowStub {
            fn evaluate(&self, candidate: Candidate) -> PsResult<Evaluation> {
                std::thread::sleep(Duration::from_millis(200));
                StubEvaluator { optimum: 10 }.evaluate(candidate)
            }
        }

        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp)
            .with_size_range(10, 20)
            .with_worker_count(1);
        let runner = SweepRunner::new(config);
        runner.cancel_token().store(true, Ordering::Relaxed);

        let started = Instant::now();
        let err = runner.run_with_evaluator(Arc::new(SlowStub)).unwrap_err();
        assert!(matches!(err, PsError::Sweep(SweepError::NoWinner)));

        // Ten 200ms candidates on one worker: a full drain would take ~2s.
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "cancelled sweep still ran the queue: {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn missing_dataset_fails_before_submission() {
        let tmp = TempDir::new().unwrap();
        let mut config = test_config(&tmp);
        config.image_dir = tmp.path().join("missing-images");
        config.label_path = tmp.path().join("missing-labels.txt");
        let runner = SweepRunner::new(config);

        let err = runner.run().unwrap_err();
        assert!(matches!(err, PsError::Data(_)));
    }
}
