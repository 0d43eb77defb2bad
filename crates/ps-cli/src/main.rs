use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ps_sweep::SweepRunner;
use ps_types::SweepConfig;

#[derive(Parser)]
#[command(name = "pixelsweep")]
#[command(version, about = "Parallel img_size sweep for the image classifier", long_about = None)]
struct Cli {
    /// Image directory (numeric filenames)
    #[arg(long, value_name = "DIR", default_value = "data/images")]
    data_dir: PathBuf,

    /// Ground-truth label file, one class per line
    #[arg(long, value_name = "FILE", default_value = "data/Y.txt")]
    labels: PathBuf,

    /// Output path for the winning model bundle
    #[arg(long, value_name = "FILE", default_value = "models/best_model.json")]
    model_out: PathBuf,

    /// Low end of the img_size range (inclusive)
    #[arg(long, default_value_t = 10)]
    size_low: u32,

    /// High end of the img_size range (exclusive)
    #[arg(long, default_value_t = 25)]
    size_high: u32,

    /// Extra size to re-verify; repeatable, may duplicate range values
    #[arg(long = "extra-size", value_name = "N")]
    extra_sizes: Vec<u32>,

    /// Skip the default extra sizes (14, 15, 16, 19)
    #[arg(long)]
    no_extra_sizes: bool,

    /// Estimators per model
    #[arg(long, default_value_t = 240)]
    estimators: usize,

    /// Project features with PCA before fitting
    #[arg(long)]
    pca: bool,

    /// Tasks a worker runs before being replaced (0 = unlimited)
    #[arg(long, default_value_t = 3)]
    max_tasks_per_worker: usize,

    /// Worker threads (default: all cores)
    #[arg(short = 'j', long, value_name = "N")]
    workers: Option<usize>,

    /// Per-candidate timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// Per-candidate debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> SweepConfig {
        let mut config = SweepConfig::new(self.data_dir, self.labels, self.model_out)
            .with_size_range(self.size_low, self.size_high)
            .with_estimator_count(self.estimators)
            .with_pca(self.pca)
            .with_task_timeout_secs(self.timeout_secs);

        if self.no_extra_sizes {
            config = config.with_supplementary_sizes(Vec::new());
        } else if !self.extra_sizes.is_empty() {
            config = config.with_supplementary_sizes(self.extra_sizes);
        }

        config.max_tasks_per_worker = match self.max_tasks_per_worker {
            0 => None,
            n => Some(n),
        };
        config.worker_count = self.workers;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runner = SweepRunner::new(cli.into_config());
    let cancel = runner.cancel_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Shutdown signal received; finishing with partial results");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    // The sweep itself is thread-based; keep it off the async runtime.
    tokio::task::spawn_blocking(move || runner.run()).await??;
    Ok(())
}
