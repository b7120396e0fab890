//! scheduler-demo: runs the scheduler against a synthetic workload.
//!
//! A producer submits tasks with random priorities and random run times, a
//! reporter logs the per-priority table, and SIGINT/SIGTERM triggers the
//! ordered shutdown: queue stop, supervisor stop, worker join.

use std::time::Duration;

use clap::Parser;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use stupid_scheduler::{
    Priority, SchedulerConfig, SchedulerError, SchedulerRuntime, Task, TaskSink,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Priority scheduler demo with an autoscaling worker pool.
#[derive(Parser, Debug)]
#[command(name = "scheduler-demo", version, about)]
struct Cli {
    /// Path to scheduler.toml config file.
    #[arg(long, env = "SCHEDULER_CONFIG", default_value = "config/scheduler.toml")]
    config: String,

    /// Override total queue capacity.
    #[arg(long)]
    capacity: Option<usize>,

    /// Override the initial worker count.
    #[arg(long)]
    workers: Option<usize>,

    /// Status report interval in seconds.
    #[arg(long, env = "SCHEDULER_REPORT_INTERVAL", default_value_t = 1)]
    report_interval: u64,

    /// Pause between submitted tasks, in milliseconds.
    #[arg(long, default_value_t = 10)]
    submit_interval_ms: u64,
}

// ── Workload ────────────────────────────────────────────────────────

fn random_task() -> Task {
    let (priority, run_for) = {
        let mut rng = rand::thread_rng();
        let priority = Priority::ALL[rng.gen_range(0..Priority::ALL.len())];
        (priority, Duration::from_millis(rng.gen_range(100..=1000)))
    };
    Task::new(priority, move || tokio::time::sleep(run_for))
        .with_payload(serde_json::json!({ "run_for_ms": run_for.as_millis() as u64 }))
}

async fn produce(sink: &dyn TaskSink, interval: Duration, stop: CancellationToken) {
    let mut submitted = 0u64;
    loop {
        let pause = match sink.enqueue(random_task()) {
            Ok(()) => {
                submitted += 1;
                interval
            }
            Err(SchedulerError::Stopped) => break,
            Err(e) => {
                warn!(error = %e, "submit rejected, backing off");
                Duration::from_secs(1)
            }
        };

        tokio::select! {
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }
    info!(submitted, "producer exited");
}

async fn report(runtime: &SchedulerRuntime, interval: Duration, stop: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                info!("\n{}", runtime.status().render());
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler, waiting for ctrl_c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

// ── Main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Fall back to defaults (plus env overrides) if the file is missing or bad
    let mut config = match SchedulerConfig::from_file(&cli.config) {
        Ok(cfg) => {
            info!(path = %cli.config, "loaded scheduler config");
            cfg
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %cli.config,
                "failed to load config, using defaults"
            );
            SchedulerConfig::from_env()?
        }
    };
    if let Some(capacity) = cli.capacity {
        config.queue.capacity = capacity;
    }
    if let Some(workers) = cli.workers {
        config.pool.initial_workers = workers;
    }

    let runtime = SchedulerRuntime::start(&config)?;
    let stop = CancellationToken::new();

    let producer = produce(
        runtime.queue().as_ref(),
        Duration::from_millis(cli.submit_interval_ms),
        stop.clone(),
    );
    let reporter = report(
        &runtime,
        Duration::from_secs(cli.report_interval.max(1)),
        stop.clone(),
    );
    let signal = async {
        shutdown_signal().await;
        info!("shutdown signal received");
        stop.cancel();
    };

    tokio::join!(producer, reporter, signal);

    if let Err(e) = runtime.shutdown(config.shutdown.timeout()).await {
        error!(error = %e, "scheduler did not shut down cleanly");
        return Err(e.into());
    }

    info!("\n{}", runtime.status().render());
    info!("scheduler-demo exited cleanly");
    Ok(())
}
