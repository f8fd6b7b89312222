use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::config::CONFIG;
use crate::utils::timing::TIMING_TARGET;

/// Keeps the background log writers flushing until dropped at exit.
pub struct LogWriters {
    _guards: Vec<WorkerGuard>,
}

fn parse_log_level(value: &str) -> LevelFilter {
    match value.trim().to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Everything except generation timing, with HTTP internals held at warn.
fn pipeline_targets(level: LevelFilter) -> Targets {
    Targets::new()
        .with_default(level)
        .with_target(TIMING_TARGET, LevelFilter::OFF)
        .with_target("hyper", LevelFilter::WARN)
        .with_target("hyper_util", LevelFilter::WARN)
        .with_target("reqwest", LevelFilter::WARN)
}

fn timing_targets() -> Targets {
    Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target(TIMING_TARGET, LevelFilter::INFO)
}

fn daily_writer(dir: &Path, file_name: &str, guards: &mut Vec<WorkerGuard>) -> NonBlocking {
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name));
    guards.push(guard);
    writer
}

/// Installs the global subscriber: pipeline events go to stderr plus
/// `tryon.log`/`tryon.jsonl`, timing events to `timing.log`/`timing.jsonl`.
pub fn init_logging() -> LogWriters {
    let log_dir: &Path = CONFIG.log_dir.as_path();
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log directory {}: {err}", log_dir.display());
    }

    let mut guards = Vec::with_capacity(4);
    let pipeline_text = daily_writer(log_dir, "tryon.log", &mut guards);
    let pipeline_json = daily_writer(log_dir, "tryon.jsonl", &mut guards);
    let timing_text = daily_writer(log_dir, "timing.log", &mut guards);
    let timing_json = daily_writer(log_dir, "timing.jsonl", &mut guards);

    let pipeline = pipeline_targets(parse_log_level(&CONFIG.log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(pipeline.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(pipeline_text)
                .with_ansi(false)
                .with_filter(pipeline.clone()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(pipeline_json)
                .with_filter(pipeline),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(timing_text)
                .with_ansi(false)
                .with_filter(timing_targets()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(timing_json)
                .with_filter(timing_targets()),
        )
        .init();

    LogWriters { _guards: guards }
}
