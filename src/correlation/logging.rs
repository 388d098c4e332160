//! correlation::logging — structured run records behind `obs_slog`.
//!
//! One record is emitted per dispatcher call when `CorrOptions::verbose` is
//! set; kernels never log. The terminal drain is asynchronous and flushed
//! when the per-call logger is dropped.
use crate::correlation::options::Variant;
use slog::{info, o, Drain, Logger};
use std::time::Duration;

/// Summary of one completed correlation run.
#[derive(Debug, Clone)]
pub(crate) struct RunRecord {
    pub variant: Variant,
    pub n_vars: usize,
    pub n_obs: usize,
    pub pairs: usize,
    pub elapsed: Duration,
}

fn term_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!("crate" => "rust_corrmat"))
}

pub(crate) fn log_run(record: &RunRecord) {
    let log = term_logger();
    info!(log, "pairwise correlation finished";
        "algorithm" => ?record.variant.algorithm,
        "blocking" => ?record.variant.blocking,
        "workers" => record.variant.threading.workers(),
        "n_vars" => record.n_vars,
        "n_obs" => record.n_obs,
        "pairs" => record.pairs,
        "elapsed_ms" => record.elapsed.as_secs_f64() * 1e3,
    );
}
