//! Tracing subscriber bootstrap for coordinator binaries and services.

use std::{env, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, registry, EnvFilter};

/// Initializes the global tracing subscriber based on environment variables.
///
/// Recognized variables: `LOG_LEVEL` (default `info`), `LOG_OUTPUT`
/// (`console`, `file`; default `console`), `LOG_FORMAT` (`human`, `json`;
/// default `human`) and `LOG_FILE_PATH` (default `/tmp/hatch.log`).
///
/// Returns the non-blocking writer guard when logging to a file; the caller
/// must keep it alive for the life of the process or buffered lines are
/// lost on exit.
pub fn init_subscriber() -> Option<WorkerGuard> {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_output = env::var("LOG_OUTPUT").unwrap_or_else(|_| "console".to_string());
    let log_format = env::var("LOG_FORMAT").unwrap_or_else(|_| "human".to_string());
    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| "/tmp/hatch.log".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&log_level))
        .add_directive("tokio=warn".parse().expect("static directive"))
        .add_directive("hyper=warn".parse().expect("static directive"));

    let is_json = log_format == "json";
    let subscriber = registry().with(env_filter);

    if log_output == "file" {
        let log_path = Path::new(&log_file_path);
        let log_dir = log_path.parent().unwrap_or_else(|| Path::new("/tmp"));
        let log_filename = log_path.file_name().unwrap_or("hatch.log".as_ref());

        let file_appender = tracing_appender::rolling::daily(log_dir, log_filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
        if is_json {
            subscriber.with(fmt_layer.json()).init();
        } else {
            subscriber.with(fmt_layer).init();
        }
        Some(guard)
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
        if is_json {
            subscriber.with(fmt_layer.json()).init();
        } else {
            subscriber.with(fmt_layer).init();
        }
        None
    }
}
