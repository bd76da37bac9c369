use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;

/// Tracing setup for embedding services: daily rolling file, non-blocking
/// writer. The returned guard must be held for the process lifetime or
/// buffered lines are lost on shutdown.
pub fn init_tracing(log_dir: &str) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, "attendance.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    guard
}
