/*!
 * Structured Tracing
 * Subscriber setup and structured scheduler reports using the tracing crate
 *
 * Library modules log through the `log` facade; `init_tracing` bridges those
 * records into the tracing subscriber so both end up in one stream.
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::scheduler::SchedulerStats;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - UTHREAD_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    // Green threads share one OS thread, so OS thread ids carry no information
    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Emit one structured event summarizing `stats`
pub fn report_stats(stats: &SchedulerStats) {
    tracing::event!(
        Level::INFO,
        running = stats.running,
        live = stats.live_threads,
        ready = stats.ready_threads,
        waiting = stats.waiting_threads,
        created = stats.created,
        exited = stats.exited,
        killed = stats.killed,
        reclaimed = stats.reclaimed,
        context_switches = stats.context_switches,
        preemptions = stats.preemptions,
        panicked = stats.panicked,
        "scheduler stats"
    );
}
