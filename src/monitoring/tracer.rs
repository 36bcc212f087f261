/*!
 * Structured Tracing
 * Subscriber setup and per-worker spans using the tracing crate
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Worker runs longer than this are logged as slow
const SLOW_WORKER_MS: u128 = 1_000;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - COORD_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .init();
        info!("Structured tracing initialized");
    }
}

/// Span covering one worker routine
///
/// Enter it at the top of the worker; its duration is logged on drop.
pub struct WorkerSpan {
    span: tracing::Span,
    start: Instant,
    name: &'static str,
    index: usize,
}

impl WorkerSpan {
    pub fn new(name: &'static str, index: usize) -> Self {
        let span = span!(Level::DEBUG, "worker", name, index);
        Self {
            span,
            start: Instant::now(),
            name,
            index,
        }
    }

    /// Enter the span for the current thread
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for WorkerSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();

        if elapsed.as_millis() > SLOW_WORKER_MS {
            warn!(
                worker = self.name,
                index = self.index,
                duration_ms = elapsed.as_millis() as u64,
                "slow worker"
            );
        } else {
            debug!(
                worker = self.name,
                index = self.index,
                duration_us = elapsed.as_micros() as u64,
                "worker finished"
            );
        }
    }
}
