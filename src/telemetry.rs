//! Tracing setup and request-scoped correlation IDs.
//!
//! The subscriber is installed once at startup; request middleware then
//! scopes a [`TraceContext`] over each request so error responses can carry
//! the correlation ID without threading it through every call.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

/// Per-request correlation metadata.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

task_local! {
    static CURRENT_CONTEXT: TraceContext;
}

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to bridge `log` macros into tracing: {0}")]
    LogBridge(#[from] log::SetLoggerError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install the global tracing subscriber and the `log` bridge.
///
/// Safe to call more than once; repeat calls are no-ops so tests that share
/// a process do not fight over the global subscriber.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Ok(());
    }

    // Seeding code and sea-orm still emit through `log`; route those events
    // into the tracing pipeline. A SetLoggerError here means some logger is
    // already installed, which is fine.
    let _ = LogTracer::builder().with_max_level(LevelFilter::Trace).init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let output = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        "compact" => fmt::layer().compact().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    match tracing_subscriber::registry().with(filter).with(output).try_init() {
        Ok(()) => Ok(()),
        Err(err) => {
            INITIALIZED.store(false, Ordering::SeqCst);
            Err(err.into())
        }
    }
}

/// Run `future` with `context` as the task-local trace context.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    CURRENT_CONTEXT.scope(context, future).await
}

/// Trace ID of the request currently being served, if any.
pub fn current_trace_id() -> Option<String> {
    CURRENT_CONTEXT.try_with(|ctx| ctx.trace_id.clone()).ok()
}
