//! Tracing setup and request-scoped correlation ids.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, fmt, layer::Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

task_local! {
    static CURRENT_TRACE: TraceContext;
}

static INIT_DONE: AtomicBool = AtomicBool::new(false);

/// Correlation id carried through a request's task.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

/// Run `future` with `context` installed as the task-local trace context.
pub async fn with_trace_context<Fut, R>(context: TraceContext, future: Fut) -> R
where
    Fut: std::future::Future<Output = R>,
{
    CURRENT_TRACE.scope(context, future).await
}

/// The trace id of the current task, if one was installed.
pub fn current_trace_id() -> Option<String> {
    CURRENT_TRACE.try_with(|ctx| ctx.trace_id.clone()).ok()
}

/// Set up the global tracing subscriber and the `log`-to-`tracing` bridge.
///
/// Safe to call more than once; only the first call does anything. Both
/// setup steps tolerate an already-installed global (tests set their own),
/// downgrading to a stderr warning instead of failing startup.
pub fn init_tracing(config: &AppConfig) {
    if INIT_DONE.swap(true, Ordering::SeqCst) {
        return;
    }

    // Another logger already being installed (a test harness, usually) is fine.
    if let Err(err) = LogTracer::builder().with_max_level(LevelFilter::Trace).init() {
        eprintln!("warning: log bridge not installed ({err}); `log::` macros will bypass tracing");
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let output = match config.log_format.as_str() {
        "pretty" => fmt::layer().pretty().boxed(),
        _ => fmt::layer().json().boxed(),
    };

    if tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_err()
    {
        INIT_DONE.store(false, Ordering::SeqCst);
        eprintln!("warning: a global tracing subscriber is already set; keeping it");
    }
}
