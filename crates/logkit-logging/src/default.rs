//! Process-wide default handler
//!
//! The first [`LogHandler::set_default_log`] installs a global `tracing`
//! subscriber (plus the `log` bridge) whose only layer forwards to whichever
//! handler currently sits in the default slot. Later calls just swap the
//! slot: last write wins, and an event already in flight finishes on the
//! handler it loaded.

use std::sync::{Arc, Once, OnceLock};

use arc_swap::ArcSwap;
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::handler::LogHandler;

static DEFAULT_HANDLER: OnceLock<ArcSwap<LogHandler>> = OnceLock::new();
static INIT_ONCE: Once = Once::new();

/// Install a default handler (INFO, stdout, text) once per process
///
/// Later calls are no-ops, as is a first call made after a handler was
/// already installed. A handler installed afterwards with
/// [`LogHandler::set_default_log`] replaces it.
pub fn init() {
    INIT_ONCE.call_once(|| install(&LogHandler::new(), false));
}

/// The handler currently installed as the process default
pub fn default_handler() -> Option<LogHandler> {
    DEFAULT_HANDLER
        .get()
        .map(|slot| LogHandler::clone(&slot.load()))
}

impl LogHandler {
    /// Route process-wide `tracing` and `log` output through this handler
    ///
    /// Supersedes any handler installed earlier. If some other global
    /// subscriber already owns the process, a warning is emitted through it
    /// and this handler is kept in the slot without receiving events.
    pub fn set_default_log(&self) {
        install(self, true);
    }
}

/// Fill the default slot with `handler`, routing the global subscriber to it
/// on first use; an occupied slot is swapped only when `replace` is set
fn install(handler: &LogHandler, replace: bool) {
    let mut first = false;
    let slot = DEFAULT_HANDLER.get_or_init(|| {
        first = true;
        ArcSwap::from_pointee(handler.clone())
    });

    if !first {
        if replace {
            slot.store(Arc::new(handler.clone()));
        }
        return;
    }

    if let Err(err) = tracing_subscriber::registry().with(DefaultRoute).try_init() {
        tracing::warn!(
            error = %err,
            "global subscriber already set, default log handler not routed"
        );
    }
}

/// Layer forwarding to the current default handler
struct DefaultRoute;

impl DefaultRoute {
    fn current() -> Option<arc_swap::Guard<Arc<LogHandler>>> {
        DEFAULT_HANDLER.get().map(|slot| slot.load())
    }
}

impl<S> Layer<S> for DefaultRoute
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        Self::current()
            .map(|handler| Layer::<S>::enabled(&**handler, metadata, ctx))
            .unwrap_or(false)
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        if let Some(handler) = Self::current() {
            Layer::<S>::on_new_span(&**handler, attrs, id, ctx);
        }
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        if let Some(handler) = Self::current() {
            Layer::<S>::on_record(&**handler, id, values, ctx);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if let Some(handler) = Self::current() {
            Layer::<S>::on_event(&**handler, event, ctx);
        }
    }
}
