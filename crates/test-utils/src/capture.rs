//! A tracing subscriber that records events for assertions.

use std::sync::{Arc, Mutex};

use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    layer::{Context, SubscriberExt},
    Layer,
};

/// One recorded log event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Severity the event was emitted at.
    pub level: Level,
    /// Message plus `name=value` renderings of the event's fields.
    pub text: String,
}

#[derive(Clone, Default)]
struct Storage(Arc<Mutex<Vec<CapturedEvent>>>);

struct CaptureLayer(Storage);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = TextVisitor::default();
        event.record(&mut visitor);
        self.0
             .0
            .lock()
            .expect("capture storage poisoned")
            .push(CapturedEvent {
                level: *event.metadata().level(),
                text: visitor.0,
            });
    }
}

#[derive(Default)]
struct TextVisitor(String);

impl Visit for TextVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        if field.name() == "message" {
            self.0.push_str(&format!("{value:?}"));
        } else {
            self.0.push_str(&format!("{}={:?}", field.name(), value));
        }
    }
}

/// Runs `f` with a capturing subscriber installed and returns what it logged.
///
/// The subscriber is scoped to the current thread, so concurrently running
/// tests do not see each other's events.
pub fn capture_logs(f: impl FnOnce()) -> Vec<CapturedEvent> {
    let storage = Storage::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(storage.clone()));
    tracing::subscriber::with_default(subscriber, f);

    let events = storage.0.lock().expect("capture storage poisoned");
    events.clone()
}
