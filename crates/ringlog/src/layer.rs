//! `tracing` layer that routes events into a [`UserLog`]

use crate::{severity::Severity, writer::UserLog};
use std::fmt::{self, Write};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Forwards every `tracing` event to the rotating writer.
///
/// Events emitted by this crate are skipped so a rotation or write failure
/// never logs into the writer that produced it. Those events all come from a
/// `ringlog::` submodule and carry a `ringlog.event` field; a binary whose own
/// crate is also named `ringlog` logs under the bare `ringlog` target and is
/// forwarded.
pub struct UserLogLayer {
    writer: Arc<UserLog>,
}

impl UserLogLayer {
    pub fn new(writer: Arc<UserLog>) -> Self {
        Self { writer }
    }
}

/// Field every event emitted by this crate carries
const OWN_EVENT_FIELD: &str = "ringlog.event";

fn is_own_event(metadata: &Metadata<'_>) -> bool {
    metadata.target().starts_with("ringlog::")
        && metadata.fields().field(OWN_EVENT_FIELD).is_some()
}

impl<S> Layer<S> for UserLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_event(metadata) {
            return;
        }

        let severity = Severity::from(*metadata.level());
        if severity < self.writer.threshold() {
            return;
        }

        let mut visitor = BodyVisitor::default();
        event.record(&mut visitor);

        let body = format!(
            "{}: {}{}\n",
            metadata.target(),
            visitor.message,
            visitor.fields
        );
        self.writer.log_str(severity, &body);
    }
}

#[derive(Default)]
struct BodyVisitor {
    message: String,
    fields: String,
}

impl Visit for BodyVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
