use crate::appender::StackifyAppender;
use crate::event::{current_thread_name, Level, LogEvent, StackFrame, Throwable};
use crate::throwables::CapturedError;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and
/// hands them to a [`StackifyAppender`].
///
/// Conversion happens on the emitting thread; delivery is asynchronous.
/// The caller frame is built from the event's module path (or target),
/// the innermost span name and the source line.
pub struct StackifyLayer {
    appender: Arc<StackifyAppender>,
    max_level: tracing::Level,
}

impl StackifyLayer {
    pub fn new(appender: Arc<StackifyAppender>) -> Self {
        Self {
            appender,
            max_level: tracing::Level::TRACE,
        }
    }

    /// Ignore events more verbose than `level`.
    pub fn with_max_level(mut self, level: tracing::Level) -> Self {
        self.max_level = level;
        self
    }

    pub fn appender(&self) -> &Arc<StackifyAppender> {
        &self.appender
    }
}

impl<S> Layer<S> for StackifyLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > self.max_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let method_name = ctx
            .event_span(event)
            .map(|span| span.name().to_string())
            .unwrap_or_default();
        let frame = StackFrame {
            class_name: meta.module_path().unwrap_or_else(|| meta.target()).to_string(),
            method_name,
            line_number: meta.line(),
        };

        let log_event = LogEvent {
            timestamp_ms: Utc::now().timestamp_millis(),
            message: visitor.message.unwrap_or_default(),
            level: Level::from(*meta.level()),
            thread_name: current_thread_name(),
            properties: visitor.fields,
            throwable: visitor.error.map(|e| Throwable::Live(Arc::new(e))),
            caller_data: vec![frame],
        };

        self.appender.append(log_event);
    }
}

/// Collects the message, the first recorded error, and every other field
/// rendered as a string.
#[derive(Default)]
pub struct FieldVisitor {
    pub fields: BTreeMap<String, String>,
    pub message: Option<String>,
    pub error: Option<CapturedError>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.error.is_none() {
            self.error = Some(CapturedError::capture(value));
        }
        self.insert(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}
