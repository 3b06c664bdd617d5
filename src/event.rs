use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Severity of a [`LogEvent`], ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    /// Lowercase name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// One caller-location frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub line_number: Option<u32>,
}

impl StackFrame {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>, line_number: u32) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            line_number: Some(line_number),
        }
    }
}

/// Description of an error that was reported without a live error value,
/// e.g. an event replayed from another process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThrowableSummary {
    pub class_name: String,
    pub message: String,
}

/// Error attached to a [`LogEvent`].
#[derive(Clone)]
pub enum Throwable {
    /// A materialized error value with its full `source()` chain.
    Live(Arc<dyn Error + Send + Sync>),
    /// Only a textual description is available.
    Proxy(ThrowableSummary),
}

impl fmt::Debug for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Throwable::Live(err) => f.debug_tuple("Live").field(&err.to_string()).finish(),
            Throwable::Proxy(summary) => f.debug_tuple("Proxy").field(summary).finish(),
        }
    }
}

/// A single log line plus its metadata, as produced by the host logging
/// framework.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp_ms: i64,
    pub message: String,
    pub level: Level,
    pub thread_name: String,
    pub properties: BTreeMap<String, String>,
    pub throwable: Option<Throwable>,
    /// Innermost frame first.
    pub caller_data: Vec<StackFrame>,
}

impl LogEvent {
    /// Event stamped with the current time and thread, with no properties,
    /// throwable or caller data.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            message: message.into(),
            level,
            thread_name: current_thread_name(),
            properties: BTreeMap::new(),
            throwable: None,
            caller_data: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_thread(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, err: impl Error + Send + Sync + 'static) -> Self {
        self.throwable = Some(Throwable::Live(Arc::new(err)));
        self
    }

    pub fn with_throwable(mut self, throwable: Throwable) -> Self {
        self.throwable = Some(throwable);
        self
    }

    pub fn with_frame(mut self, frame: StackFrame) -> Self {
        self.caller_data.push(frame);
        self
    }
}

/// Name of the calling thread, falling back to its id for unnamed threads.
pub fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
