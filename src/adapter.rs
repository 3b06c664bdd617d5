use crate::context::{ContextProvider, NoContext};
use crate::env::server_variables;
use crate::event::{Level, LogEvent, Throwable};
use crate::record::{EnvironmentDetail, ErrorRecord, LogMsg};
use crate::throwables;
use serde::Serialize;
use std::error::Error;
use std::sync::Arc;

/// How an adapter decides whether an event is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorLevelPolicy {
    /// `Error` and everything more severe.
    #[default]
    AtOrAbove,
    /// Only `Error` itself.
    Exact,
}

/// Translates host events of type `E` into Stackify records.
///
/// Implementations are pure: none of these methods fail or panic on
/// missing data, every absent value maps to `None`, zero or an empty
/// string.
pub trait EventAdapter<E>: Send + Sync {
    /// The live error attached to the event, if any.
    fn throwable(&self, event: &E) -> Option<Arc<dyn Error + Send + Sync>>;

    /// Build the error record for `event`, either from `exception` or from
    /// the event's caller location when no error value exists.
    fn error_record(&self, event: &E, exception: Option<&(dyn Error + 'static)>) -> ErrorRecord;

    /// Build the log line record for `event`.
    fn log_msg(&self, event: &E, error: Option<ErrorRecord>) -> LogMsg;

    fn is_error_level(&self, event: &E) -> bool;

    /// Class (module) name of the innermost caller frame.
    fn class_name(&self, event: &E) -> Option<String>;
}

/// [`EventAdapter`] for [`LogEvent`]s.
#[derive(Clone)]
pub struct LogEventAdapter {
    env_detail: EnvironmentDetail,
    context: Arc<dyn ContextProvider>,
    policy: ErrorLevelPolicy,
}

impl LogEventAdapter {
    pub fn new(env_detail: EnvironmentDetail) -> Self {
        Self {
            env_detail,
            context: Arc::new(NoContext),
            policy: ErrorLevelPolicy::default(),
        }
    }

    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn with_policy(mut self, policy: ErrorLevelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn env_detail(&self) -> &EnvironmentDetail {
        &self.env_detail
    }
}

impl EventAdapter<LogEvent> for LogEventAdapter {
    fn throwable(&self, event: &LogEvent) -> Option<Arc<dyn Error + Send + Sync>> {
        match &event.throwable {
            Some(Throwable::Live(err)) => Some(Arc::clone(err)),
            Some(Throwable::Proxy(_)) | None => None,
        }
    }

    fn error_record(&self, event: &LogEvent, exception: Option<&(dyn Error + 'static)>) -> ErrorRecord {
        let error = match exception {
            Some(err) => throwables::to_error_item(&event.message, err),
            None => {
                let (class_name, method_name, line_number) = match event.caller_data.first() {
                    Some(frame) => (
                        frame.class_name.as_str(),
                        frame.method_name.as_str(),
                        frame.line_number.unwrap_or(0),
                    ),
                    None => ("", "", 0),
                };
                throwables::to_error_item_at(&event.message, class_name, method_name, line_number)
            }
        };

        ErrorRecord {
            environment_detail: self.env_detail.clone(),
            occurred_epoch_millis: event.timestamp_ms,
            error,
            user_name: self.context.current_user(),
            web_request_detail: self.context.current_web_request(),
            server_variables: server_variables(),
        }
    }

    fn log_msg(&self, event: &LogEvent, error: Option<ErrorRecord>) -> LogMsg {
        let data = if event.properties.is_empty() {
            None
        } else {
            try_encode(&event.properties)
        };

        let frame = event.caller_data.first();
        let src_method = frame.map(|f| source_locator(&f.class_name, &f.method_name));
        let src_line = frame.and_then(|f| f.line_number);

        LogMsg {
            msg: event.message.clone(),
            data,
            ex: error,
            th: event.thread_name.clone(),
            epoch_ms: event.timestamp_ms,
            level: event.level.as_str().to_string(),
            trans_id: self.context.current_transaction_id(),
            src_method,
            src_line,
        }
    }

    fn is_error_level(&self, event: &LogEvent) -> bool {
        match self.policy {
            ErrorLevelPolicy::AtOrAbove => event.level >= Level::Error,
            ErrorLevelPolicy::Exact => event.level == Level::Error,
        }
    }

    fn class_name(&self, event: &LogEvent) -> Option<String> {
        event.caller_data.first().map(|f| f.class_name.clone())
    }
}

/// Best-effort JSON encoding. Encoder failures are swallowed and yield
/// `None`; callers leave the field out.
pub fn try_encode<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}

fn source_locator(class_name: &str, method_name: &str) -> String {
    if method_name.is_empty() {
        class_name.to_string()
    } else {
        format!("{}.{}", class_name, method_name)
    }
}
