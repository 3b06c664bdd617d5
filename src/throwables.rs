use crate::record::{ErrorItem, TraceFrame};
use std::error::Error;
use std::fmt;

/// Guard against cyclic or absurdly deep `source()` chains.
const MAX_CAUSE_DEPTH: usize = 32;

/// Convert an error and its `source()` chain into an [`ErrorItem`].
///
/// The top-level message combines `log_message` with the error's own
/// message when they differ, so the log line that reported the error is
/// kept alongside it.
pub fn to_error_item(log_message: &str, err: &(dyn Error + 'static)) -> ErrorItem {
    let mut item = item_for(err, MAX_CAUSE_DEPTH);
    item.message = combine_messages(log_message, &item.message);
    item
}

/// Build a synthetic error item pointing at a single code location. Used
/// when an error-level event carries no error value.
pub fn to_error_item_at(
    log_message: &str,
    class_name: &str,
    method_name: &str,
    line_number: u32,
) -> ErrorItem {
    let source_method = format!("{}.{}", class_name, method_name);
    ErrorItem {
        message: log_message.to_string(),
        error_type: "StringException".to_string(),
        source_method: Some(source_method.clone()),
        stack_trace: vec![TraceFrame {
            code_file_name: class_name.to_string(),
            line_num: line_number,
            method: source_method,
        }],
        ..Default::default()
    }
}

fn item_for(err: &(dyn Error + 'static), depth: usize) -> ErrorItem {
    let inner_error = match err.source() {
        Some(cause) if depth > 1 => Some(Box::new(item_for(cause, depth - 1))),
        _ => None,
    };

    ErrorItem {
        message: err.to_string(),
        error_type: type_label(err),
        inner_error,
        ..Default::default()
    }
}

fn combine_messages(log_message: &str, error_message: &str) -> String {
    if log_message.is_empty() || log_message == error_message {
        error_message.to_string()
    } else if error_message.is_empty() {
        log_message.to_string()
    } else {
        format!("{} ({})", log_message, error_message)
    }
}

/// Variant or constructor label of an error: the leading identifier of its
/// `Debug` output. This is the struct name for plain error structs
/// (`ParseIntError`), the variant for enums (`Load` for a `thiserror`
/// enum, `Os` or `Custom` for an I/O error). A borrowed `dyn Error` does
/// not expose its concrete type name, so the variant is the most specific
/// label available.
fn type_label(err: &(dyn Error + 'static)) -> String {
    if let Some(captured) = err.downcast_ref::<CapturedError>() {
        return captured.type_name.clone();
    }

    let debug = format!("{:?}", err);
    let label: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();

    if label.is_empty() || label.chars().all(|c| c.is_numeric()) {
        "Error".to_string()
    } else {
        label
    }
}

/// Owned copy of a borrowed error chain.
///
/// `tracing` only lends `&dyn Error` to visitors; this keeps the messages
/// and type labels so the chain can outlive the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedError {
    pub type_name: String,
    pub message: String,
    pub source: Option<Box<CapturedError>>,
}

impl CapturedError {
    pub fn capture(err: &(dyn Error + 'static)) -> Self {
        Self::capture_bounded(err, MAX_CAUSE_DEPTH)
    }

    fn capture_bounded(err: &(dyn Error + 'static), depth: usize) -> Self {
        let source = match err.source() {
            Some(cause) if depth > 1 => Some(Box::new(Self::capture_bounded(cause, depth - 1))),
            _ => None,
        };

        Self {
            type_name: type_label(err),
            message: err.to_string(),
            source,
        }
    }
}

impl fmt::Display for CapturedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for CapturedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|s| s as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum StoreError {
        #[error("failed to load order")]
        Load(#[source] std::io::Error),
    }

    #[test]
    fn walks_the_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "orders.db missing");
        let err = StoreError::Load(io);

        let item = to_error_item("loading orders", &err);
        assert_eq!(item.message, "loading orders (failed to load order)");
        assert_eq!(item.error_type, "Load");

        let inner = item.inner_error.expect("cause");
        assert_eq!(inner.message, "orders.db missing");
        assert!(inner.inner_error.is_none());
    }

    #[test]
    fn type_label_is_the_variant_or_struct_name() {
        let parse = "x".parse::<u32>().unwrap_err();
        assert_eq!(to_error_item("", &parse).error_type, "ParseIntError");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "reset");
        assert_eq!(to_error_item("", &io).error_type, "Custom");

        let store = StoreError::Load(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(to_error_item("", &store).error_type, "Load");
    }

    #[test]
    fn log_message_equal_to_error_message_is_not_repeated() {
        let err: Box<dyn Error> = "boom".into();
        let item = to_error_item("boom", err.as_ref());
        assert_eq!(item.message, "boom");
    }

    #[test]
    fn synthetic_item_points_at_one_frame() {
        let item = to_error_item_at("boom", "C", "m", 5);
        assert_eq!(item.source_method.as_deref(), Some("C.m"));
        assert_eq!(item.stack_trace.len(), 1);
        assert_eq!(item.stack_trace[0].code_file_name, "C");
        assert_eq!(item.stack_trace[0].line_num, 5);
    }

    #[test]
    fn captured_error_preserves_chain_and_type() {
        let err = StoreError::Load(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        let captured = CapturedError::capture(&err);

        assert_eq!(captured.type_name, "Load");
        assert_eq!(captured.to_string(), "failed to load order");
        assert_eq!(captured.source().map(|s| s.to_string()).as_deref(), Some("disk"));

        let item = to_error_item("", &captured);
        assert_eq!(item.error_type, "Load");
        assert_eq!(item.inner_error.map(|i| i.message).as_deref(), Some("disk"));
    }
}
