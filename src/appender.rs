use crate::adapter::{ErrorLevelPolicy, EventAdapter, LogEventAdapter};
use crate::config::{ApiConfig, AppenderSettings};
use crate::context::{ContextProvider, NoContext};
use crate::delivery::{BatchConfig, Delivery, LogAppender};
use crate::event::LogEvent;
use crate::mask::Masker;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Maximum number of retained status entries; older ones are discarded.
const STATUS_CAPACITY: usize = 256;

/// Which events an appender forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Every log line, errors included.
    All,
    /// Only events that carry an error or are at error level.
    ErrorsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// Diagnostic produced by the appender itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    pub cause: Option<String>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}: {}", self.message, cause),
            None => f.write_str(&self.message),
        }
    }
}

/// Bounded record of appender diagnostics, echoed to stderr.
///
/// Failures inside the appender are reported here instead of being
/// returned to the caller or logged through `tracing`, which would loop
/// back into the appender.
#[derive(Debug, Default)]
pub struct StatusLog {
    entries: Mutex<VecDeque<Status>>,
}

impl StatusLog {
    pub fn add(&self, level: StatusLevel, message: impl Into<String>, cause: Option<&dyn Error>) {
        let status = Status {
            level,
            message: message.into(),
            cause: cause.map(error_chain),
        };
        eprintln!("[tracing-stackify] {}", status);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= STATUS_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(status);
    }

    pub fn entries(&self) -> Vec<Status> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn errors(&self) -> Vec<Status> {
        self.entries()
            .into_iter()
            .filter(|s| s.level == StatusLevel::Error)
            .collect()
    }
}

fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Builds the delivery component when an appender starts.
pub trait DeliveryFactory: Send + Sync {
    fn create(
        &self,
        client_name: &str,
        adapter: Arc<dyn EventAdapter<LogEvent>>,
        masker: Masker,
        skip_json: bool,
        batch: &BatchConfig,
    ) -> Box<dyn Delivery>;
}

/// Creates a [`LogAppender`] whose sink follows the configured transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAppenderFactory;

impl DeliveryFactory for LogAppenderFactory {
    fn create(
        &self,
        client_name: &str,
        adapter: Arc<dyn EventAdapter<LogEvent>>,
        masker: Masker,
        skip_json: bool,
        batch: &BatchConfig,
    ) -> Box<dyn Delivery> {
        Box::new(LogAppender::new(client_name, adapter, masker, skip_json).with_batch_config(batch.clone()))
    }
}

/// Host-facing appender: configuration plus the `start`/`append`/`stop`
/// lifecycle around a [`Delivery`].
///
/// No lifecycle call ever fails or panics; problems are reported to
/// [`StackifyAppender::status`] and the affected event is dropped.
pub struct StackifyAppender {
    client_name: String,
    settings: AppenderSettings,
    mode: AppendMode,
    context: Arc<dyn ContextProvider>,
    policy: ErrorLevelPolicy,
    factory: Arc<dyn DeliveryFactory>,
    delivery: RwLock<Option<Box<dyn Delivery>>>,
    started: AtomicBool,
    status: StatusLog,
}

impl StackifyAppender {
    /// Appender forwarding every log line. Masking and JSON lifting follow
    /// the settings.
    pub fn log(settings: AppenderSettings) -> Self {
        Self::with_mode(settings, AppendMode::All, client_name("log"))
    }

    /// Appender forwarding only errors. Masking is not applied.
    pub fn errors(settings: AppenderSettings) -> Self {
        Self::with_mode(settings, AppendMode::ErrorsOnly, client_name("error"))
    }

    fn with_mode(settings: AppenderSettings, mode: AppendMode, client_name: String) -> Self {
        Self {
            client_name,
            settings,
            mode,
            context: Arc::new(NoContext),
            policy: ErrorLevelPolicy::default(),
            factory: Arc::new(LogAppenderFactory),
            delivery: RwLock::new(None),
            started: AtomicBool::new(false),
            status: StatusLog::default(),
        }
    }

    pub fn with_context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn with_error_level_policy(mut self, policy: ErrorLevelPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_delivery_factory(mut self, factory: Arc<dyn DeliveryFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn settings(&self) -> &AppenderSettings {
        &self.settings
    }

    pub fn mode(&self) -> AppendMode {
        self.mode
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Resolve configuration, build the masker and the delivery component,
    /// and activate it. Must run inside a Tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            self.status.add(StatusLevel::Warn, "Stackify appender already started", None);
            return;
        }

        let config = match ApiConfig::from_env_with_overrides(&self.settings) {
            Ok(config) => config,
            Err(e) => {
                self.status.add(StatusLevel::Error, "Exception resolving the Stackify configuration", Some(&e));
                return;
            }
        };

        let masker = match self.masker() {
            Ok(masker) => masker,
            Err(e) => {
                self.status.add(StatusLevel::Error, "Exception building the Stackify masker", Some(&e));
                return;
            }
        };

        let adapter = LogEventAdapter::new(config.env_detail.clone())
            .with_context(Arc::clone(&self.context))
            .with_policy(self.policy);
        // The errors flavor never lifts JSON out of messages.
        let skip_json = self.mode == AppendMode::ErrorsOnly || self.settings.skip_json;

        let mut delivery = self.factory.create(
            &self.client_name,
            Arc::new(adapter),
            masker,
            skip_json,
            &self.settings.batch,
        );

        match delivery.activate(&config) {
            Ok(()) => {
                *self.delivery.write().unwrap_or_else(PoisonError::into_inner) = Some(delivery);
                self.status.add(
                    StatusLevel::Info,
                    format!("Stackify appender started ({} transport)", config.transport),
                    None,
                );
            }
            Err(e) => {
                self.status.add(StatusLevel::Error, "Exception starting the Stackify delivery component", Some(&e));
            }
        }
    }

    /// Forward one event to the delivery component.
    pub fn append(&self, event: LogEvent) {
        let delivery = self.delivery.read().unwrap_or_else(PoisonError::into_inner);
        let Some(delivery) = delivery.as_ref() else {
            self.status.add(StatusLevel::Error, "Stackify appender is not started, dropping event", None);
            return;
        };

        let result = match self.mode {
            AppendMode::All => delivery.submit(event),
            AppendMode::ErrorsOnly => delivery.submit_error(event),
        };
        if let Err(e) = result {
            self.status.add(StatusLevel::Error, "Exception appending event to Stackify appender", Some(&e));
        }
    }

    /// Close the delivery component, flushing queued events. The appender
    /// counts as stopped afterwards even if closing failed.
    pub async fn stop(&self) {
        let delivery = self
            .delivery
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(mut delivery) = delivery {
            if let Err(e) = delivery.shutdown().await {
                self.status.add(StatusLevel::Error, "Exception closing Stackify appender", Some(&e));
            }
        }
        self.started.store(false, Ordering::Release);
    }

    fn masker(&self) -> Result<Masker, crate::mask::MaskError> {
        if self.mode == AppendMode::ErrorsOnly {
            return Ok(Masker::new());
        }
        let s = &self.settings;
        Masker::from_flags(
            s.mask_enabled,
            s.mask_credit_card,
            s.mask_ssn,
            s.mask_ip,
            s.mask_custom.as_deref(),
        )
    }
}

fn client_name(flavor: &str) -> String {
    format!("{}-{}/{}", env!("CARGO_PKG_NAME"), flavor, env!("CARGO_PKG_VERSION"))
}
