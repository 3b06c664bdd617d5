use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing_stackify::adapter::EventAdapter;
use tracing_stackify::appender::{DeliveryFactory, StackifyAppender, StatusLevel};
use tracing_stackify::config::{ApiConfig, AppenderSettings};
use tracing_stackify::delivery::{BatchConfig, Delivery};
use tracing_stackify::error::DeliveryError;
use tracing_stackify::event::{Level, LogEvent};
use tracing_stackify::mask::{Masker, MASK_CREDITCARD, MASK_IP, MASK_SSN};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Create { client_name: String, skip_json: bool },
    Activate { application: Option<String> },
    Submit(String),
    SubmitError(String),
    Shutdown,
}

#[derive(Clone, Copy, Default)]
struct Failures {
    activate: bool,
    submit: bool,
    shutdown: bool,
}

/// Delivery double that records every lifecycle call.
#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    maskers: Arc<Mutex<Vec<Masker>>>,
    fail: Failures,
}

impl Recorder {
    fn failing(fail: Failures) -> Self {
        Self { fail, ..Default::default() }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Delivery for Recorder {
    fn activate(&mut self, config: &ApiConfig) -> Result<(), DeliveryError> {
        self.push(Call::Activate { application: config.application.clone() });
        if self.fail.activate {
            return Err(DeliveryError::NotActivated);
        }
        Ok(())
    }

    fn submit(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.push(Call::Submit(event.message));
        if self.fail.submit {
            return Err(DeliveryError::ChannelFull);
        }
        Ok(())
    }

    fn submit_error(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.push(Call::SubmitError(event.message));
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), DeliveryError> {
        self.push(Call::Shutdown);
        if self.fail.shutdown {
            return Err(DeliveryError::ChannelClosed);
        }
        Ok(())
    }
}

impl DeliveryFactory for Recorder {
    fn create(
        &self,
        client_name: &str,
        _adapter: Arc<dyn EventAdapter<LogEvent>>,
        masker: Masker,
        skip_json: bool,
        _batch: &BatchConfig,
    ) -> Box<dyn Delivery> {
        self.push(Call::Create { client_name: client_name.to_string(), skip_json });
        self.maskers.lock().unwrap().push(masker);
        Box::new(self.clone())
    }
}

fn settings() -> AppenderSettings {
    AppenderSettings {
        api_key: Some("key".into()),
        application: Some("application".into()),
        environment: Some("environment".into()),
        transport: Some("console".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn start_append_stop() {
    let recorder = Recorder::default();
    let appender = StackifyAppender::log(AppenderSettings { skip_json: true, ..settings() })
        .with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    appender.append(LogEvent::new(Level::Info, "hello"));
    appender.stop().await;

    let calls = recorder.calls();
    assert!(matches!(&calls[0], Call::Create { client_name, skip_json: true } if client_name.starts_with("tracing-stackify-log/")));
    assert_eq!(calls[1], Call::Activate { application: Some("application".into()) });
    assert_eq!(calls[2], Call::Submit("hello".into()));
    assert_eq!(calls[3], Call::Shutdown);
    assert!(appender.status().errors().is_empty());
    assert!(!appender.is_started());
}

#[tokio::test]
async fn error_flavor_uses_append_error_and_no_masks() {
    let recorder = Recorder::default();
    let appender = StackifyAppender::errors(AppenderSettings { mask_enabled: true, ..settings() })
        .with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    appender.append(LogEvent::new(Level::Error, "boom"));
    appender.stop().await;

    let calls = recorder.calls();
    assert!(matches!(&calls[0], Call::Create { skip_json: true, .. }));
    assert!(calls.contains(&Call::SubmitError("boom".into())));
    assert!(recorder.maskers.lock().unwrap()[0].is_empty());
}

#[tokio::test]
async fn log_flavor_honors_skip_json_setting() {
    let recorder = Recorder::default();
    let appender = StackifyAppender::log(AppenderSettings { skip_json: false, ..settings() })
        .with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    appender.stop().await;

    assert!(matches!(&recorder.calls()[0], Call::Create { skip_json: false, .. }));
}

#[tokio::test]
async fn masking_settings_shape_the_masker() {
    let recorder = Recorder::default();
    let appender = StackifyAppender::log(AppenderSettings {
        mask_enabled: true,
        mask_credit_card: Some(false),
        mask_ip: true,
        ..settings()
    })
    .with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    let masker = recorder.maskers.lock().unwrap()[0].clone();
    assert!(!masker.has_mask(MASK_CREDITCARD));
    assert!(masker.has_mask(MASK_SSN));
    assert!(masker.has_mask(MASK_IP));
    appender.stop().await;
}

#[tokio::test]
async fn start_failure_is_reported_and_appender_stays_inert() {
    let recorder = Recorder::failing(Failures { activate: true, ..Default::default() });
    let appender = StackifyAppender::log(settings()).with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    let errors = appender.status().errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Exception starting the Stackify delivery component");

    appender.append(LogEvent::new(Level::Info, "dropped"));
    assert!(!recorder.calls().contains(&Call::Submit("dropped".into())));
    assert_eq!(appender.status().errors().len(), 2);

    appender.stop().await;
}

#[tokio::test]
async fn invalid_configuration_is_reported() {
    let recorder = Recorder::default();
    let appender = StackifyAppender::log(AppenderSettings {
        transport: Some("pigeon".into()),
        ..settings()
    })
    .with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    assert!(recorder.calls().is_empty());
    let errors = appender.status().errors();
    assert_eq!(errors[0].message, "Exception resolving the Stackify configuration");
    assert!(errors[0].cause.as_deref().unwrap().contains("pigeon"));
}

#[tokio::test]
async fn invalid_custom_mask_is_reported() {
    let appender = StackifyAppender::log(AppenderSettings {
        mask_enabled: true,
        mask_custom: Some("(oops".into()),
        ..settings()
    })
    .with_delivery_factory(Arc::new(Recorder::default()));

    appender.start();
    assert_eq!(
        appender.status().errors()[0].message,
        "Exception building the Stackify masker"
    );
}

#[tokio::test]
async fn append_failure_is_reported_per_event() {
    let recorder = Recorder::failing(Failures { submit: true, ..Default::default() });
    let appender = StackifyAppender::log(settings()).with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    appender.append(LogEvent::new(Level::Info, "a"));
    appender.append(LogEvent::new(Level::Info, "b"));

    let errors = appender.status().errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|s| s.message == "Exception appending event to Stackify appender"));
    assert_eq!(
        recorder.calls().iter().filter(|c| matches!(c, Call::Submit(_))).count(),
        2
    );
    appender.stop().await;
}

#[tokio::test]
async fn stop_failure_is_reported_and_stop_completes() {
    let recorder = Recorder::failing(Failures { shutdown: true, ..Default::default() });
    let appender = StackifyAppender::log(settings()).with_delivery_factory(Arc::new(recorder.clone()));

    appender.start();
    appender.stop().await;

    let errors = appender.status().errors();
    assert_eq!(errors[0].message, "Exception closing Stackify appender");
    assert!(!appender.is_started());
    assert!(appender.status().entries().iter().any(|s| s.level == StatusLevel::Info));
}

#[tokio::test]
async fn real_delivery_flushes_through_console_transport() {
    let appender = StackifyAppender::log(settings());
    appender.start();
    assert!(appender.status().errors().is_empty(), "{:?}", appender.status().entries());

    appender.append(LogEvent::new(Level::Warn, "console line"));
    appender.stop().await;
    assert!(appender.status().errors().is_empty());
}
