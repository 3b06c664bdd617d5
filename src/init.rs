use crate::appender::StackifyAppender;
use crate::config::AppenderSettings;
use crate::error::InitError;
use crate::layer::StackifyLayer;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Options for the installed subscriber.
///
/// **Fields**
/// - `max_level`: most verbose level forwarded to the appender.
/// - `enable_stdout`: when `true`, a `tracing_subscriber::fmt` layer is
///   added next to the [`StackifyLayer`] so events also show up on the
///   console.
/// - `errors_only`: build the errors-only appender flavor instead of the
///   one forwarding every log line.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: tracing::Level,
    pub enable_stdout: bool,
    pub errors_only: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: tracing::Level::INFO,
            enable_stdout: true,
            errors_only: false,
        }
    }
}

/// Start an appender for `settings` and install it as the global `tracing`
/// subscriber.
///
/// Must be called from within a Tokio runtime, which hosts the delivery
/// task. The returned appender should be stopped with
/// [`StackifyAppender::stop`] before the process exits so queued events
/// are flushed.
///
/// **Errors**
/// - [`InitError::StartFailed`] if the appender could not start; the
///   reason is also kept in its status log.
/// - [`InitError::AlreadyInstalled`] if another global subscriber exists.
pub fn init_tracing_with_config(
    settings: AppenderSettings,
    config: LayerConfig,
) -> Result<Arc<StackifyAppender>, InitError> {
    let appender = if config.errors_only {
        StackifyAppender::errors(settings)
    } else {
        StackifyAppender::log(settings)
    };
    install(appender, &config)
}

/// Start an already configured appender (for instance one with a custom
/// [`DeliveryFactory`](crate::appender::DeliveryFactory)) and install it
/// as the global subscriber. `config.errors_only` is ignored; the
/// appender's own flavor applies.
pub fn install(appender: StackifyAppender, config: &LayerConfig) -> Result<Arc<StackifyAppender>, InitError> {
    appender.start();

    if let Some(status) = appender.status().errors().into_iter().last() {
        return Err(InitError::StartFailed(status.to_string()));
    }

    let appender = Arc::new(appender);
    let layer = StackifyLayer::new(Arc::clone(&appender)).with_max_level(config.max_level);

    // Build the subscriber in two variants so both have concrete types.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(appender)
}

/// Initialize tracing with [`LayerConfig::default`]. This is the
/// recommended entrypoint for typical services.
pub fn init_tracing(settings: AppenderSettings) -> Result<Arc<StackifyAppender>, InitError> {
    init_tracing_with_config(settings, LayerConfig::default())
}
