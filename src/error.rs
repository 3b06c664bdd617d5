/// Error returned when resolving the API configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown or unsupported transport: {0}")]
    UnknownTransport(String),

    #[error("api key is required for the {0} transport")]
    MissingApiKey(&'static str),

    #[error("api url must start with http:// or https://, got {0}")]
    InvalidApiUrl(String),

    #[error("unknown appender property: {0}")]
    UnknownProperty(String),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Error returned by the delivery component.
#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("delivery component has not been activated")]
    NotActivated,

    #[error("delivery component is already active")]
    AlreadyActive,

    #[error("no tokio runtime available to run the delivery task")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),

    #[error("log channel full, dropping log message")]
    ChannelFull,

    #[error("log channel closed")]
    ChannelClosed,

    #[error("delivery task failed")]
    Join(#[source] tokio::task::JoinError),

    #[error("failed to build log sink")]
    Sink(#[from] SinkBuildError),
}

/// Error returned when building a sink for a transport.
#[derive(thiserror::Error, Debug)]
pub enum SinkBuildError {
    #[error("http feature is not enabled")]
    HttpFeatureDisabled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Error returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("stackify appender failed to start: {0}")]
    StartFailed(String),
}
