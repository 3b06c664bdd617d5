use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::error::{ConfigError, SinkBuildError};
use crate::sink::LogSink;

/// Supported transports, selected by the `transport` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// HTTPS POST to the ingestion API.
    #[default]
    Default,
    /// One JSON line per batch on stdout.
    Console,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Default => "default",
            Transport::Console => "console",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = ConfigError;

    /// Parse a selector. Empty and `http` are accepted as aliases of
    /// `default`, `stdout` as an alias of `console`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "default" | "http" => Ok(Transport::Default),
            "console" | "stdout" => Ok(Transport::Console),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

/// Create a concrete [`LogSink`] for the transport selected in `cfg`.
pub fn make_sink_from_config(cfg: &ApiConfig) -> Result<Arc<dyn LogSink>, SinkBuildError> {
    match cfg.transport {
        Transport::Default => {
            #[cfg(feature = "http")]
            {
                use crate::http::HttpSink;

                let api_key = cfg
                    .api_key
                    .clone()
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey("default"))?;
                let sink = HttpSink::new(&cfg.api_url, api_key)?;
                Ok(Arc::new(sink) as Arc<dyn LogSink>)
            }

            #[cfg(not(feature = "http"))]
            {
                let _ = cfg;
                Err(SinkBuildError::HttpFeatureDisabled)
            }
        }
        Transport::Console => {
            use crate::stdout_sink::StdoutSink;
            Ok(Arc::new(StdoutSink::default()) as Arc<dyn LogSink>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EnvironmentDetail;

    fn config(transport: Transport, api_key: Option<&str>) -> ApiConfig {
        ApiConfig {
            api_url: "https://api.stackify.com".into(),
            api_key: api_key.map(str::to_string),
            application: None,
            environment: None,
            transport,
            allow_self_logging: false,
            env_detail: EnvironmentDetail::default(),
        }
    }

    #[test]
    fn parses_selectors_and_aliases() {
        assert_eq!("default".parse::<Transport>().unwrap(), Transport::Default);
        assert_eq!("HTTP".parse::<Transport>().unwrap(), Transport::Default);
        assert_eq!(" stdout ".parse::<Transport>().unwrap(), Transport::Console);
        assert!("agent".parse::<Transport>().is_err());
    }

    #[test]
    fn console_transport_needs_no_key() {
        assert!(make_sink_from_config(&config(Transport::Console, None)).is_ok());
    }

    #[cfg(feature = "http")]
    #[test]
    fn default_transport_requires_an_api_key() {
        let err = make_sink_from_config(&config(Transport::Default, Some("  "))).err();
        assert!(matches!(
            err,
            Some(SinkBuildError::Config(ConfigError::MissingApiKey(_)))
        ));
        assert!(make_sink_from_config(&config(Transport::Default, Some("key"))).is_ok());
    }
}
