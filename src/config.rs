use crate::delivery::BatchConfig;
use crate::env::{
    env_opt, parse_flag, STACKIFY_ALLOW_SELF_LOGGING_ENV, STACKIFY_API_KEY_ENV,
    STACKIFY_API_URL_ENV, STACKIFY_APPLICATION_ENV, STACKIFY_ENVIRONMENT_ENV,
    STACKIFY_TRANSPORT_ENV,
};
use crate::error::ConfigError;
use crate::record::EnvironmentDetail;
use crate::transport::Transport;
use std::fmt;
use std::time::Duration;

/// Default ingestion endpoint.
pub const DEFAULT_API_URL: &str = "https://api.stackify.com";

/// Appender configuration as supplied by the host application.
///
/// Unset values are resolved from `STACKIFY_*` environment variables by
/// [`ApiConfig::from_env_with_overrides`].
#[derive(Clone)]
pub struct AppenderSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub application: Option<String>,
    pub environment: Option<String>,
    pub transport: Option<String>,
    /// Leave JSON embedded in messages alone instead of lifting it into
    /// the structured data field.
    pub skip_json: bool,
    pub mask_enabled: bool,
    /// `None` keeps the default (masked when masking is enabled).
    pub mask_credit_card: Option<bool>,
    /// `None` keeps the default (masked when masking is enabled).
    pub mask_ssn: Option<bool>,
    pub mask_ip: bool,
    pub mask_custom: Option<String>,
    /// Ship events emitted by this crate itself.
    pub allow_self_logging: Option<bool>,
    pub batch: BatchConfig,
}

impl Default for AppenderSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            application: None,
            environment: None,
            transport: None,
            skip_json: false,
            mask_enabled: false,
            mask_credit_card: None,
            mask_ssn: None,
            mask_ip: false,
            mask_custom: None,
            allow_self_logging: None,
            batch: BatchConfig::default(),
        }
    }
}

impl fmt::Debug for AppenderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppenderSettings")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| crate::env::REDACTED))
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("transport", &self.transport)
            .field("skip_json", &self.skip_json)
            .field("mask_enabled", &self.mask_enabled)
            .field("mask_credit_card", &self.mask_credit_card)
            .field("mask_ssn", &self.mask_ssn)
            .field("mask_ip", &self.mask_ip)
            .field("mask_custom", &self.mask_custom)
            .field("allow_self_logging", &self.allow_self_logging)
            .field("batch", &self.batch)
            .finish()
    }
}

impl AppenderSettings {
    /// Apply a single string property, using the property names host
    /// configuration files conventionally use (`apiKey`, `maskEnabled`, ...).
    pub fn set_property(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let owned = || Some(value.to_string());
        match key {
            "apiUrl" => self.api_url = value.to_string(),
            "apiKey" => self.api_key = owned(),
            "application" => self.application = owned(),
            "environment" => self.environment = owned(),
            "transport" => self.transport = owned(),
            "skipJson" => self.skip_json = parse_flag(value),
            "maskEnabled" => self.mask_enabled = parse_flag(value),
            "maskCreditCard" => self.mask_credit_card = Some(parse_flag(value)),
            "maskSSN" => self.mask_ssn = Some(parse_flag(value)),
            "maskIP" => self.mask_ip = parse_flag(value),
            "maskCustom" => self.mask_custom = owned(),
            "allowSelfLogging" => {
                self.allow_self_logging = Some(parse_flag(value))
            }
            "channelBuffer" => self.batch.channel_buffer = parse_number(key, value)?,
            "batchSize" => self.batch.batch_size = parse_number(key, value)?,
            "flushIntervalMs" => {
                self.batch.flush_interval = Duration::from_millis(parse_number(key, value)?)
            }
            other => return Err(ConfigError::UnknownProperty(other.to_string())),
        }
        Ok(())
    }

    /// Build settings from `(key, value)` property pairs.
    pub fn from_properties<'a, I>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut settings = Self::default();
        for (key, value) in properties {
            settings.set_property(key, value)?;
        }
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Fully resolved configuration handed to the delivery component.
#[derive(Clone)]
pub struct ApiConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub application: Option<String>,
    pub environment: Option<String>,
    pub transport: Transport,
    pub allow_self_logging: bool,
    pub env_detail: EnvironmentDetail,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| crate::env::REDACTED))
            .field("application", &self.application)
            .field("environment", &self.environment)
            .field("transport", &self.transport)
            .field("allow_self_logging", &self.allow_self_logging)
            .field("env_detail", &self.env_detail)
            .finish()
    }
}

impl ApiConfig {
    /// Resolve settings against the process environment.
    ///
    /// Precedence per field: explicit setting, then the matching
    /// `STACKIFY_*` variable, then the built-in default. The API URL counts
    /// as explicit only when it differs from [`DEFAULT_API_URL`].
    pub fn from_env_with_overrides(settings: &AppenderSettings) -> Result<Self, ConfigError> {
        let api_url = if settings.api_url != DEFAULT_API_URL {
            settings.api_url.clone()
        } else {
            env_opt(STACKIFY_API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string())
        };
        let api_url = api_url.trim().trim_end_matches('/').to_string();
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let api_key = settings.api_key.clone().or_else(|| env_opt(STACKIFY_API_KEY_ENV));
        let application = settings
            .application
            .clone()
            .or_else(|| env_opt(STACKIFY_APPLICATION_ENV));
        let environment = settings
            .environment
            .clone()
            .or_else(|| env_opt(STACKIFY_ENVIRONMENT_ENV));

        let transport = match settings.transport.clone().or_else(|| env_opt(STACKIFY_TRANSPORT_ENV)) {
            Some(selector) => selector.parse()?,
            None => Transport::default(),
        };

        let allow_self_logging = settings.allow_self_logging.unwrap_or_else(|| {
            env_opt(STACKIFY_ALLOW_SELF_LOGGING_ENV)
                .map(|v| parse_flag(&v))
                .unwrap_or(false)
        });

        let env_detail = environment_detail(application.as_deref(), environment.as_deref());

        Ok(Self {
            api_url,
            api_key,
            application,
            environment,
            transport,
            allow_self_logging,
            env_detail,
        })
    }
}

/// Describe the running process.
pub fn environment_detail(application: Option<&str>, environment: Option<&str>) -> EnvironmentDetail {
    let device_name = env_opt("HOSTNAME").or_else(|| env_opt("COMPUTERNAME"));
    let app_name = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()));
    let app_location = std::env::current_dir()
        .ok()
        .map(|p| p.to_string_lossy().into_owned());

    EnvironmentDetail {
        device_name,
        app_name,
        app_location,
        configured_app_name: application.map(str::to_string),
        configured_environment_name: environment.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_plugin_defaults() {
        let settings = AppenderSettings::default();
        assert_eq!(settings.api_url, "https://api.stackify.com");
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.application, None);
        assert_eq!(settings.environment, None);
        assert!(!settings.skip_json);
        assert!(!settings.mask_enabled);
    }

    #[test]
    fn properties_are_applied_by_name() {
        let settings = AppenderSettings::from_properties([
            ("apiKey", "key"),
            ("application", "billing"),
            ("environment", "prod"),
            ("maskEnabled", "true"),
            ("maskSSN", "false"),
            ("maskCustom", r"order-\d+"),
            ("batchSize", "10"),
        ])
        .unwrap();

        assert_eq!(settings.api_key.as_deref(), Some("key"));
        assert_eq!(settings.application.as_deref(), Some("billing"));
        assert!(settings.mask_enabled);
        assert_eq!(settings.mask_ssn, Some(false));
        assert_eq!(settings.mask_credit_card, None);
        assert_eq!(settings.mask_custom.as_deref(), Some(r"order-\d+"));
        assert_eq!(settings.batch.batch_size, 10);
    }

    #[test]
    fn unknown_or_malformed_properties_are_rejected() {
        let mut settings = AppenderSettings::default();
        assert!(matches!(
            settings.set_property("colour", "blue"),
            Err(ConfigError::UnknownProperty(_))
        ));
        assert!(matches!(
            settings.set_property("batchSize", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn explicit_settings_win() {
        let settings = AppenderSettings {
            api_url: "http://localhost:8080/".into(),
            api_key: Some("key".into()),
            application: Some("billing".into()),
            environment: Some("prod".into()),
            transport: Some("console".into()),
            allow_self_logging: Some(true),
            ..Default::default()
        };

        let config = ApiConfig::from_env_with_overrides(&settings).unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.transport, Transport::Console);
        assert!(config.allow_self_logging);
        assert_eq!(config.env_detail.configured_app_name.as_deref(), Some("billing"));
        assert_eq!(config.env_detail.configured_environment_name.as_deref(), Some("prod"));
    }

    #[test]
    fn rejects_non_http_urls_and_unknown_transports() {
        let settings = AppenderSettings {
            api_url: "ftp://example.com".into(),
            ..Default::default()
        };
        assert!(matches!(
            ApiConfig::from_env_with_overrides(&settings),
            Err(ConfigError::InvalidApiUrl(_))
        ));

        let settings = AppenderSettings {
            transport: Some("carrier-pigeon".into()),
            ..Default::default()
        };
        assert!(matches!(
            ApiConfig::from_env_with_overrides(&settings),
            Err(ConfigError::UnknownTransport(_))
        ));
    }

    #[test]
    fn debug_output_hides_the_api_key() {
        let settings = AppenderSettings {
            api_key: Some("super-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("super-secret"));
    }
}
