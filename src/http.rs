use crate::error::SinkBuildError;
use crate::record::LogMsgGroup;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// Path of the log ingestion endpoint, relative to the API URL.
pub const LOG_SAVE_PATH: &str = "/Log/Save";

/// Protocol version header expected by the ingestion API.
const PROTOCOL_VERSION: &str = "V1";

/// [`LogSink`] posting JSON batches to the ingestion API over HTTPS.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpSink {
    /// Construct a sink for `api_url` (without the endpoint path).
    pub fn new(api_url: &str, api_key: impl Into<String>) -> Result<Self, SinkBuildError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SinkBuildError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint(api_url),
            api_key: api_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint(api_url: &str) -> String {
    format!("{}{}", api_url.trim_end_matches('/'), LOG_SAVE_PATH)
}

#[async_trait]
impl LogSink for HttpSink {
    async fn send(&self, group: &LogMsgGroup) -> Result<(), Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-Stackify-Key", &self.api_key)
            .header("X-Stackify-PV", PROTOCOL_VERSION)
            .json(group)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("log upload failed with status {}: {}", status, text).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_joined_without_double_slash() {
        assert_eq!(endpoint("https://api.stackify.com"), "https://api.stackify.com/Log/Save");
        assert_eq!(endpoint("http://localhost:9000/"), "http://localhost:9000/Log/Save");
    }
}
