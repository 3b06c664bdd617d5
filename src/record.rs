use serde::Serialize;
use std::collections::BTreeMap;

/// Description of the process and environment that produced a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EnvironmentDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configured_environment_name: Option<String>,
}

/// HTTP request that was in flight when an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebRequestDetail {
    #[serde(rename = "UserIPAddress", skip_serializing_if = "Option::is_none")]
    pub user_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_url_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query_string: BTreeMap<String, String>,
}

/// One frame of an [`ErrorItem`] stack trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceFrame {
    pub code_file_name: String,
    pub line_num: u32,
    pub method: String,
}

/// Normalized error, with its cause chain nested in `inner_error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorItem {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_method: Option<String>,
    pub stack_trace: Vec<TraceFrame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_error: Option<Box<ErrorItem>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

/// Error occurrence enriched with environment, user and request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorRecord {
    pub environment_detail: EnvironmentDetail,
    pub occurred_epoch_millis: i64,
    pub error: ErrorItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_request_detail: Option<WebRequestDetail>,
    pub server_variables: BTreeMap<String, String>,
}

/// A single log line, normalized for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogMsg {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ex: Option<ErrorRecord>,
    pub th: String,
    pub epoch_ms: i64,
    pub level: String,
    #[serde(rename = "TransID", skip_serializing_if = "Option::is_none")]
    pub trans_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_line: Option<u32>,
}

/// Batch of [`LogMsg`]s as posted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogMsgGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_loc: Option<String>,
    pub logger: String,
    pub platform: String,
    pub msgs: Vec<LogMsg>,
}

impl LogMsgGroup {
    pub fn new(env: &EnvironmentDetail, logger: impl Into<String>, msgs: Vec<LogMsg>) -> Self {
        Self {
            env: env.configured_environment_name.clone(),
            server_name: env.device_name.clone(),
            app_name: env
                .configured_app_name
                .clone()
                .or_else(|| env.app_name.clone()),
            app_loc: env.app_location.clone(),
            logger: logger.into(),
            platform: "rust".to_string(),
            msgs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_msg_uses_wire_field_names_and_omits_absent_values() {
        let msg = LogMsg {
            msg: "hello".into(),
            data: None,
            ex: None,
            th: "main".into(),
            epoch_ms: 42,
            level: "info".into(),
            trans_id: Some("abc".into()),
            src_method: None,
            src_line: None,
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["Msg"], "hello");
        assert_eq!(json["Th"], "main");
        assert_eq!(json["EpochMs"], 42);
        assert_eq!(json["TransID"], "abc");
        assert!(json.get("Data").is_none());
        assert!(json.get("SrcLine").is_none());
    }

    #[test]
    fn group_prefers_configured_app_name() {
        let env = EnvironmentDetail {
            device_name: Some("host-1".into()),
            app_name: Some("bin".into()),
            configured_app_name: Some("billing".into()),
            configured_environment_name: Some("prod".into()),
            ..Default::default()
        };

        let group = LogMsgGroup::new(&env, "client/0.1", Vec::new());
        assert_eq!(group.app_name.as_deref(), Some("billing"));
        assert_eq!(group.server_name.as_deref(), Some("host-1"));
        assert_eq!(group.env.as_deref(), Some("prod"));

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["ServerName"], "host-1");
        assert_eq!(json["Msgs"], serde_json::json!([]));
    }
}
