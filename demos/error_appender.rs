use tracing::{error, info};

use tracing_stackify::config::AppenderSettings;
use tracing_stackify::init::{init_tracing_with_config, LayerConfig};

#[tokio::main]
async fn main() {
    let settings = AppenderSettings {
        application: Some("billing".into()),
        environment: Some("dev".into()),
        transport: Some("console".into()),
        ..Default::default()
    };
    let config = LayerConfig {
        errors_only: true,
        ..Default::default()
    };

    let appender = match init_tracing_with_config(settings, config) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("failed to init tracing: {e}");
            return;
        }
    };

    info!("not forwarded by the errors-only appender");
    let parse = "12x".parse::<u32>().unwrap_err();
    error!(error = &parse as &(dyn std::error::Error + 'static), "invoice total unreadable");
    error!("ledger out of balance");

    appender.stop().await;
}
