use tokio::time::{sleep, Duration};
use tracing::{error, info, info_span, warn};

use tracing_stackify::config::AppenderSettings;
use tracing_stackify::init::init_tracing;

#[derive(Debug, thiserror::Error)]
#[error("payment gateway timed out")]
struct GatewayTimeout;

#[tokio::main]
async fn main() {
    // Reads STACKIFY_API_KEY and friends from the environment; the console
    // transport prints the JSON batches instead of posting them.
    let settings = AppenderSettings {
        application: Some("checkout".into()),
        environment: Some("dev".into()),
        transport: Some("console".into()),
        mask_enabled: true,
        ..Default::default()
    };

    let appender = match init_tracing(settings) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("failed to init tracing: {e}");
            return;
        }
    };

    let span = info_span!("place_order");
    {
        let _entered = span.enter();
        info!(order_id = 42, "order received");
        warn!(card = "4111 1111 1111 1111", "card number in a log line gets masked");
        info!(r#"payload {{"sku":"A-1","qty":2}}"#);
        let err = GatewayTimeout;
        error!(error = &err as &(dyn std::error::Error + 'static), "charging the card failed");
    }

    sleep(Duration::from_millis(100)).await;
    appender.stop().await;
}
