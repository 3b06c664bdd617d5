use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_stackify::adapter::EventAdapter;
use tracing_stackify::appender::{DeliveryFactory, StackifyAppender};
use tracing_stackify::config::AppenderSettings;
use tracing_stackify::delivery::{BatchConfig, Delivery, LogAppender};
use tracing_stackify::event::LogEvent;
use tracing_stackify::init::{install, LayerConfig};
use tracing_stackify::mask::Masker;
use tracing_stackify::noop_sink::NoopSink;

/// Real delivery pipeline with batches dropped at the sink.
struct NoopDelivery;

impl DeliveryFactory for NoopDelivery {
    fn create(
        &self,
        client_name: &str,
        adapter: Arc<dyn EventAdapter<LogEvent>>,
        masker: Masker,
        skip_json: bool,
        batch: &BatchConfig,
    ) -> Box<dyn Delivery> {
        Box::new(
            LogAppender::new(client_name, adapter, masker, skip_json)
                .with_batch_config(batch.clone())
                .with_sink(Arc::new(NoopSink)),
        )
    }
}

#[tokio::main]
async fn main() {
    let mut settings = AppenderSettings {
        transport: Some("console".into()),
        mask_enabled: true,
        ..Default::default()
    };
    settings.batch.channel_buffer = 50_000;
    settings.batch.batch_size = 1_000;

    let appender = StackifyAppender::log(settings).with_delivery_factory(Arc::new(NoopDelivery));
    let config = LayerConfig {
        enable_stdout: false,
        ..Default::default()
    };
    let appender = match install(appender, &config) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("failed to init tracing: {e}");
            return;
        }
    };

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "default config: appended {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    appender.stop().await;
    let dropped = appender.status().errors().len();
    println!("appender reported {} errors (full channel counts as one each)", dropped);
}
