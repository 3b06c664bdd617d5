use crate::adapter::{try_encode, EventAdapter};
use crate::config::ApiConfig;
use crate::error::DeliveryError;
use crate::event::LogEvent;
use crate::mask::Masker;
use crate::record::{EnvironmentDetail, LogMsg, LogMsgGroup};
use crate::sink::LogSink;
use crate::transport::make_sink_from_config;
use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, MissedTickBehavior};

/// Module prefix of this crate. Events logged from here are dropped unless
/// self-logging is allowed, so a failing sink cannot feed itself.
const SELF_MODULE_PREFIX: &str = "tracing_stackify";

/// Buffering and retry knobs of the delivery task.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Maximum number of queued messages before new ones are dropped.
    pub channel_buffer: usize,
    /// Messages per batch handed to the sink.
    pub batch_size: usize,
    /// Longest time a partial batch waits before it is sent.
    pub flush_interval: Duration,
    /// Sink attempts per batch before the batch is given up.
    pub max_attempts: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl BatchConfig {
    /// Enforce minimal thresholds to avoid degenerate configs.
    fn normalized(&self) -> Self {
        Self {
            channel_buffer: self.channel_buffer.max(16),
            batch_size: self.batch_size.max(1),
            flush_interval: self.flush_interval.max(Duration::from_millis(10)),
            max_attempts: self.max_attempts.max(1),
        }
    }
}

/// Event counters shared between the appender and its background task.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    /// Events handed to `append`/`append_error`.
    pub total: AtomicU64,
    /// Messages successfully queued.
    pub enqueued: AtomicU64,
    /// Messages dropped because the channel was full.
    pub dropped: AtomicU64,
    /// Events skipped by the self-logging or errors-only filters.
    pub filtered: AtomicU64,
    /// Messages accepted by the sink.
    pub sent: AtomicU64,
    /// Messages lost after exhausting sink retries.
    pub failed: AtomicU64,
}

impl DeliveryStats {
    fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Lifecycle of a delivery component, as driven by the host glue.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Resolve the sink and start background work. Must be called before
    /// any event is submitted.
    fn activate(&mut self, config: &ApiConfig) -> Result<(), DeliveryError>;

    /// Queue any log line.
    fn submit(&self, event: LogEvent) -> Result<(), DeliveryError>;

    /// Queue the event only if it qualifies as an error.
    fn submit_error(&self, event: LogEvent) -> Result<(), DeliveryError>;

    /// Stop accepting events and flush everything still queued.
    async fn shutdown(&mut self) -> Result<(), DeliveryError>;
}

struct Running {
    sender: mpsc::Sender<LogMsg>,
    handle: JoinHandle<()>,
}

/// Batching delivery component.
///
/// Events are converted by the adapter on the calling thread, masked, and
/// pushed into a bounded channel. A background Tokio task groups them into
/// [`LogMsgGroup`]s and hands those to the [`LogSink`], retrying with
/// exponential backoff. Network I/O never runs on application threads.
pub struct LogAppender {
    client_name: String,
    adapter: Arc<dyn EventAdapter<LogEvent>>,
    masker: Masker,
    skip_json: bool,
    batch: BatchConfig,
    sink: Option<Arc<dyn LogSink>>,
    allow_self_logging: bool,
    running: Option<Running>,
    stats: Arc<DeliveryStats>,
}

impl LogAppender {
    pub fn new(
        client_name: impl Into<String>,
        adapter: Arc<dyn EventAdapter<LogEvent>>,
        masker: Masker,
        skip_json: bool,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            adapter,
            masker,
            skip_json,
            batch: BatchConfig::default(),
            sink: None,
            allow_self_logging: false,
            running: None,
            stats: Arc::new(DeliveryStats::default()),
        }
    }

    pub fn with_batch_config(mut self, batch: BatchConfig) -> Self {
        self.batch = batch;
        self
    }

    /// Use `sink` instead of building one from the configured transport.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn stats(&self) -> Arc<DeliveryStats> {
        Arc::clone(&self.stats)
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// Start the background task on the current Tokio runtime.
    pub fn activate(&mut self, config: &ApiConfig) -> Result<(), DeliveryError> {
        if self.running.is_some() {
            return Err(DeliveryError::AlreadyActive);
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(DeliveryError::NoRuntime)?;
        let sink = match &self.sink {
            Some(sink) => Arc::clone(sink),
            None => make_sink_from_config(config)?,
        };

        let batch = self.batch.normalized();
        let (tx, rx) = mpsc::channel::<LogMsg>(batch.channel_buffer);

        let worker = Worker {
            sink,
            env_detail: config.env_detail.clone(),
            logger: self.client_name.clone(),
            batch,
            stats: Arc::clone(&self.stats),
        };
        let handle = runtime.spawn(worker.run(rx));

        self.allow_self_logging = config.allow_self_logging;
        self.running = Some(Running { sender: tx, handle });
        Ok(())
    }

    /// Queue any log line, with an error record attached when the event
    /// carries a live error or is at error level.
    pub fn append(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.enqueue(event, false)
    }

    /// Queue the event only when it produces an error record.
    pub fn append_error(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.enqueue(event, true)
    }

    /// Close the channel and wait for the background task to send what is
    /// left. Closing an inactive appender is a no-op.
    pub async fn close(&mut self) -> Result<(), DeliveryError> {
        let Some(Running { sender, handle }) = self.running.take() else {
            return Ok(());
        };
        drop(sender);
        handle.await.map_err(DeliveryError::Join)
    }

    fn enqueue(&self, event: LogEvent, errors_only: bool) -> Result<(), DeliveryError> {
        let running = self.running.as_ref().ok_or(DeliveryError::NotActivated)?;
        DeliveryStats::bump(&self.stats.total, 1);

        if !self.allow_self_logging && self.is_self_event(&event) {
            DeliveryStats::bump(&self.stats.filtered, 1);
            return Ok(());
        }

        let throwable = self.adapter.throwable(&event);
        let error = if throwable.is_some() || self.adapter.is_error_level(&event) {
            let exception = throwable.as_deref().map(|e| e as &(dyn Error + 'static));
            Some(self.adapter.error_record(&event, exception))
        } else {
            None
        };

        if errors_only && error.is_none() {
            DeliveryStats::bump(&self.stats.filtered, 1);
            return Ok(());
        }

        let mut msg = self.adapter.log_msg(&event, error);
        self.prepare(&mut msg);

        match running.sender.try_send(msg) {
            Ok(()) => {
                DeliveryStats::bump(&self.stats.enqueued, 1);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                DeliveryStats::bump(&self.stats.dropped, 1);
                Err(DeliveryError::ChannelFull)
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::ChannelClosed),
        }
    }

    fn is_self_event(&self, event: &LogEvent) -> bool {
        match self.adapter.class_name(event) {
            Some(class) => {
                class == SELF_MODULE_PREFIX
                    || class
                        .strip_prefix(SELF_MODULE_PREFIX)
                        .is_some_and(|rest| rest.starts_with("::"))
            }
            None => false,
        }
    }

    fn prepare(&self, msg: &mut LogMsg) {
        if !self.skip_json && msg.data.is_none() {
            msg.data = embedded_json(&msg.msg);
        }

        if self.masker.is_empty() {
            return;
        }
        msg.msg = self.masker.mask(&msg.msg);
        if let Some(data) = msg.data.as_mut() {
            *data = self.masker.mask(data);
        }
        if let Some(ex) = msg.ex.as_mut() {
            let mut item = Some(&mut ex.error);
            while let Some(current) = item {
                current.message = self.masker.mask(&current.message);
                item = current.inner_error.as_deref_mut();
            }
        }
    }
}

#[async_trait]
impl Delivery for LogAppender {
    fn activate(&mut self, config: &ApiConfig) -> Result<(), DeliveryError> {
        LogAppender::activate(self, config)
    }

    fn submit(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.append(event)
    }

    fn submit_error(&self, event: LogEvent) -> Result<(), DeliveryError> {
        self.append_error(event)
    }

    async fn shutdown(&mut self) -> Result<(), DeliveryError> {
        self.close().await
    }
}

/// JSON object embedded in a message, between its first `{` and last `}`.
fn embedded_json(message: &str) -> Option<String> {
    let start = message.find('{')?;
    let end = message.rfind('}')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(&message[start..=end]) {
        Ok(value @ serde_json::Value::Object(_)) => try_encode(&value),
        _ => None,
    }
}

/// State owned by the background task.
struct Worker {
    sink: Arc<dyn LogSink>,
    env_detail: EnvironmentDetail,
    logger: String,
    batch: BatchConfig,
    stats: Arc<DeliveryStats>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<LogMsg>) {
        let mut batch = Vec::with_capacity(self.batch.batch_size);
        let mut ticker = tokio::time::interval(self.batch.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(msg) => {
                        batch.push(msg);
                        if batch.len() >= self.batch.batch_size {
                            if let Err(e) = self.send_batch(&mut batch).await {
                                eprintln!("error sending log batch: {}", e);
                            }
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    if !batch.is_empty() {
                        if let Err(e) = self.send_batch(&mut batch).await {
                            eprintln!("error flushing log batch: {}", e);
                        }
                    }
                }
            }
        }

        if !batch.is_empty() {
            if let Err(e) = self.send_batch(&mut batch).await {
                eprintln!("error flushing log batch on close: {}", e);
            }
        }
        if let Err(e) = self.sink.flush().await {
            eprintln!("error flushing log sink on close: {}", e);
        }
    }

    async fn send_batch(&self, batch: &mut Vec<LogMsg>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let group = LogMsgGroup::new(&self.env_detail, self.logger.clone(), std::mem::take(batch));
        let count = group.msgs.len() as u64;

        let mut backoff = Duration::from_millis(100);
        let max_backoff = Duration::from_secs(10);
        let mut attempt = 1;

        loop {
            match self.sink.send(&group).await {
                Ok(()) => {
                    DeliveryStats::bump(&self.stats.sent, count);
                    return Ok(());
                }
                Err(e) if attempt >= self.batch.max_attempts => {
                    DeliveryStats::bump(&self.stats.failed, count);
                    return Err(e);
                }
                Err(e) => {
                    eprintln!("log sink send failed ({}), retrying in {:?}", e, backoff);
                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, max_backoff);
                    attempt += 1;
                }
            }
        }
    }
}
