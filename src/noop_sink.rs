use crate::record::LogMsgGroup;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;

/// A sink that simply drops all batches.
///
/// Useful for measuring the overhead of the appender itself without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _group: &LogMsgGroup) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
