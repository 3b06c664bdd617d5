use crate::record::LogMsgGroup;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches produced by the delivery
/// component.
///
/// Implementations are responsible for transporting batches to a concrete
/// destination (the ingestion API, stdout, a test buffer). The delivery
/// component calls `send` from its background task and never awaits it on
/// the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Send one batch.
    ///
    /// **Returns**
    /// - `Ok(())` if the batch was accepted.
    /// - `Err(..)` on network, serialization or HTTP status failures. The
    ///   delivery component treats this as transient and retries the batch
    ///   with backoff.
    async fn send(&self, group: &LogMsgGroup) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered batches, if the sink buffers.
    ///
    /// Called once when the delivery component closes. Default
    /// implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
