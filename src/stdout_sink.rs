use crate::record::LogMsgGroup;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::io::Write;

/// Writes each batch as one JSON line on stdout. Selected with the
/// `console` transport; handy for local development.
#[derive(Clone, Default)]
pub struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, group: &LogMsgGroup) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = serde_json::to_string(group)?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line)?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        std::io::stdout().flush()?;
        Ok(())
    }
}
