//! Ship `tracing` events and errors to Stackify.
//!
//! Events are converted by an [`adapter::EventAdapter`] into
//! [`record::LogMsg`]s (with an attached [`record::ErrorRecord`] for
//! errors), masked, and delivered in batches by a background task.
//!
//! ```no_run
//! use tracing_stackify::config::AppenderSettings;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let appender = tracing_stackify::init::init_tracing(AppenderSettings {
//!     api_key: Some("YOUR_API_KEY".into()),
//!     application: Some("billing".into()),
//!     environment: Some("prod".into()),
//!     ..Default::default()
//! })?;
//!
//! tracing::error!(order_id = 42, "payment declined");
//!
//! appender.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod appender;
pub mod config;
pub mod context;
pub mod delivery;
pub mod env;
pub mod error;
pub mod event;
pub mod layer;
pub mod mask;
pub mod record;
pub mod sink;
pub mod throwables;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub mod init;
pub mod noop_sink;
pub mod stdout_sink;
