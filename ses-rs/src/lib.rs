//! ses-rs: Provider-style transactional email dispatch simulator
//!
//! Accepts send requests shaped like a cloud email provider's API, runs them
//! through the same checks the provider would, and records the outcome.
//! Nothing is delivered.
//!
//! # Features
//!
//! - **Validation**: ordered, fail-fast checks (address format, body size,
//!   recipient count, sandbox allow-list, verified sender, sending quota)
//! - **Quota**: sliding-window send counter, one entry per recipient
//! - **Failure injection**: optional synthetic provider errors
//! - **Stats**: totals and per-code error counters
//! - **Storage**: in-memory or SQLite
//!
//! # Example
//!
//! ```no_run
//! use ses_rs::config::Config;
//! use ses_rs::dispatch::Dispatcher;
//! use ses_rs::model::EmailRequest;
//! use ses_rs::storage::Stores;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let stores = Stores::open(&config.storage).await?;
//!     let dispatcher = Dispatcher::from_config(&config, &stores);
//!
//!     let request: EmailRequest = serde_json::from_str(r#"{
//!         "Source": "sender@example.com",
//!         "Destination": { "ToAddresses": ["to@example.com"] },
//!         "Message": {
//!             "Subject": { "Data": "Hi" },
//!             "Body": { "Text": { "Data": "Hello" } }
//!         }
//!     }"#)?;
//!
//!     let response = dispatcher.send(&request).await?;
//!     println!("sent {}", response.message_id);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod quota;
pub mod stats;
pub mod storage;
pub mod validation;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{ErrorCode, ProviderError, Result, ServiceError};
pub use model::{EmailRequest, SendEmailResponse};
pub use stats::EmailStats;
