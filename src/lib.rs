//! # metric-query
//!
//! Turns natural-language questions about company performance ("Compare
//! Acme and Globex revenue since March 2024") into one structured request
//! per company: entity, metric and a normalized `YYYY-MM-DD` date range.
//!
//! Extraction is delegated to an OpenAI-compatible chat completion API
//! (Groq by default). The last few interactions of a session are sent along
//! as context so follow-up questions can refer back to earlier ones.

pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod server;
pub mod session;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use query::{MetricResult, QueryService};
pub use session::SessionId;
