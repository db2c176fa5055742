//! # Host Bridge Traits
//!
//! Capability contracts the enrichment core needs from its host.
//!
//! The core never opens sockets or writes log files on its own. Everything
//! with a side effect goes through one of these traits so the pipeline can be
//! driven by a scripted double in tests and by real adapters in production.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests to the catalog and
//!   the metadata providers
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to the host
//!
//! ## Implementations
//!
//! | Host     | Implementation Crate |
//! |----------|----------------------|
//! | Desktop  | `bridge-desktop`     |
//! | Tests    | `mockall` doubles    |
//!
//! ## Fail-Fast Strategy
//!
//! A missing capability is a startup error, never a per-request one:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "Enable the desktop-shims feature or inject a client".to_string(),
//!     })?;
//! ```
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across the concurrent provider lookups of one enrichment run.

pub mod error;
pub mod http;
pub mod logging;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
