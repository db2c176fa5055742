//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the enrichment crates:
//! - Configuration ([`config`]) with fail-fast validation
//! - Logging and tracing bootstrap ([`logging`])
//! - Progress events ([`events`])

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
