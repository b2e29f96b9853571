//! # Setforge Common Library
//!
//! Shared code for the setforge service and its tooling:
//! - Error type
//! - TOML bootstrap configuration and root folder resolution
//! - Event types (SetforgeEvent enum) and the EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
