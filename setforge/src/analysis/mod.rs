//! Per-track audio analysis
//!
//! The orchestrator only knows the `AnalysisEngine` trait. `SignalEngine` is
//! the default implementation: symphonia decoding followed by lightweight
//! tempo, key and energy estimation.

pub mod decoder;
pub mod engine;
pub mod features;

pub use engine::SignalEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Features extracted from one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackFeatures {
    /// Beats per minute, 2 decimals
    pub bpm: f64,
    /// Camelot notation ("8B") or "Unknown"
    pub key: String,
    /// Intensity derived from frame RMS, 3 decimals
    pub energy: f64,
}

/// Engine-reported failure for a single track
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// File could not be opened, probed or decoded
    #[error("{0}")]
    Decode(String),

    /// Decoding produced no samples
    #[error("no audio samples decoded")]
    NoAudio,

    /// Engine crashed or was unavailable
    #[error("{0}")]
    Internal(String),
}

/// Computes features for a single stored audio file
///
/// Implementations must be safe to call concurrently for different files.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &'static str;

    async fn analyze(&self, path: &Path) -> Result<TrackFeatures, AnalysisError>;
}
