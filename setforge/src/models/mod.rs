//! Data models for sessions, tracks and export artifacts

pub mod export;
pub mod session;
pub mod track;

pub use export::{ExportArtifact, PlaylistEntry, SkippedTrack};
pub use session::{AnalysisProgress, Session, SessionId, SessionState, StateTransition};
pub use track::{AnalysisResult, StorageHandle, Track, TrackStatus};
