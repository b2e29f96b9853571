//! Pipeline services
//!
//! SessionManager owns all session state. The stage services reach tracks
//! only through its session-scoped locks.

pub mod analysis_orchestrator;
pub mod archive;
pub mod playlist_exporter;
pub mod session_manager;
pub mod session_reaper;
pub mod track_store;
pub mod upload_ingestor;

pub use analysis_orchestrator::AnalysisOrchestrator;
pub use playlist_exporter::PlaylistExporter;
pub use session_manager::{SessionGuard, SessionManager};
pub use session_reaper::SessionReaper;
pub use track_store::{FsTrackStore, StoreError, TrackStore};
pub use upload_ingestor::{IngestOutcome, UploadFilter, UploadIngestor, UploadedFile};
