pub mod analysis;
pub mod config;
pub mod diary_entry;
pub mod entry_store;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod remote_engine;
pub mod text_features;

pub use analysis::{AnalysisEngine, HeuristicEngine};
pub use diary_entry::{Analysis, DiaryEntry, EntryDraft, EntryPatch, Sentiment};
pub use entry_store::EntryStore;
pub use error::{DiaryError, ErrorKind, Result};
pub use orchestrator::{AnalysisOrchestrator, AnalysisStatus, RequestOutcome, RequestState};
