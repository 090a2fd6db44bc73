pub mod conflict;
pub mod engine;
pub mod error;
pub mod executor;
pub mod observer;
pub mod reconciler;
pub mod registry;
pub mod scanner;

pub use conflict::{
    ConflictMode, ConflictPolicy, InteractivePolicy, PreferNewerPolicy, PreferSidePolicy,
    ResolutionChoice, SkipPolicy,
};
pub use engine::{EngineConfig, SyncEngine, SyncReport, SyncStatus};
pub use error::SyncError;
pub use executor::{ActionExecutor, ActionOutcome, RegistryUpdate};
pub use observer::{ConsoleObserver, SyncEventKind, SyncObserver};
pub use reconciler::{
    decide, reconcile, ActionKind, DecisionSummary, Side, SyncAction, SyncDecision,
};
pub use registry::{Registry, RegistryFormat, RegistryStore};
pub use scanner::{FileScanner, ScanConfig, Snapshot};
