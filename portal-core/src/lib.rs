pub mod application;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod role;
pub mod storage;
pub mod tracker;

// Re-export commonly used types
pub use application::{Application, ApplicationRegistry, ApplicationSummary, sample_applications};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GateConfig;
pub use error::{PortalError, Result};
pub use gate::{ChallengeView, GateState, GateView, SessionGate, SubmitOutcome};
pub use pipeline::{Holder, PIPELINE, PipelineStage, StageId};
pub use role::Role;
pub use storage::{
    ApplicationStorage, FileSessionStore, InMemoryApplicationStorage, InMemorySessionStore,
    SessionRecord, SessionStore,
};
pub use tracker::{ApplicationStatusTracker, StageState, StageView, StatusReport};
