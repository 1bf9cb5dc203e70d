//! Encode orchestrator: job queue, subscribers and progress broadcasting.
//!
//! - **Dispatch**: sequential, one job at a time, in arrival order
//! - **Progress**: one ticker task per running job, pushing to all subscribers
//! - **Delivery**: concurrent per-subscriber sends; failed writers are dropped

mod broadcaster;
mod registry;
mod runner;
mod types;

pub use broadcaster::{percent_complete, ProgressBroadcaster};
pub use registry::{
    BroadcastReport, Subscriber, SubscriberId, SubscriberRegistry, SubscriberWriteError,
};
pub use runner::EncodeOrchestrator;
pub use types::{
    ActiveJob, EncodeRequest, JobPhase, OrchestratorStatus, StatusEvent, SubmitError,
    SubmitOutcome,
};
