pub mod config;
pub mod encoder;
pub mod metrics;
pub mod orchestrator;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, BusyPolicy, Config,
    ConfigError,
};
pub use encoder::{
    parse_payload, translate, ConfigDocument, EncodeError, Encoder, FfmpegEncoder, FfprobeProber,
    JobError, ProbeError, ProbeResult, Prober, ProgressHandle, ProgressSnapshot, ToolError,
    TranslateError,
};
pub use orchestrator::{
    EncodeOrchestrator, EncodeRequest, JobPhase, OrchestratorStatus, StatusEvent, Subscriber,
    SubscriberId, SubscriberRegistry, SubscriberWriteError, SubmitError, SubmitOutcome,
};
