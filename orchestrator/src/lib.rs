pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod map_phase;
pub mod pipeline;
pub mod reduce_phase;
pub mod report;
pub mod retry;
pub mod splitter;
pub mod verify;

pub use client::{WorkerApi, WorkerClient};
pub use config::{ConfigError, OrchestratorConfig, StoreConfig};
pub use dispatcher::TaskDispatcher;
pub use map_phase::{MapPhase, MapPhaseResult};
pub use pipeline::{PipelineError, PipelineRunner};
pub use reduce_phase::ReducePhase;
pub use retry::{Backoff, RetryPolicy};
pub use splitter::{ChunkSizing, FixedCount, Splitter, TargetBytes};
