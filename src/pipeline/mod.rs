pub mod batch;
mod id;
pub mod orchestrator;
pub mod quality;
pub mod router;
pub mod stages;
pub mod state;

pub use batch::{run_batched, BatchSettings};
pub use id::derive_id;
pub use orchestrator::{PipelineMode, PipelineSettings, RecommendationPipeline};
pub use stages::{PipelineTools, Stage, StageName};
pub use state::{PipelineState, StateField, StateUpdate};
