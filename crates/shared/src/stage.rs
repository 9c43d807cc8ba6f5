//! The unit of work the research pipeline is built from.

use async_trait::async_trait;

use crate::state::PipelineState;

/// One enrichment step of the pipeline.
///
/// `run` is total: a stage recovers from every failure itself, writing a
/// fallback for its own fields and appending to the state's error log.
/// Fields owned by other stages must come back unchanged.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Unique stage identifier (snake_case)
    fn id(&self) -> &'static str;

    /// Human-readable name, also written to `step_info`
    fn name(&self) -> &'static str;

    async fn run(&self, state: PipelineState) -> PipelineState;
}
