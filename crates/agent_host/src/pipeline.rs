//! Sequential stage execution.
//!
//! Runs each stage in order over one state value and reports progress on an
//! optional event channel. Stages contain their own failures, so there is
//! no retry, skip, or timeout logic here.

use shared::events::StageEvent;
use shared::stage::Stage;
use shared::state::PipelineState;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs pipeline stages in sequence over one state value.
pub struct PipelineExecutor {
    stages: Vec<Arc<dyn Stage>>,
    /// Channel for sending stage events
    event_sender: Option<mpsc::UnboundedSender<StageEvent>>,
}

impl PipelineExecutor {
    /// Create an executor that runs `stages` in the given order.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            event_sender: None,
        }
    }

    /// Send stage events to `event_sender` while running.
    pub fn with_events(mut self, event_sender: mpsc::UnboundedSender<StageEvent>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Stage ids in execution order.
    pub fn stage_ids(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Run every stage over `initial` and return the final state.
    pub async fn run(&self, initial: PipelineState) -> PipelineState {
        let run_id = Uuid::new_v4();
        let run_start = Instant::now();
        let mut state = initial;

        for stage in &self.stages {
            let stage_id = stage.id().to_string();
            let errors_before = state.errors().len();

            self.send_event(StageEvent::Started {
                run_id,
                stage_id: stage_id.clone(),
                at: chrono::Utc::now(),
            });
            info!(%run_id, stage = %stage_id, "stage started");

            let start = Instant::now();
            state = stage.run(state).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let new_errors = state.errors().len().saturating_sub(errors_before);
            for error in state.errors().get(errors_before..).unwrap_or_default() {
                warn!(%run_id, stage = %stage_id, error = %error, "stage recorded an error");
            }
            info!(%run_id, stage = %stage_id, duration_ms, new_errors, "stage completed");

            self.send_event(StageEvent::Completed {
                run_id,
                stage_id,
                duration_ms,
                new_errors,
                step_info: state.step_info.clone(),
            });
        }

        info!(
            %run_id,
            duration_ms = run_start.elapsed().as_millis() as u64,
            errors = state.errors().len(),
            "pipeline finished"
        );
        state
    }

    fn send_event(&self, event: StageEvent) {
        if let Some(ref sender) = self.event_sender {
            // Ignore send errors (receiver may have dropped)
            let _ = sender.send(event);
        }
    }
}
