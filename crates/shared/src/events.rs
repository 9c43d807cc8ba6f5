//! Progress events emitted while a pipeline run is in flight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    Started {
        run_id: Uuid,
        stage_id: String,
        at: DateTime<Utc>,
    },
    Completed {
        run_id: Uuid,
        stage_id: String,
        duration_ms: u64,
        /// Errors the stage appended to the state's log
        new_errors: usize,
        step_info: String,
    },
}

impl StageEvent {
    pub fn stage_id(&self) -> &str {
        match self {
            StageEvent::Started { stage_id, .. } | StageEvent::Completed { stage_id, .. } => {
                stage_id
            }
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            StageEvent::Started { run_id, .. } | StageEvent::Completed { run_id, .. } => *run_id,
        }
    }
}
