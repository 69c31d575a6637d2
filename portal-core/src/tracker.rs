//! Status tracking for a single application.
//!
//! The tracker is a pure function of `(status, holder)`: it maps the status
//! code onto [`PIPELINE`], derives each stage's visual state and reports the
//! completion percentage. Unknown status codes are not an error; no stage is
//! active and progress is 0%.

use serde::Serialize;

use crate::pipeline::{PIPELINE, PipelineStage, StageId};

/// How a stage is drawn. `Active` wins over `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageState {
    Active,
    Completed,
    Pending,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageView {
    #[serde(flatten)]
    pub stage: StageSummary,
    pub state: StageState,
    pub completed: bool,
    pub active: bool,
    /// Stage holder equals the application's current holder label.
    pub holder_matches: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub id: StageId,
    pub title: &'static str,
    pub description: &'static str,
    pub holder: &'static str,
}

impl From<&PipelineStage> for StageSummary {
    fn from(stage: &PipelineStage) -> Self {
        Self {
            id: stage.id,
            title: stage.title,
            description: stage.description,
            holder: stage.holder.label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub application_id: String,
    /// `None` when the status code matched no stage.
    pub current_status: Option<StageId>,
    pub current_holder: String,
    pub stages: Vec<StageView>,
    pub progress_percent: u8,
}

impl StatusReport {
    pub fn active_stage(&self) -> Option<&StageView> {
        self.stages.iter().find(|s| s.active)
    }

    pub fn completed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.completed).count()
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationStatusTracker {
    application_id: String,
    current_status: Option<StageId>,
    current_holder: String,
}

impl ApplicationStatusTracker {
    pub fn new(
        application_id: impl Into<String>,
        current_status: &str,
        current_holder: impl Into<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            current_status: StageId::parse(current_status),
            current_holder: current_holder.into(),
        }
    }

    pub fn current_status(&self) -> Option<StageId> {
        self.current_status
    }

    /// Position of the current status in the pipeline, if it matched.
    pub fn current_index(&self) -> Option<usize> {
        self.current_status.map(|id| id.index())
    }

    pub fn progress_percent(&self) -> u8 {
        let reached = self.current_index().map_or(0, |i| i + 1);
        percent_rounded(reached, PIPELINE.len())
    }

    pub fn report(&self) -> StatusReport {
        let stages = PIPELINE
            .iter()
            .map(|stage| {
                let completed = stage.is_complete(self.current_status);
                let active = self.current_status == Some(stage.id);
                let state = if active {
                    StageState::Active
                } else if completed {
                    StageState::Completed
                } else {
                    StageState::Pending
                };
                StageView {
                    stage: stage.into(),
                    state,
                    completed,
                    active,
                    holder_matches: stage.holder.label() == self.current_holder,
                }
            })
            .collect();

        StatusReport {
            application_id: self.application_id.clone(),
            current_status: self.current_status,
            current_holder: self.current_holder.clone(),
            stages,
            progress_percent: self.progress_percent(),
        }
    }
}

/// `part / whole * 100`, rounding halves up (12.5 -> 13).
fn percent_rounded(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((part * 200 + whole) / (whole * 2)) as u8
}
