//! Job progress projection
//!
//! Combines status, timeline, photo presence and checklist state into the six
//! steps a worker walks through during a visit.

use serde::Serialize;

use crate::domain::check_event::CheckEventType;
use crate::domain::job::JobStatus;
use crate::rules::checklist::ChecklistSummary;
use crate::rules::timeline::{TimelineEntry, has_event};

/// The fixed sequence of visit steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    Scheduled,
    CheckIn,
    BeforePhoto,
    Checklist,
    AfterPhoto,
    CheckOut,
}

impl ProgressStep {
    pub const ALL: [ProgressStep; 6] = [
        ProgressStep::Scheduled,
        ProgressStep::CheckIn,
        ProgressStep::BeforePhoto,
        ProgressStep::Checklist,
        ProgressStep::AfterPhoto,
        ProgressStep::CheckOut,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProgressStep::Scheduled => "Scheduled",
            ProgressStep::CheckIn => "Check in",
            ProgressStep::BeforePhoto => "Before photo",
            ProgressStep::Checklist => "Checklist",
            ProgressStep::AfterPhoto => "After photo",
            ProgressStep::CheckOut => "Check out",
        }
    }
}

/// A step and whether it is done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepState {
    pub step: ProgressStep,
    pub completed: bool,
}

/// Everything the progress projection is derived from
#[derive(Debug, Clone, Copy)]
pub struct ProgressInputs<'a> {
    pub status: JobStatus,
    pub timeline: &'a [TimelineEntry],
    pub has_before_photo: bool,
    pub has_after_photo: bool,
    pub checklist: ChecklistSummary,
}

/// Ordered six-step projection of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobProgress {
    pub steps: [StepState; 6],
}

impl JobProgress {
    /// Derives the projection
    ///
    /// Check-in and check-out fall back to the job status when the timeline
    /// has not caught up yet, so a refetched status alone is enough to mark
    /// them done.
    pub fn derive(inputs: ProgressInputs<'_>) -> Self {
        let checked_in = has_event(inputs.timeline, &CheckEventType::CheckIn)
            || matches!(inputs.status, JobStatus::InProgress | JobStatus::Completed);
        let checked_out = has_event(inputs.timeline, &CheckEventType::CheckOut)
            || inputs.status == JobStatus::Completed;

        let completed = |step: ProgressStep| match step {
            ProgressStep::Scheduled => true,
            ProgressStep::CheckIn => checked_in,
            ProgressStep::BeforePhoto => inputs.has_before_photo,
            ProgressStep::Checklist => checked_in && inputs.checklist.checklist_ok(),
            ProgressStep::AfterPhoto => inputs.has_after_photo,
            ProgressStep::CheckOut => checked_out,
        };

        Self {
            steps: ProgressStep::ALL.map(|step| StepState {
                step,
                completed: completed(step),
            }),
        }
    }

    pub fn is_completed(&self, step: ProgressStep) -> bool {
        self.steps
            .iter()
            .any(|state| state.step == step && state.completed)
    }

    /// First step that is not done yet
    pub fn current_step(&self) -> Option<ProgressStep> {
        self.steps
            .iter()
            .find(|state| !state.completed)
            .map(|state| state.step)
    }

    pub fn completed_count(&self) -> usize {
        self.steps.iter().filter(|state| state.completed).count()
    }
}
