//! Action gating
//!
//! Each worker action is either allowed or blocked by a list of unmet
//! preconditions. The UI disables blocked actions and shows the reasons; the
//! field engine re-checks the gate before touching the network.

use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::connectivity::Connectivity;
use crate::domain::job::JobStatus;
use crate::domain::photo::PhotoKind;
use crate::rules::checklist::ChecklistSummary;

/// A precondition that is not met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Blocker {
    ConnectivityUnknown,
    Offline,
    WrongStatus {
        expected: JobStatus,
        actual: JobStatus,
    },
    BeforePhotoMissing,
    AfterPhotoMissing,
    BeforePhotoPresent,
    AfterPhotoPresent,
    ChecklistIncomplete {
        remaining: usize,
    },
    /// Changes made on the device have not reached the backend yet
    PendingSync {
        pending: usize,
    },
    Busy,
}

impl std::fmt::Display for Blocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Blocker::ConnectivityUnknown => write!(f, "waiting for network status"),
            Blocker::Offline => write!(f, "device is offline"),
            Blocker::WrongStatus { expected, actual } => {
                write!(f, "job is {} (needs to be {})", actual, expected)
            }
            Blocker::BeforePhotoMissing => write!(f, "before photo is missing"),
            Blocker::AfterPhotoMissing => write!(f, "after photo is missing"),
            Blocker::BeforePhotoPresent => write!(f, "before photo already captured"),
            Blocker::AfterPhotoPresent => write!(f, "after photo already captured"),
            Blocker::ChecklistIncomplete { remaining } => {
                write!(f, "{} required checklist item(s) not done", remaining)
            }
            Blocker::PendingSync { pending } => {
                write!(f, "{} queued change(s) not synced yet", pending)
            }
            Blocker::Busy => write!(f, "another request is in progress"),
        }
    }
}

/// Result of evaluating one action's preconditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "blockers", rename_all = "snake_case")]
pub enum Gate {
    Allowed,
    Blocked(Vec<Blocker>),
}

impl Gate {
    fn from_blockers(blockers: Vec<Blocker>) -> Self {
        if blockers.is_empty() {
            Gate::Allowed
        } else {
            Gate::Blocked(blockers)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Gate::Allowed)
    }

    pub fn blockers(&self) -> &[Blocker] {
        match self {
            Gate::Allowed => &[],
            Gate::Blocked(blockers) => blockers,
        }
    }

    /// Converts the gate into a `Result` so callers can bail with `?`
    pub fn check(self) -> Result<(), Vec<Blocker>> {
        match self {
            Gate::Allowed => Ok(()),
            Gate::Blocked(blockers) => Err(blockers),
        }
    }
}

/// In-flight requests of an open job, exposed to the UI as loading flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivityFlags {
    pub submitting: bool,
    pub uploading_before: bool,
    pub uploading_after: bool,
    pub checklist_saving: BTreeSet<Uuid>,
    pub syncing: bool,
}

impl ActivityFlags {
    pub fn uploading(&self, kind: PhotoKind) -> bool {
        match kind {
            PhotoKind::Before => self.uploading_before,
            PhotoKind::After => self.uploading_after,
        }
    }

    pub fn set_uploading(&mut self, kind: PhotoKind, value: bool) {
        match kind {
            PhotoKind::Before => self.uploading_before = value,
            PhotoKind::After => self.uploading_after = value,
        }
    }
}

/// Everything the gates are derived from
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    pub status: JobStatus,
    pub connectivity: Connectivity,
    pub has_before_photo: bool,
    pub has_after_photo: bool,
    pub checklist: ChecklistSummary,
    /// Outbox entries of this job not yet delivered
    pub pending: usize,
    pub activity: &'a ActivityFlags,
}

/// One gate per worker action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionGates {
    pub check_in: Gate,
    pub capture_before: Gate,
    pub capture_after: Gate,
    pub toggle_checklist: Gate,
    pub check_out: Gate,
    pub share_report: Gate,
}

impl ActionGates {
    pub fn evaluate(inputs: GateInputs<'_>) -> Self {
        Self {
            check_in: check_in_gate(&inputs),
            capture_before: capture_gate(&inputs, PhotoKind::Before),
            capture_after: capture_gate(&inputs, PhotoKind::After),
            toggle_checklist: toggle_checklist_gate(&inputs),
            check_out: check_out_gate(&inputs),
            share_report: share_report_gate(&inputs),
        }
    }

    pub fn capture(&self, kind: PhotoKind) -> &Gate {
        match kind {
            PhotoKind::Before => &self.capture_before,
            PhotoKind::After => &self.capture_after,
        }
    }
}

fn require_status(blockers: &mut Vec<Blocker>, actual: JobStatus, expected: JobStatus) {
    if actual != expected {
        blockers.push(Blocker::WrongStatus { expected, actual });
    }
}

// Unknown counts as not online.
fn require_online(blockers: &mut Vec<Blocker>, connectivity: Connectivity) {
    match connectivity {
        Connectivity::Online => {}
        Connectivity::Offline => blockers.push(Blocker::Offline),
        Connectivity::Unknown => blockers.push(Blocker::ConnectivityUnknown),
    }
}

fn check_in_gate(inputs: &GateInputs<'_>) -> Gate {
    let mut blockers = Vec::new();
    require_status(&mut blockers, inputs.status, JobStatus::Scheduled);
    require_online(&mut blockers, inputs.connectivity);
    if inputs.activity.submitting {
        blockers.push(Blocker::Busy);
    }
    Gate::from_blockers(blockers)
}

fn capture_gate(inputs: &GateInputs<'_>, kind: PhotoKind) -> Gate {
    let mut blockers = Vec::new();
    require_status(&mut blockers, inputs.status, JobStatus::InProgress);

    match kind {
        PhotoKind::Before => {
            if inputs.has_before_photo {
                blockers.push(Blocker::BeforePhotoPresent);
            }
        }
        PhotoKind::After => {
            if !inputs.has_before_photo {
                blockers.push(Blocker::BeforePhotoMissing);
            }
            if inputs.has_after_photo {
                blockers.push(Blocker::AfterPhotoPresent);
            }
        }
    }

    if inputs.activity.uploading(kind) {
        blockers.push(Blocker::Busy);
    }
    Gate::from_blockers(blockers)
}

fn toggle_checklist_gate(inputs: &GateInputs<'_>) -> Gate {
    let mut blockers = Vec::new();
    require_status(&mut blockers, inputs.status, JobStatus::InProgress);
    Gate::from_blockers(blockers)
}

fn check_out_gate(inputs: &GateInputs<'_>) -> Gate {
    let mut blockers = Vec::new();
    require_status(&mut blockers, inputs.status, JobStatus::InProgress);
    require_online(&mut blockers, inputs.connectivity);
    if !inputs.has_before_photo {
        blockers.push(Blocker::BeforePhotoMissing);
    }
    if !inputs.has_after_photo {
        blockers.push(Blocker::AfterPhotoMissing);
    }
    if !inputs.checklist.checklist_ok() {
        blockers.push(Blocker::ChecklistIncomplete {
            remaining: inputs.checklist.remaining_required,
        });
    }
    // The backend judges photos and checklist by what it has received.
    if inputs.pending > 0 {
        blockers.push(Blocker::PendingSync {
            pending: inputs.pending,
        });
    }
    if inputs.activity.submitting {
        blockers.push(Blocker::Busy);
    }
    Gate::from_blockers(blockers)
}

fn share_report_gate(inputs: &GateInputs<'_>) -> Gate {
    let mut blockers = Vec::new();
    require_status(&mut blockers, inputs.status, JobStatus::Completed);
    require_online(&mut blockers, inputs.connectivity);
    Gate::from_blockers(blockers)
}
