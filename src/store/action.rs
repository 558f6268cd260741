use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::Value;

use crate::model::{Element, InspectionReport, OfferGroup, Severity, Space, Task, TaskGroup};
use crate::schedule::{SchedulePlan, ScheduleRequest};
use crate::sync::Snapshot;

/// Which element a defect-ledger action applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefectTarget {
    /// The in-progress element being composed before it is added.
    Draft,
    Element(String),
}

/// Changes applied to a task group by `Action::EditTaskGroup`. `None`
/// leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub base_cost: Option<f64>,
    pub assign_prices_individually: Option<bool>,
    /// Element id -> cost, consulted when prices are assigned individually.
    pub individual_costs: BTreeMap<String, f64>,
}

/// Every state transition the store accepts.
///
/// Defect categories arrive as raw strings so that an unknown category is
/// rejected by the store rather than by the caller's parser.
#[derive(Debug, Clone)]
pub enum Action {
    /// Replace every collection at once and repair links a single time, so a
    /// grouped graph survives the load. The draft element is kept.
    SetSnapshot(Snapshot),
    // Bulk replacement of one collection, sanitized on the way in. Links are
    // repaired against the rest of the current state, so tasks pointing at
    // groups that are not loaded yet are detached.
    SetElements(Vec<Element>),
    SetSpaces(Vec<Space>),
    SetTaskGroups(Vec<TaskGroup>),
    SetOfferGroups(Vec<OfferGroup>),
    SetDocuments(Vec<Value>),
    SetGeneralInfo(Value),
    SetCashInfo(Value),
    SetMjop(Value),

    AddElement(Element),
    /// Replaces the element's descriptive fields, ledger and reports. Tasks
    /// are kept; they change through the task and scheduling actions.
    EditElement(Element),
    DeleteElement {
        id: String,
    },

    AddSpace(Space),
    EditSpace(Space),
    DeleteSpace {
        id: String,
    },

    AddInspectionReport {
        element_id: String,
        report: InspectionReport,
    },
    EditInspectionReport {
        element_id: String,
        report: InspectionReport,
    },
    DeleteInspectionReport {
        element_id: String,
        report_id: String,
    },

    /// Adds a standalone task; any group links on it are dropped.
    AddTask {
        element_id: String,
        task: Task,
    },
    EditTask {
        element_id: String,
        task: Task,
    },
    DeleteTask {
        element_id: String,
        task_id: String,
    },

    AddDefect {
        target: DefectTarget,
        category: String,
        label: String,
    },
    RemoveDefect {
        target: DefectTarget,
        category: String,
        label: String,
    },
    AddDefects {
        target: DefectTarget,
        category: String,
        labels: Vec<String>,
    },
    RemoveDefects {
        target: DefectTarget,
        category: String,
        labels: Vec<String>,
    },

    SetDraft(Element),
    /// Adds the draft as a new element and starts a fresh draft.
    CommitDraft,
    ResetDraft,

    /// Plan and commit in one step.
    ScheduleTasks {
        request: ScheduleRequest,
        element_ids: Vec<String>,
    },
    /// Commit a plan produced earlier by `schedule::plan`, typically after
    /// the caller has reviewed its conflicts.
    CommitSchedule(SchedulePlan),
    EditTaskGroup {
        group_id: String,
        patch: GroupPatch,
        element_ids: Vec<String>,
    },
    DeleteTaskGroup {
        group_id: String,
    },
    /// Updates the commercial fields of an offer group. Links are kept.
    EditOfferGroup(OfferGroup),
}

impl Action {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetSnapshot(_) => "set_snapshot",
            Self::SetElements(_) => "set_elements",
            Self::SetSpaces(_) => "set_spaces",
            Self::SetTaskGroups(_) => "set_task_groups",
            Self::SetOfferGroups(_) => "set_offer_groups",
            Self::SetDocuments(_) => "set_documents",
            Self::SetGeneralInfo(_) => "set_general_info",
            Self::SetCashInfo(_) => "set_cash_info",
            Self::SetMjop(_) => "set_mjop",
            Self::AddElement(_) => "add_element",
            Self::EditElement(_) => "edit_element",
            Self::DeleteElement { .. } => "delete_element",
            Self::AddSpace(_) => "add_space",
            Self::EditSpace(_) => "edit_space",
            Self::DeleteSpace { .. } => "delete_space",
            Self::AddInspectionReport { .. } => "add_inspection_report",
            Self::EditInspectionReport { .. } => "edit_inspection_report",
            Self::DeleteInspectionReport { .. } => "delete_inspection_report",
            Self::AddTask { .. } => "add_task",
            Self::EditTask { .. } => "edit_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::AddDefect { .. } => "add_defect",
            Self::RemoveDefect { .. } => "remove_defect",
            Self::AddDefects { .. } => "add_defects",
            Self::RemoveDefects { .. } => "remove_defects",
            Self::SetDraft(_) => "set_draft",
            Self::CommitDraft => "commit_draft",
            Self::ResetDraft => "reset_draft",
            Self::ScheduleTasks { .. } => "schedule_tasks",
            Self::CommitSchedule(_) => "commit_schedule",
            Self::EditTaskGroup { .. } => "edit_task_group",
            Self::DeleteTaskGroup { .. } => "delete_task_group",
            Self::EditOfferGroup(_) => "edit_offer_group",
        }
    }
}

/// Non-fatal outcomes the caller must be able to tell apart from success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWarning {
    DuplicateDefect { severity: Severity, label: String },
    DefectNotPresent { severity: Severity, label: String },
    /// The deleted space is still referenced; those elements now show an
    /// unknown space.
    SpaceStillReferenced { space_id: String, elements: usize },
    UnknownSpace { element_id: String, space_id: String },
}

impl std::fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateDefect { severity, label } => {
                write!(f, "Defect '{}' is already listed as {}", label, severity)
            }
            Self::DefectNotPresent { severity, label } => {
                write!(f, "Defect '{}' is not listed as {}", label, severity)
            }
            Self::SpaceStillReferenced { space_id, elements } => write!(
                f,
                "Space {} is still referenced by {} element(s)",
                space_id, elements
            ),
            Self::UnknownSpace {
                element_id,
                space_id,
            } => write!(
                f,
                "Element {} refers to unknown space {}",
                element_id, space_id
            ),
        }
    }
}

/// Which persisted collections a transition changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub elements: bool,
    pub spaces: bool,
    pub groups: bool,
    pub other: bool,
}

impl Changes {
    /// Whether the snapshot differs and a save should be requested.
    pub fn needs_save(&self) -> bool {
        self.elements || self.spaces || self.groups || self.other
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone, Default)]
pub struct Dispatched {
    pub warnings: Vec<StoreWarning>,
    /// Ids minted by the action (new element, new task groups, ...).
    pub created: Vec<String>,
    pub changes: Changes,
}
