//! The pure transition function.

use std::collections::HashSet;

use super::action::{Action, Changes, DefectTarget, Dispatched, StoreWarning};
use super::groups;
use super::state::State;
use crate::errors::{StoreError, ValidationErrors};
use crate::model::{DefectLedger, Element, Severity, new_id};
use crate::schedule;

/// A committed transition: the next state and what the caller needs to
/// know about it.
#[derive(Debug)]
pub struct Transition {
    pub state: State,
    pub outcome: Dispatched,
}

/// Apply `action` to a copy of `state`.
///
/// On error the copy is dropped, so a rejected action never leaves a
/// partially applied change behind.
pub fn reduce(state: &State, action: Action) -> Result<Transition, StoreError> {
    let mut next = state.clone();
    let mut outcome = Dispatched::default();

    match action {
        Action::SetSnapshot(snapshot) => {
            next.general_info = snapshot.general_info;
            next.cash_info = snapshot.cash_info;
            next.mjop = snapshot.mjop;
            next.elements = unique_ids(snapshot.global_elements, |e| &mut e.id, "element");
            next.spaces = unique_ids(snapshot.global_spaces, |s| &mut s.id, "space");
            next.documents = snapshot.global_documents;
            next.task_groups = unique_ids(snapshot.task_groups, |g| &mut g.id, "task group");
            next.offer_groups = unique_ids(snapshot.offer_groups, |o| &mut o.id, "offer group");
        }
        Action::SetElements(elements) => {
            next.elements = unique_ids(elements, |e| &mut e.id, "element");
        }
        Action::SetSpaces(spaces) => {
            next.spaces = unique_ids(spaces, |s| &mut s.id, "space");
        }
        Action::SetTaskGroups(groups) => {
            next.task_groups = unique_ids(groups, |g| &mut g.id, "task group");
        }
        Action::SetOfferGroups(offers) => {
            next.offer_groups = unique_ids(offers, |o| &mut o.id, "offer group");
        }
        Action::SetDocuments(documents) => next.documents = documents,
        Action::SetGeneralInfo(value) => next.general_info = value,
        Action::SetCashInfo(value) => next.cash_info = value,
        Action::SetMjop(value) => next.mjop = value,

        Action::AddElement(element) => {
            let id = add_element(&mut next, element, &mut outcome)?;
            outcome.created.push(id);
        }
        Action::EditElement(edited) => {
            let edited = edited.sanitized();
            check_space(&next, &edited, &mut outcome);
            let element = element_mut(&mut next, &edited.id)?;
            element.name = edited.name;
            element.description = edited.description;
            element.categories = edited.categories;
            element.space_id = edited.space_id;
            element.gebreken = edited.gebreken;
            element.inspection_reports = edited.inspection_reports;
            element.acquisition_date = edited.acquisition_date;
            element.expected_lifetime_years = edited.expected_lifetime_years;
            element.replacement_cost = edited.replacement_cost;
        }
        Action::DeleteElement { id } => {
            let before = next.elements.len();
            next.elements.retain(|e| e.id != id);
            if next.elements.len() == before {
                return Err(StoreError::ElementNotFound { id });
            }
            for group in &mut next.task_groups {
                group.subtasks.retain(|s| s.element_id != id);
            }
            next.offer_groups.retain(|o| o.element_id != id);
        }

        Action::AddSpace(mut space) => {
            if space.id.trim().is_empty() {
                space.id = new_id();
            }
            if next.spaces.iter().any(|s| s.id == space.id) {
                return Err(StoreError::DuplicateId {
                    kind: "Space",
                    id: space.id,
                });
            }
            outcome.created.push(space.id.clone());
            next.spaces.push(space);
        }
        Action::EditSpace(edited) => {
            let space = next
                .spaces
                .iter_mut()
                .find(|s| s.id == edited.id)
                .ok_or_else(|| StoreError::SpaceNotFound {
                    id: edited.id.clone(),
                })?;
            *space = edited;
        }
        Action::DeleteSpace { id } => {
            let before = next.spaces.len();
            next.spaces.retain(|s| s.id != id);
            if next.spaces.len() == before {
                return Err(StoreError::SpaceNotFound { id });
            }
            let referencing = next
                .elements
                .iter()
                .filter(|e| e.space_id.as_deref() == Some(id.as_str()))
                .count();
            if referencing > 0 {
                outcome.warnings.push(StoreWarning::SpaceStillReferenced {
                    space_id: id,
                    elements: referencing,
                });
            }
        }

        Action::AddInspectionReport {
            element_id,
            mut report,
        } => {
            if report.id.trim().is_empty() {
                report.id = new_id();
            }
            let element = element_mut(&mut next, &element_id)?;
            if element.inspection_reports.iter().any(|r| r.id == report.id) {
                return Err(StoreError::DuplicateId {
                    kind: "Inspection report",
                    id: report.id,
                });
            }
            outcome.created.push(report.id.clone());
            element.inspection_reports.push(report);
        }
        Action::EditInspectionReport { element_id, report } => {
            let element = element_mut(&mut next, &element_id)?;
            let existing = element
                .inspection_reports
                .iter_mut()
                .find(|r| r.id == report.id)
                .ok_or_else(|| StoreError::InspectionReportNotFound {
                    element_id: element_id.clone(),
                    report_id: report.id.clone(),
                })?;
            *existing = report;
        }
        Action::DeleteInspectionReport {
            element_id,
            report_id,
        } => {
            let element = element_mut(&mut next, &element_id)?;
            let before = element.inspection_reports.len();
            element.inspection_reports.retain(|r| r.id != report_id);
            if element.inspection_reports.len() == before {
                return Err(StoreError::InspectionReportNotFound {
                    element_id,
                    report_id,
                });
            }
        }

        Action::AddTask {
            element_id,
            mut task,
        } => {
            if task.id.trim().is_empty() {
                task.id = new_id();
            }
            if next.elements.iter().any(|e| e.task(&task.id).is_some()) {
                return Err(StoreError::DuplicateId {
                    kind: "Task",
                    id: task.id,
                });
            }
            task.detach();
            let element = element_mut(&mut next, &element_id)?;
            outcome.created.push(task.id.clone());
            element.tasks.push(task);
        }
        Action::EditTask { element_id, task } => {
            let element = element_mut(&mut next, &element_id)?;
            let existing =
                element
                    .task_mut(&task.id)
                    .ok_or_else(|| StoreError::TaskNotFound {
                        element_id: element_id.clone(),
                        task_id: task.id.clone(),
                    })?;
            existing.name = task.name;
            existing.description = task.description;
            existing.end_date = task.end_date;
            existing.cost = crate::model::round_cents(task.cost);
            existing.planned = task.planned;

            let (cost, end_date) = (existing.cost, existing.end_date);
            if let Some(group_id) = existing.group_id.clone()
                && let Some(subtask) = next
                    .task_groups
                    .iter_mut()
                    .find(|g| g.id == group_id)
                    .and_then(|g| g.subtasks.iter_mut().find(|s| s.task_id == task.id))
            {
                subtask.individual_cost = cost;
                subtask.end_date = end_date;
            }
        }
        Action::DeleteTask {
            element_id,
            task_id,
        } => groups::delete_task(&mut next, &element_id, &task_id)?,

        Action::AddDefect {
            target,
            category,
            label,
        } => {
            let severity: Severity = category.parse()?;
            let ledger = ledger_mut(&mut next, &target)?;
            add_defects(ledger, severity, [label], &mut outcome.warnings)?;
        }
        Action::RemoveDefect {
            target,
            category,
            label,
        } => {
            let severity: Severity = category.parse()?;
            let ledger = ledger_mut(&mut next, &target)?;
            remove_defects(ledger, severity, [label], &mut outcome.warnings);
        }
        Action::AddDefects {
            target,
            category,
            labels,
        } => {
            let severity: Severity = category.parse()?;
            let ledger = ledger_mut(&mut next, &target)?;
            add_defects(ledger, severity, labels, &mut outcome.warnings)?;
        }
        Action::RemoveDefects {
            target,
            category,
            labels,
        } => {
            let severity: Severity = category.parse()?;
            let ledger = ledger_mut(&mut next, &target)?;
            remove_defects(ledger, severity, labels, &mut outcome.warnings);
        }

        Action::SetDraft(element) => next.draft = element.sanitized(),
        Action::CommitDraft => {
            let draft = std::mem::replace(&mut next.draft, Element::new(""));
            if draft.name.trim().is_empty() {
                let mut errors = ValidationErrors::new();
                errors.add("name", "must not be empty");
                return Err(errors.into());
            }
            let mut draft = draft;
            if next.elements.iter().any(|e| e.id == draft.id) {
                draft.id = new_id();
            }
            let id = add_element(&mut next, draft, &mut outcome)?;
            outcome.created.push(id);
        }
        Action::ResetDraft => next.draft = Element::new(""),

        Action::ScheduleTasks {
            request,
            element_ids,
        } => {
            let mut seen = HashSet::new();
            let mut targets = Vec::new();
            for id in &element_ids {
                if !seen.insert(id.as_str()) {
                    continue;
                }
                let element = next
                    .elements
                    .iter()
                    .find(|e| &e.id == id)
                    .ok_or_else(|| StoreError::ElementNotFound { id: id.clone() })?;
                targets.push(element);
            }
            let plan = schedule::plan(&request, &targets)?;
            outcome.created = groups::commit_schedule(&mut next, plan)?;
        }
        Action::CommitSchedule(plan) => {
            outcome.created = groups::commit_schedule(&mut next, plan)?;
        }
        Action::EditTaskGroup {
            group_id,
            patch,
            element_ids,
        } => {
            outcome.created = groups::edit_task_group(&mut next, &group_id, patch, &element_ids)?;
        }
        Action::DeleteTaskGroup { group_id } => {
            groups::delete_task_group(&mut next, &group_id)?;
        }
        Action::EditOfferGroup(offer) => groups::edit_offer_group(&mut next, offer)?,
    }

    let next = next.finish();
    outcome.changes = diff(state, &next);
    Ok(Transition {
        state: next,
        outcome,
    })
}

fn diff(before: &State, after: &State) -> Changes {
    Changes {
        elements: before.elements != after.elements,
        spaces: before.spaces != after.spaces,
        groups: before.task_groups != after.task_groups
            || before.offer_groups != after.offer_groups,
        other: before.documents != after.documents
            || before.general_info != after.general_info
            || before.cash_info != after.cash_info
            || before.mjop != after.mjop,
    }
}

/// Mint ids for blank entries and re-mint duplicates, keeping the first
/// holder of an id.
fn unique_ids<T>(mut items: Vec<T>, id_of: impl Fn(&mut T) -> &mut String, kind: &str) -> Vec<T> {
    let mut seen = HashSet::new();
    for item in &mut items {
        let id = id_of(item);
        if id.trim().is_empty() {
            *id = new_id();
        } else if !seen.insert(id.clone()) {
            tracing::warn!(kind, id = %id, "Duplicate id replaced");
            *id = new_id();
        }
        seen.insert(id.clone());
    }
    items
}

fn add_element(state: &mut State, element: Element, outcome: &mut Dispatched) -> Result<String, StoreError> {
    let mut element = element.sanitized();
    if state.elements.iter().any(|e| e.id == element.id) {
        return Err(StoreError::DuplicateId {
            kind: "Element",
            id: element.id,
        });
    }
    // A new element starts without group links; scheduling adds them.
    for task in &mut element.tasks {
        task.detach();
    }
    check_space(state, &element, outcome);
    let id = element.id.clone();
    state.elements.push(element);
    Ok(id)
}

fn check_space(state: &State, element: &Element, outcome: &mut Dispatched) {
    if let Some(space_id) = &element.space_id
        && !state.spaces.iter().any(|s| &s.id == space_id)
    {
        outcome.warnings.push(StoreWarning::UnknownSpace {
            element_id: element.id.clone(),
            space_id: space_id.clone(),
        });
    }
}

fn element_mut<'s>(state: &'s mut State, id: &str) -> Result<&'s mut Element, StoreError> {
    state
        .elements
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| StoreError::ElementNotFound { id: id.to_string() })
}

fn ledger_mut<'s>(state: &'s mut State, target: &DefectTarget) -> Result<&'s mut DefectLedger, StoreError> {
    match target {
        DefectTarget::Draft => Ok(&mut state.draft.gebreken),
        DefectTarget::Element(id) => Ok(&mut element_mut(state, id)?.gebreken),
    }
}

fn add_defects(
    ledger: &mut DefectLedger,
    severity: Severity,
    labels: impl IntoIterator<Item = String>,
    warnings: &mut Vec<StoreWarning>,
) -> Result<(), StoreError> {
    let labels: Vec<String> = labels.into_iter().collect();
    if labels.iter().any(|l| l.trim().is_empty()) {
        let mut errors = ValidationErrors::new();
        errors.add("label", "must not be empty");
        return Err(errors.into());
    }
    for label in labels {
        if !ledger.add(severity, &label) {
            warnings.push(StoreWarning::DuplicateDefect {
                severity,
                label: label.trim().to_string(),
            });
        }
    }
    Ok(())
}

fn remove_defects(
    ledger: &mut DefectLedger,
    severity: Severity,
    labels: impl IntoIterator<Item = String>,
    warnings: &mut Vec<StoreWarning>,
) {
    for label in labels {
        if !ledger.remove(severity, &label) {
            warnings.push(StoreWarning::DefectNotPresent {
                severity,
                label: label.trim().to_string(),
            });
        }
    }
}
