//! Transitions that touch task groups and offer groups alongside element
//! tasks. All functions mutate a working copy of the state; the reducer
//! discards it on error.

use std::collections::{BTreeMap, BTreeSet};

use super::action::GroupPatch;
use super::state::State;
use crate::errors::{StoreError, ValidationErrors};
use crate::model::{OfferGroup, PlannedWork, Task, round_cents};
use crate::schedule::{SchedulePlan, mint_entry};

/// Add a plan's groups, offers and tasks. Returns the new group ids.
pub(crate) fn commit_schedule(state: &mut State, plan: SchedulePlan) -> Result<Vec<String>, StoreError> {
    for planned in &plan.tasks {
        if !state.elements.iter().any(|e| e.id == planned.element_id) {
            return Err(StoreError::ElementNotFound {
                id: planned.element_id.clone(),
            });
        }
    }
    for group in &plan.groups {
        if state.task_groups.iter().any(|g| g.id == group.id) {
            return Err(StoreError::DuplicateId {
                kind: "Task group",
                id: group.id.clone(),
            });
        }
    }

    let created: Vec<String> = plan.groups.iter().map(|g| g.id.clone()).collect();
    state.task_groups.extend(plan.groups);
    state.offer_groups.extend(plan.offer_groups);
    for planned in plan.tasks {
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == planned.element_id) {
            element.tasks.push(planned.task);
        }
    }
    Ok(created)
}

/// Remove a group, its offers and the group links of every task it
/// produced. The tasks themselves stay. Returns how many were detached.
pub(crate) fn delete_task_group(state: &mut State, group_id: &str) -> Result<usize, StoreError> {
    if !state.task_groups.iter().any(|g| g.id == group_id) {
        return Err(StoreError::TaskGroupNotFound {
            id: group_id.to_string(),
        });
    }

    let linked: Vec<(String, String)> = state
        .elements
        .iter()
        .flat_map(|e| {
            e.tasks
                .iter()
                .filter(|t| t.group_id.as_deref() == Some(group_id))
                .map(move |t| (e.id.clone(), t.id.clone()))
        })
        .collect();
    for (element_id, task_id) in &linked {
        state.detach_task(element_id, task_id)?;
    }

    state.task_groups.retain(|g| g.id != group_id);
    state
        .offer_groups
        .retain(|o| o.group_id.as_deref() != Some(group_id));
    Ok(linked.len())
}

/// Re-resolve a group against a new element selection and apply `patch`.
///
/// Added elements get a fresh task and offer group; removed elements lose
/// their offer group and their task is detached; retained elements have
/// their task and offer updated. Returns the ids of newly minted tasks.
pub(crate) fn edit_task_group(
    state: &mut State,
    group_id: &str,
    patch: GroupPatch,
    element_ids: &[String],
) -> Result<Vec<String>, StoreError> {
    let pos = state
        .task_groups
        .iter()
        .position(|g| g.id == group_id)
        .ok_or_else(|| StoreError::TaskGroupNotFound {
            id: group_id.to_string(),
        })?;

    let selected: BTreeSet<&str> = element_ids.iter().map(String::as_str).collect();
    for id in &selected {
        if !state.elements.iter().any(|e| e.id == *id) {
            return Err(StoreError::ElementNotFound { id: id.to_string() });
        }
    }

    let mut group = state.task_groups[pos].clone();
    if let Some(name) = &patch.name {
        group.name = name.trim().to_string();
    }
    if let Some(date) = patch.date {
        group.date = Some(date);
    }
    if let Some(cost) = patch.base_cost {
        group.base_cost = round_cents(cost);
    }
    if let Some(individually) = patch.assign_prices_individually {
        group.assign_prices_individually = individually;
    }

    let costs = resolve_costs(&group, &patch, &selected)?;
    let description = patch
        .description
        .clone()
        .or_else(|| first_task_of(state, &group.id).map(|t| t.description.clone()))
        .unwrap_or_default();
    let echo = first_task_of(state, &group.id)
        .map(|t| t.planned.clone())
        .unwrap_or_default();

    let current: BTreeSet<String> = group.element_ids().map(str::to_string).collect();

    // Removed elements.
    for element_id in current.iter().filter(|id| !selected.contains(id.as_str())) {
        let task_ids: Vec<String> = group
            .subtasks
            .iter()
            .filter(|s| &s.element_id == element_id && !s.task_id.is_empty())
            .map(|s| s.task_id.clone())
            .collect();
        for task_id in &task_ids {
            if state
                .elements
                .iter()
                .any(|e| &e.id == element_id && e.task(task_id).is_some())
            {
                state.detach_task(element_id, task_id)?;
            }
        }
        state.offer_groups.retain(|o| {
            !(o.group_id.as_deref() == Some(group_id) && &o.element_id == element_id)
        });
        group.subtasks.retain(|s| &s.element_id != element_id);
    }

    // Retained elements.
    for subtask in group
        .subtasks
        .iter_mut()
        .filter(|s| selected.contains(s.element_id.as_str()))
    {
        let cost = costs.get(subtask.element_id.as_str()).copied().unwrap_or(0.0);
        subtask.individual_cost = cost;
        subtask.end_date = group.date;

        let task_id = subtask.task_id.clone();
        if let Some(task) = state
            .elements
            .iter_mut()
            .find(|e| e.id == subtask.element_id)
            .and_then(|e| e.task_mut(&task_id))
        {
            apply_to_task(task, &group.name, group.date, cost, patch.description.as_deref());
        }
        for offer in state.offer_groups.iter_mut().filter(|o| {
            o.group_id.as_deref() == Some(group_id) && o.element_id == subtask.element_id
        }) {
            apply_to_offer(offer, &group.name, group.date, cost);
        }
    }

    // Added elements.
    let mut created = Vec::new();
    for element_id in selected.iter().filter(|id| !current.contains(**id)) {
        let cost = costs.get(*element_id).copied().unwrap_or(group.base_cost);
        let Some(element) = state.elements.iter().find(|e| e.id == *element_id) else {
            continue;
        };
        let (subtask, offer, task) = mint_entry(&group, element, cost, &description, &echo_of(&echo));
        created.push(task.id.clone());
        group.subtasks.push(subtask);
        state.offer_groups.push(offer);
        if let Some(element) = state.elements.iter_mut().find(|e| e.id == *element_id) {
            element.tasks.push(task);
        }
    }

    tracing::info!(
        group_id,
        elements = group.subtasks.len(),
        added = created.len(),
        "Edited task group"
    );
    state.task_groups[pos] = group;
    Ok(created)
}

/// Update an offer group's commercial fields and echo acceptance into its
/// task.
pub(crate) fn edit_offer_group(state: &mut State, edited: OfferGroup) -> Result<(), StoreError> {
    let offer = state
        .offer_groups
        .iter_mut()
        .find(|o| o.id == edited.id)
        .ok_or_else(|| StoreError::OfferGroupNotFound {
            id: edited.id.clone(),
        })?;

    offer.name = edited.name;
    offer.estimated_value = round_cents(edited.estimated_value);
    offer.work_date = edited.work_date;
    offer.offer_accepted = edited.offer_accepted;
    offer.invoice_price = edited.invoice_price.map(round_cents);
    offer.offer_price = edited.offer_price.map(round_cents);

    let accepted = offer.offer_accepted;
    let element_id = offer.element_id.clone();
    let Some(task_id) = offer.task_id.clone() else {
        return Ok(());
    };
    if let Some(task) = state
        .elements
        .iter_mut()
        .find(|e| e.id == element_id)
        .and_then(|e| e.task_mut(&task_id))
    {
        task.planned.offer_accepted = accepted;
    }
    Ok(())
}

/// Remove a task. A grouped task takes its subtask entry and offer group
/// with it; a group left empty is removed.
pub(crate) fn delete_task(state: &mut State, element_id: &str, task_id: &str) -> Result<(), StoreError> {
    let group_id = state
        .elements
        .iter()
        .find(|e| e.id == element_id)
        .ok_or_else(|| StoreError::ElementNotFound {
            id: element_id.to_string(),
        })?
        .task(task_id)
        .ok_or_else(|| StoreError::TaskNotFound {
            element_id: element_id.to_string(),
            task_id: task_id.to_string(),
        })?
        .group_id
        .clone();

    if group_id.is_some() {
        state.detach_task(element_id, task_id)?;
    }
    if let Some(element) = state.elements.iter_mut().find(|e| e.id == element_id) {
        element.tasks.retain(|t| t.id != task_id);
    }
    if let Some(group_id) = group_id {
        state
            .task_groups
            .retain(|g| g.id != group_id || !g.subtasks.is_empty());
    }
    Ok(())
}

fn resolve_costs<'a>(
    group: &crate::model::TaskGroup,
    patch: &GroupPatch,
    selected: &BTreeSet<&'a str>,
) -> Result<BTreeMap<&'a str, f64>, StoreError> {
    let mut errors = ValidationErrors::new();
    if selected.is_empty() {
        errors.add("elements", "select at least one element");
    }
    if group.name.is_empty() {
        errors.add("name", "must not be empty");
    }
    if group.base_cost < 0.0 || !group.base_cost.is_finite() {
        errors.add("cost", "must be a non-negative number");
    }

    let mut costs = BTreeMap::new();
    for &id in selected {
        let cost = if group.assign_prices_individually {
            patch
                .individual_costs
                .get(id)
                .copied()
                .or_else(|| group.subtask_for(id).map(|s| s.individual_cost))
        } else {
            Some(group.base_cost)
        };
        match cost {
            Some(c) if c >= 0.0 && c.is_finite() => {
                costs.insert(id, round_cents(c));
            }
            Some(_) => errors.add(
                &format!("individualCosts.{}", id),
                "must be a non-negative number",
            ),
            None => errors.add(&format!("individualCosts.{}", id), "missing cost"),
        }
    }
    errors.into_result()?;
    Ok(costs)
}

fn first_task_of<'s>(state: &'s State, group_id: &str) -> Option<&'s Task> {
    state
        .elements
        .iter()
        .flat_map(|e| &e.tasks)
        .find(|t| t.group_id.as_deref() == Some(group_id))
}

/// Recurrence echo for a task minted into an existing group.
fn echo_of(planned: &PlannedWork) -> PlannedWork {
    PlannedWork {
        is_periodic: planned.is_periodic,
        periodicity_months: planned.periodicity_months,
        total_years: planned.total_years,
        indexation: planned.indexation,
        indexation_rate: planned.indexation_rate,
        ..Default::default()
    }
}

fn apply_to_task(
    task: &mut Task,
    name: &str,
    date: Option<chrono::NaiveDate>,
    cost: f64,
    description: Option<&str>,
) {
    task.name = name.to_string();
    task.end_date = date;
    task.cost = cost;
    task.planned.work_date = date;
    if let Some(description) = description {
        task.description = description.to_string();
    }
}

fn apply_to_offer(offer: &mut OfferGroup, name: &str, date: Option<chrono::NaiveDate>, cost: f64) {
    offer.name = name.to_string();
    offer.work_date = date;
    offer.estimated_value = cost;
}
