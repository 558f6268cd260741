//! Temporal conflict detection between tasks on the same element.
//!
//! A task occupies the closed interval returned by
//! [`Task::effective_interval`]. Two tasks conflict when they belong to the
//! same element and their intervals overlap:
//!
//! ```text
//! new.start <= existing.end && existing.start <= new.end
//! ```
//!
//! The test is symmetric, so swapping the proposed and existing sides
//! reports the same pairs. Results are advisory; nothing here drops or
//! blocks a task.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::Task;

/// A task tagged with the element that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ElementTask<'a> {
    pub element_id: &'a str,
    pub task: &'a Task,
}

impl<'a> ElementTask<'a> {
    pub fn new(element_id: &'a str, task: &'a Task) -> Self {
        Self { element_id, task }
    }
}

/// A proposed task overlapping an existing task on the same element.
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub element_id: &'a str,
    pub proposed: &'a Task,
    pub existing: &'a Task,
}

/// Owned, serializable view of a conflict for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub element_id: String,
    pub element_name: String,
    pub proposed_task_id: String,
    pub proposed_name: String,
    pub proposed_interval: (NaiveDate, NaiveDate),
    pub existing_task_id: String,
    pub existing_name: String,
    pub existing_interval: (NaiveDate, NaiveDate),
}

impl Conflict<'_> {
    pub fn summary(&self) -> Option<ConflictSummary> {
        Some(ConflictSummary {
            element_id: self.element_id.to_string(),
            element_name: self.existing.element_name.clone(),
            proposed_task_id: self.proposed.id.clone(),
            proposed_name: self.proposed.name.clone(),
            proposed_interval: self.proposed.effective_interval()?,
            existing_task_id: self.existing.id.clone(),
            existing_name: self.existing.name.clone(),
            existing_interval: self.existing.effective_interval()?,
        })
    }
}

/// Closed-interval overlap.
pub fn intervals_overlap(a: (NaiveDate, NaiveDate), b: (NaiveDate, NaiveDate)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Report every (proposed, existing) pair that overlaps on the same element.
///
/// Tasks without a resolvable interval never conflict, and a task is never
/// reported against itself. Output follows the order of `proposed`, then of
/// `existing`.
pub fn detect_conflicts<'a>(
    proposed: &[ElementTask<'a>],
    existing: &[ElementTask<'a>],
) -> Vec<Conflict<'a>> {
    let mut by_element: HashMap<&str, Vec<(&'a Task, (NaiveDate, NaiveDate))>> = HashMap::new();
    for entry in existing {
        if let Some(interval) = entry.task.effective_interval() {
            by_element
                .entry(entry.element_id)
                .or_default()
                .push((entry.task, interval));
        }
    }

    let mut conflicts = Vec::new();
    for entry in proposed {
        let Some(interval) = entry.task.effective_interval() else {
            continue;
        };
        let Some(candidates) = by_element.get(entry.element_id) else {
            continue;
        };
        for &(task, other) in candidates {
            if task.id == entry.task.id {
                continue;
            }
            if intervals_overlap(interval, other) {
                conflicts.push(Conflict {
                    element_id: entry.element_id,
                    proposed: entry.task,
                    existing: task,
                });
            }
        }
    }

    if !conflicts.is_empty() {
        tracing::debug!(count = conflicts.len(), "Detected task conflicts");
    }
    conflicts
}
