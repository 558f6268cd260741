//! The entity graph held by the store, with its derived lookup index and
//! read-side queries.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Datelike;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::conflict::{Conflict, ElementTask, detect_conflicts, intervals_overlap};
use crate::errors::StoreError;
use crate::model::{Element, OfferGroup, Space, Task, TaskGroup, UNKNOWN_SPACE, round_cents};
use crate::schedule::SchedulePlan;

pub(crate) fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Id to position lookups, rebuilt whenever a new state is committed.
#[derive(Debug, Clone, Default)]
struct GraphIndex {
    elements: HashMap<String, usize>,
    spaces: HashMap<String, usize>,
    /// Task id -> (element position, task position).
    tasks: HashMap<String, (usize, usize)>,
    groups: HashMap<String, usize>,
    offers: HashMap<String, usize>,
}

impl GraphIndex {
    fn build(state: &State) -> Self {
        let mut index = Self::default();
        for (pos, element) in state.elements.iter().enumerate() {
            index.elements.entry(element.id.clone()).or_insert(pos);
            for (tpos, task) in element.tasks.iter().enumerate() {
                index.tasks.entry(task.id.clone()).or_insert((pos, tpos));
            }
        }
        for (pos, space) in state.spaces.iter().enumerate() {
            index.spaces.entry(space.id.clone()).or_insert(pos);
        }
        for (pos, group) in state.task_groups.iter().enumerate() {
            index.groups.entry(group.id.clone()).or_insert(pos);
        }
        for (pos, offer) in state.offer_groups.iter().enumerate() {
            index.offers.entry(offer.id.clone()).or_insert(pos);
        }
        index
    }
}

/// A broken reference in the entity graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    TaskMissingGroup {
        element_id: String,
        task_id: String,
        group_id: String,
    },
    /// The group exists but has no subtask for the task's element.
    TaskNotInGroup {
        element_id: String,
        task_id: String,
        group_id: String,
    },
    TaskMissingOfferGroup {
        element_id: String,
        task_id: String,
        offer_group_id: String,
    },
    SubtaskMissingElement {
        group_id: String,
        element_id: String,
    },
    /// The subtask names a task that is gone or no longer points back at
    /// the group.
    SubtaskMissingTask {
        group_id: String,
        element_id: String,
        task_id: String,
    },
    OfferMissingGroup {
        offer_group_id: String,
        group_id: String,
    },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskMissingGroup {
                element_id,
                task_id,
                group_id,
            } => write!(
                f,
                "task {} on element {} refers to missing group {}",
                task_id, element_id, group_id
            ),
            Self::TaskNotInGroup {
                element_id,
                task_id,
                group_id,
            } => write!(
                f,
                "task {} on element {} is not part of group {}",
                task_id, element_id, group_id
            ),
            Self::TaskMissingOfferGroup {
                element_id,
                task_id,
                offer_group_id,
            } => write!(
                f,
                "task {} on element {} refers to missing offer group {}",
                task_id, element_id, offer_group_id
            ),
            Self::SubtaskMissingElement {
                group_id,
                element_id,
            } => write!(
                f,
                "group {} has a subtask for missing element {}",
                group_id, element_id
            ),
            Self::SubtaskMissingTask {
                group_id,
                element_id,
                task_id,
            } => write!(
                f,
                "group {} has a subtask for unlinked task {} on element {}",
                group_id, task_id, element_id
            ),
            Self::OfferMissingGroup {
                offer_group_id,
                group_id,
            } => write!(
                f,
                "offer group {} refers to missing group {}",
                offer_group_id, group_id
            ),
        }
    }
}

/// Task count and cost for one calendar year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearTotals {
    pub tasks: usize,
    pub cost: f64,
}

/// The full entity graph. Only the store's reducer produces new values.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) general_info: Value,
    pub(crate) cash_info: Value,
    pub(crate) mjop: Value,
    pub(crate) elements: Vec<Element>,
    pub(crate) spaces: Vec<Space>,
    pub(crate) documents: Vec<Value>,
    pub(crate) task_groups: Vec<TaskGroup>,
    pub(crate) offer_groups: Vec<OfferGroup>,
    pub(crate) draft: Element,
    index: GraphIndex,
}

impl Default for State {
    fn default() -> Self {
        Self {
            general_info: empty_object(),
            cash_info: empty_object(),
            mjop: empty_object(),
            elements: Vec::new(),
            spaces: Vec::new(),
            documents: Vec::new(),
            task_groups: Vec::new(),
            offer_groups: Vec::new(),
            draft: Element::new(""),
            index: GraphIndex::default(),
        }
    }
}

impl State {
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    pub fn task_groups(&self) -> &[TaskGroup] {
        &self.task_groups
    }

    pub fn offer_groups(&self) -> &[OfferGroup] {
        &self.offer_groups
    }

    /// The element being composed before `CommitDraft`. Not persisted.
    pub fn draft(&self) -> &Element {
        &self.draft
    }

    pub fn general_info(&self) -> &Value {
        &self.general_info
    }

    pub fn cash_info(&self) -> &Value {
        &self.cash_info
    }

    pub fn mjop(&self) -> &Value {
        &self.mjop
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.index.elements.get(id).map(|&pos| &self.elements[pos])
    }

    pub fn space(&self, id: &str) -> Option<&Space> {
        self.index.spaces.get(id).map(|&pos| &self.spaces[pos])
    }

    pub fn task_group(&self, id: &str) -> Option<&TaskGroup> {
        self.index.groups.get(id).map(|&pos| &self.task_groups[pos])
    }

    pub fn offer_group(&self, id: &str) -> Option<&OfferGroup> {
        self.index.offers.get(id).map(|&pos| &self.offer_groups[pos])
    }

    /// A task and the element that owns it.
    pub fn task(&self, task_id: &str) -> Option<(&Element, &Task)> {
        let &(epos, tpos) = self.index.tasks.get(task_id)?;
        let element = &self.elements[epos];
        Some((element, &element.tasks[tpos]))
    }

    /// Display name of the element's space. `None` when the element has no
    /// space; [`UNKNOWN_SPACE`] when the reference dangles.
    pub fn space_name_for(&self, element: &Element) -> Option<&str> {
        let space_id = element.space_id.as_deref()?;
        Some(
            self.space(space_id)
                .map(|s| s.name.as_str())
                .unwrap_or(UNKNOWN_SPACE),
        )
    }

    /// Committed tasks on the given elements, tagged for conflict detection.
    pub fn existing_tasks_for(&self, element_ids: &[&str]) -> Vec<ElementTask<'_>> {
        let mut seen = HashSet::new();
        element_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.element(id))
            .flat_map(|element| {
                element
                    .tasks
                    .iter()
                    .map(move |task| ElementTask::new(&element.id, task))
            })
            .collect()
    }

    /// Conflicts between a plan's proposed tasks and committed work.
    pub fn conflicts_with<'a>(&'a self, plan: &'a SchedulePlan) -> Vec<Conflict<'a>> {
        let proposed: Vec<ElementTask<'a>> = plan
            .tasks
            .iter()
            .map(|p| ElementTask::new(&p.element_id, &p.task))
            .collect();
        let element_ids: Vec<&str> = plan.tasks.iter().map(|p| p.element_id.as_str()).collect();
        let existing = self.existing_tasks_for(&element_ids);
        detect_conflicts(&proposed, &existing)
    }

    /// Overlaps among committed tasks, each unordered pair reported once.
    pub fn internal_conflicts(&self) -> Vec<Conflict<'_>> {
        let mut conflicts = Vec::new();
        for element in &self.elements {
            let dated: Vec<_> = element
                .tasks
                .iter()
                .filter_map(|t| t.effective_interval().map(|i| (t, i)))
                .collect();
            for (i, &(a, ai)) in dated.iter().enumerate() {
                for &(b, bi) in &dated[i + 1..] {
                    if a.id != b.id && intervals_overlap(ai, bi) {
                        conflicts.push(Conflict {
                            element_id: &element.id,
                            proposed: a,
                            existing: b,
                        });
                    }
                }
            }
        }
        conflicts
    }

    /// Task count and cost per year of the nominal due date. Undated tasks
    /// are left out.
    pub fn yearly_overview(&self) -> BTreeMap<i32, YearTotals> {
        let mut years: BTreeMap<i32, YearTotals> = BTreeMap::new();
        for task in self.elements.iter().flat_map(|e| &e.tasks) {
            let Some(date) = task.end_date else {
                continue;
            };
            let totals = years.entry(date.year()).or_default();
            totals.tasks += 1;
            totals.cost = round_cents(totals.cost + task.cost);
        }
        years
    }

    /// Every broken reference in the graph. Empty for any state the store
    /// has committed.
    pub fn integrity_violations(&self) -> Vec<IntegrityViolation> {
        let groups: HashMap<&str, &TaskGroup> = self
            .task_groups
            .iter()
            .map(|g| (g.id.as_str(), g))
            .collect();
        let offers: HashSet<&str> = self.offer_groups.iter().map(|o| o.id.as_str()).collect();
        let mut violations = Vec::new();

        for element in &self.elements {
            for task in &element.tasks {
                if let Some(group_id) = &task.group_id {
                    match groups.get(group_id.as_str()) {
                        None => violations.push(IntegrityViolation::TaskMissingGroup {
                            element_id: element.id.clone(),
                            task_id: task.id.clone(),
                            group_id: group_id.clone(),
                        }),
                        Some(group) if group.subtask_for(&element.id).is_none() => {
                            violations.push(IntegrityViolation::TaskNotInGroup {
                                element_id: element.id.clone(),
                                task_id: task.id.clone(),
                                group_id: group_id.clone(),
                            })
                        }
                        Some(_) => {}
                    }
                }
                if let Some(offer_id) = &task.offer_group_id
                    && !offers.contains(offer_id.as_str())
                {
                    violations.push(IntegrityViolation::TaskMissingOfferGroup {
                        element_id: element.id.clone(),
                        task_id: task.id.clone(),
                        offer_group_id: offer_id.clone(),
                    });
                }
            }
        }

        for group in &self.task_groups {
            for subtask in &group.subtasks {
                let Some(element) = self.elements.iter().find(|e| e.id == subtask.element_id)
                else {
                    violations.push(IntegrityViolation::SubtaskMissingElement {
                        group_id: group.id.clone(),
                        element_id: subtask.element_id.clone(),
                    });
                    continue;
                };
                if !subtask_linked(group, subtask.task_id.as_str(), element) {
                    violations.push(IntegrityViolation::SubtaskMissingTask {
                        group_id: group.id.clone(),
                        element_id: subtask.element_id.clone(),
                        task_id: subtask.task_id.clone(),
                    });
                }
            }
        }

        for offer in &self.offer_groups {
            if let Some(group_id) = &offer.group_id
                && !groups.contains_key(group_id.as_str())
            {
                violations.push(IntegrityViolation::OfferMissingGroup {
                    offer_group_id: offer.id.clone(),
                    group_id: group_id.clone(),
                });
            }
        }
        violations
    }

    /// Clear a task's group and offer links. Its subtask entry and offer
    /// group are removed; the task itself stays on the element.
    pub(crate) fn detach_task(&mut self, element_id: &str, task_id: &str) -> Result<(), StoreError> {
        let task = self
            .elements
            .iter_mut()
            .find(|e| e.id == element_id)
            .ok_or_else(|| StoreError::ElementNotFound {
                id: element_id.to_string(),
            })?
            .task_mut(task_id)
            .ok_or_else(|| StoreError::TaskNotFound {
                element_id: element_id.to_string(),
                task_id: task_id.to_string(),
            })?;

        let group_id = task.group_id.clone();
        let offer_id = task.offer_group_id.clone();
        task.detach();

        if let Some(group_id) = group_id
            && let Some(group) = self.task_groups.iter_mut().find(|g| g.id == group_id)
        {
            group
                .subtasks
                .retain(|s| !(s.element_id == element_id && s.task_id == task_id));
        }
        if let Some(offer_id) = offer_id {
            self.offer_groups.retain(|o| o.id != offer_id);
        }
        tracing::debug!(element_id, task_id, "Detached task from its group");
        Ok(())
    }

    /// Bring the graph back to a consistent shape: drop dangling subtasks
    /// and empty groups, detach tasks whose group no longer includes them,
    /// and clear dangling offer links.
    pub(crate) fn repair_links(&mut self) {
        let mut repaired = 0usize;

        let elements = &self.elements;
        for group in &mut self.task_groups {
            let before = group.subtasks.len();
            let group_id = group.id.clone();
            group.subtasks.retain(|s| {
                elements
                    .iter()
                    .find(|e| e.id == s.element_id)
                    .is_some_and(|e| subtask_linked_by_id(&group_id, &s.task_id, e))
            });
            repaired += before - group.subtasks.len();
        }
        let before = self.task_groups.len();
        self.task_groups.retain(|g| !g.subtasks.is_empty());
        repaired += before - self.task_groups.len();

        let members: HashMap<&str, HashSet<&str>> = self
            .task_groups
            .iter()
            .map(|g| (g.id.as_str(), g.element_ids().collect()))
            .collect();
        let offers: HashSet<&str> = self.offer_groups.iter().map(|o| o.id.as_str()).collect();

        for element in &mut self.elements {
            for task in &mut element.tasks {
                if let Some(group_id) = &task.group_id {
                    let included = members
                        .get(group_id.as_str())
                        .is_some_and(|m| m.contains(element.id.as_str()));
                    if !included {
                        task.detach();
                        repaired += 1;
                        continue;
                    }
                }
                if task
                    .offer_group_id
                    .as_deref()
                    .is_some_and(|o| !offers.contains(o))
                {
                    task.offer_group_id = None;
                    repaired += 1;
                }
            }
        }

        for offer in &mut self.offer_groups {
            if offer
                .group_id
                .as_deref()
                .is_some_and(|g| !members.contains_key(g))
            {
                offer.group_id = None;
                repaired += 1;
            }
        }

        if repaired > 0 {
            tracing::debug!(repaired, "Repaired dangling references");
        }
    }

    /// Sanitize every element, repair links and rebuild the index.
    pub(crate) fn finish(mut self) -> Self {
        self.elements = std::mem::take(&mut self.elements)
            .into_iter()
            .map(Element::sanitized)
            .collect();
        self.repair_links();
        self.index = GraphIndex::build(&self);
        self
    }
}

fn subtask_linked(group: &TaskGroup, task_id: &str, element: &Element) -> bool {
    subtask_linked_by_id(&group.id, task_id, element)
}

/// Subtasks from older data may carry no task id; those only need their
/// element.
fn subtask_linked_by_id(group_id: &str, task_id: &str, element: &Element) -> bool {
    task_id.is_empty()
        || element
            .task(task_id)
            .is_some_and(|t| t.group_id.as_deref() == Some(group_id))
}
