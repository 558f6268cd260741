//! Expansion of a scheduling request into task groups, offer groups and
//! tasks.
//!
//! Planning is pure: `plan` reads the request and the target elements and
//! returns a `SchedulePlan` without touching any state. The store commits a
//! plan as one transition, so a caller can run conflict detection on the
//! exact entities that will be committed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::{add_months, indexed_cost};
use super::request::{MSG_PAST_CALENDAR, ScheduleRequest};
use crate::errors::ValidationErrors;
use crate::model::{Element, OfferGroup, PlannedWork, Subtask, Task, TaskGroup, new_id, round_cents};

/// One dated occurrence of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePeriod {
    pub index: u32,
    pub date: NaiveDate,
    /// Whole years in the period's month offset from the base date; drives
    /// indexation. Counted from the offset rather than the clamped date, so
    /// a Feb 29 base indexes on the same schedule as any other date.
    pub years_elapsed: u32,
}

/// A task minted for a specific element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTask {
    pub element_id: String,
    pub task: Task,
}

/// Everything one scheduling request produces, ready to commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePlan {
    pub groups: Vec<TaskGroup>,
    pub offer_groups: Vec<OfferGroup>,
    pub tasks: Vec<PlannedTask>,
}

impl SchedulePlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_cost(&self) -> f64 {
        round_cents(self.tasks.iter().map(|t| t.task.cost).sum())
    }
}

/// Dated periods of a request: a single period at the base date for a
/// one-off request, `totalPeriods` month-stepped periods otherwise.
///
/// `None` when any period date falls outside the calendar range. Periods are
/// never dropped.
pub fn periods(request: &ScheduleRequest) -> Option<Vec<SchedulePeriod>> {
    let Some(periodicity) = &request.periodic else {
        return Some(vec![SchedulePeriod {
            index: 0,
            date: request.base_date,
            years_elapsed: 0,
        }]);
    };

    (0..periodicity.total_periods())
        .map(|index| {
            let months = index.checked_mul(periodicity.periodicity_months)?;
            Some(SchedulePeriod {
                index,
                date: add_months(request.base_date, months)?,
                years_elapsed: months / 12,
            })
        })
        .collect()
}

/// Cost applied in a period: indexed once per elapsed full year when the
/// request carries an indexation rate.
pub fn period_cost(request: &ScheduleRequest, base: f64, period: &SchedulePeriod) -> f64 {
    match request.periodic.and_then(|p| p.indexation_rate) {
        Some(rate) => indexed_cost(base, rate, period.years_elapsed),
        None => round_cents(base),
    }
}

/// Copy of the request parameters kept on each minted task.
pub fn request_echo(request: &ScheduleRequest) -> PlannedWork {
    let mut planned = PlannedWork::default();
    if let Some(p) = &request.periodic {
        planned.is_periodic = true;
        planned.periodicity_months = Some(p.periodicity_months);
        planned.total_years = Some(p.total_years);
        planned.indexation = p.indexation_rate.is_some();
        planned.indexation_rate = p.indexation_rate;
    }
    planned
}

/// Mint the subtask, offer group and task for `element` inside `group`.
pub(crate) fn mint_entry(
    group: &TaskGroup,
    element: &Element,
    cost: f64,
    description: &str,
    echo: &PlannedWork,
) -> (Subtask, OfferGroup, Task) {
    let cost = round_cents(cost);
    let task_id = new_id();
    let offer_id = new_id();

    let offer = OfferGroup {
        id: offer_id.clone(),
        group_id: Some(group.id.clone()),
        element_id: element.id.clone(),
        task_id: Some(task_id.clone()),
        name: group.name.clone(),
        estimated_value: cost,
        work_date: group.date,
        offer_accepted: false,
        invoice_price: None,
        offer_price: None,
    };

    let mut planned = echo.clone();
    planned.work_date = group.date;
    let task = Task {
        id: task_id.clone(),
        name: group.name.clone(),
        description: description.to_string(),
        end_date: group.date,
        cost,
        is_grouped: true,
        element_name: element.name.clone(),
        group_id: Some(group.id.clone()),
        offer_group_id: Some(offer_id),
        planned,
    };

    let subtask = Subtask {
        element_id: element.id.clone(),
        task_id,
        individual_cost: cost,
        end_date: group.date,
    };
    (subtask, offer, task)
}

/// Expand `request` over `elements`.
///
/// Every (period, element) pair yields its own task group, offer group and
/// task, so N elements over P periods produce N×P independent triples.
pub fn plan(request: &ScheduleRequest, elements: &[&Element]) -> Result<SchedulePlan, ValidationErrors> {
    request.validate()?;

    let mut errors = ValidationErrors::new();
    if elements.is_empty() {
        errors.add("elements", "select at least one element");
    }
    for element in elements {
        if request.cost_for(&element.id).is_none() {
            errors.add(
                &format!("individualCosts.{}", element.id),
                format!("missing cost for element '{}'", element.name),
            );
        }
    }
    let Some(periods) = periods(request) else {
        errors.add("totalYears", MSG_PAST_CALENDAR);
        return Err(errors);
    };
    errors.into_result()?;

    let echo = request_echo(request);
    let mut out = SchedulePlan::default();

    for period in &periods {
        let group_cost = period_cost(request, request.base_cost, period);
        for element in elements {
            let base = request.cost_for(&element.id).unwrap_or(request.base_cost);
            let cost = period_cost(request, base, period);

            let mut group = TaskGroup {
                id: new_id(),
                name: request.name.clone(),
                date: Some(period.date),
                base_cost: group_cost,
                assign_prices_individually: request.assigns_prices_individually(),
                subtasks: Vec::new(),
            };
            let (subtask, offer, task) =
                mint_entry(&group, element, cost, &request.description, &echo);
            group.subtasks.push(subtask);

            out.groups.push(group);
            out.offer_groups.push(offer);
            out.tasks.push(PlannedTask {
                element_id: element.id.clone(),
                task,
            });
        }
    }

    tracing::info!(
        name = %request.name,
        periods = periods.len(),
        elements = elements.len(),
        groups = out.groups.len(),
        total_cost = out.total_cost(),
        "Planned maintenance schedule"
    );
    Ok(out)
}
