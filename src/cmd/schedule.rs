//! Scheduling commands: `schedule`, `group`, `conflicts`.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};

use mjop::config::MjopConfig;
use mjop::conflict::Conflict;
use mjop::model::Element;
use mjop::schedule::{self, ScheduleForm};
use mjop::store::{Action, GroupPatch, State};

use super::entity::parse_date;
use super::workspace::Workspace;
use crate::{GroupCommands, ScheduleArgs};

/// Elements named by `--element`, then those carrying `--category`. Each
/// element is selected once, in first-seen order.
fn select_targets<'a>(
    state: &'a State,
    ids: &[String],
    category: Option<&str>,
) -> Result<Vec<&'a Element>> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for id in ids {
        let element = state
            .element(id)
            .with_context(|| format!("Element {} not found", id))?;
        if seen.insert(element.id.as_str()) {
            targets.push(element);
        }
    }
    if let Some(category) = category {
        for element in state.elements() {
            if element.categories.contains(category) && seen.insert(element.id.as_str()) {
                targets.push(element);
            }
        }
    }
    Ok(targets)
}

/// Split repeated `ID=VALUE` arguments.
fn split_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(id, value)| (id.trim().to_string(), value.trim().to_string()))
                .with_context(|| format!("Expected ELEMENT_ID=COST, got '{}'", pair))
        })
        .collect()
}

fn print_conflicts(conflicts: &[Conflict<'_>]) {
    for conflict in conflicts {
        let Some(summary) = conflict.summary() else {
            continue;
        };
        println!(
            "  {} {}: '{}' {}..{} overlaps '{}' {}..{}",
            console::style("⚠").yellow(),
            summary.element_name,
            summary.proposed_name,
            summary.proposed_interval.0,
            summary.proposed_interval.1,
            summary.existing_name,
            summary.existing_interval.0,
            summary.existing_interval.1,
        );
    }
}

fn build_form(args: &ScheduleArgs, config: &MjopConfig) -> Result<ScheduleForm> {
    let defaults = &config.toml.schedule;
    let individual_costs = split_pairs(&args.individual)?;
    let indexation_rate = args
        .index_rate
        .clone()
        .or_else(|| defaults.default_indexation_rate.map(|r| r.to_string()));

    Ok(ScheduleForm {
        name: args.name.clone(),
        description: args.description.clone(),
        base_date: args.date.clone(),
        cost: args.cost.clone(),
        assign_prices_individually: !individual_costs.is_empty(),
        individual_costs,
        periodic: args.periodic || args.every.is_some() || args.years.is_some(),
        periodicity_months: args
            .every
            .clone()
            .unwrap_or_else(|| defaults.default_periodicity_months.to_string()),
        total_years: args
            .years
            .clone()
            .unwrap_or_else(|| defaults.default_total_years.to_string()),
        indexation: args.index || args.index_rate.is_some(),
        indexation_rate: indexation_rate.unwrap_or_default(),
    })
}

pub async fn cmd_schedule(config: MjopConfig, args: ScheduleArgs) -> Result<()> {
    let block_on_conflicts = config.toml.schedule.block_on_conflicts;
    let form = build_form(&args, &config)?;
    let mut ws = Workspace::open(config).await?;

    let request = form.validate()?;
    let state = ws.state();
    let targets = select_targets(&state, &args.elements, args.category.as_deref())?;

    let plan = schedule::plan(&request, &targets)?;
    let conflicts = state.conflicts_with(&plan);

    println!(
        "{} {} task(s) over {} element(s), total {:.2}",
        console::style("Plan:").bold(),
        plan.tasks.len(),
        targets.len(),
        plan.total_cost()
    );
    if !conflicts.is_empty() {
        println!(
            "{} {} overlap(s) with existing work:",
            console::style("Conflicts:").yellow().bold(),
            conflicts.len()
        );
        print_conflicts(&conflicts);
    }

    if args.dry_run {
        println!("{}", console::style("Dry run, nothing committed.").dim());
        return ws.close().await;
    }
    if !conflicts.is_empty() && block_on_conflicts && !args.allow_conflicts {
        anyhow::bail!(
            "Plan overlaps {} existing task(s); pass --allow-conflicts to commit anyway",
            conflicts.len()
        );
    }

    let conflict_count = conflicts.len();
    let outcome = ws.dispatch(Action::CommitSchedule(plan))?;
    tracing::info!(
        groups = outcome.created.len(),
        conflicts = conflict_count,
        "Schedule committed"
    );
    for id in &outcome.created {
        println!("{}", id);
    }

    ws.close().await
}

pub async fn cmd_group(config: MjopConfig, command: GroupCommands) -> Result<()> {
    let mut ws = Workspace::open(config).await?;

    match command {
        GroupCommands::Edit {
            id,
            name,
            description,
            date,
            cost,
            elements,
            individual,
        } => {
            let individual_costs = split_pairs(&individual)?
                .into_iter()
                .map(|(element_id, raw)| {
                    raw.parse::<f64>()
                        .map(|c| (element_id.clone(), c))
                        .with_context(|| format!("Cost for {} is not a number: '{}'", element_id, raw))
                })
                .collect::<Result<BTreeMap<_, _>>>()?;

            let element_ids = if elements.is_empty() {
                let state = ws.state();
                let group = state
                    .task_group(&id)
                    .with_context(|| format!("Task group {} not found", id))?;
                group.element_ids().map(str::to_string).collect()
            } else {
                elements
            };

            let patch = GroupPatch {
                name,
                description,
                date: date.as_deref().map(|d| parse_date(d, "--date")).transpose()?,
                base_cost: cost,
                assign_prices_individually: (!individual_costs.is_empty()).then_some(true),
                individual_costs,
            };
            let outcome = ws.dispatch(Action::EditTaskGroup {
                group_id: id.clone(),
                patch,
                element_ids,
            })?;
            println!(
                "Updated group {} ({} new task(s))",
                id,
                outcome.created.len()
            );
        }
        GroupCommands::Delete { id } => {
            ws.dispatch(Action::DeleteTaskGroup { group_id: id.clone() })?;
            println!("Deleted group {}", id);
        }
    }

    ws.close().await
}

pub async fn cmd_conflicts(config: MjopConfig) -> Result<()> {
    let ws = Workspace::open(config).await?;
    {
        let state = ws.state();
        let conflicts = state.internal_conflicts();
        if conflicts.is_empty() {
            println!("No overlapping tasks.");
        } else {
            println!(
                "{} overlapping task pair(s):",
                console::style(conflicts.len()).yellow().bold()
            );
            print_conflicts(&conflicts);
        }
    }
    ws.close().await
}
