//! Element, space and defect edits.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use mjop::config::MjopConfig;
use mjop::model::lenient::DATE_FORMAT;
use mjop::model::{Element, FloorDesignator, Space};
use mjop::store::{Action, DefectTarget};

use super::workspace::Workspace;
use crate::{DefectCommands, ElementCommands, SpaceCommands};

pub(crate) fn parse_date(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .with_context(|| format!("{} must be a date in YYYY-MM-DD form, got '{}'", flag, raw))
}

pub async fn cmd_element(config: MjopConfig, command: ElementCommands) -> Result<()> {
    let mut ws = Workspace::open(config).await?;

    match command {
        ElementCommands::Add {
            name,
            description,
            space,
            categories,
            acquired,
            lifetime,
        } => {
            let mut element = Element::new(&name);
            element.description = description;
            element.space_id = space;
            element.categories.extend(categories);
            element.acquisition_date = acquired
                .as_deref()
                .map(|raw| parse_date(raw, "--acquired"))
                .transpose()?;
            element.expected_lifetime_years = lifetime;

            let outcome = ws.dispatch(Action::AddElement(element))?;
            for id in &outcome.created {
                println!("{}", id);
            }
        }
        ElementCommands::Delete { id } => {
            ws.dispatch(Action::DeleteElement { id: id.clone() })?;
            println!("Deleted element {}", id);
        }
    }

    ws.close().await
}

pub async fn cmd_space(config: MjopConfig, command: SpaceCommands) -> Result<()> {
    let mut ws = Workspace::open(config).await?;

    match command {
        SpaceCommands::Add {
            name,
            description,
            floor,
            all_floors,
        } => {
            let designator = match (all_floors, floor) {
                (true, _) => FloorDesignator::AllFloors,
                (false, Some(n)) => FloorDesignator::Floor(n),
                (false, None) => FloorDesignator::Unspecified,
            };
            let space = Space::new(&name, &description).with_floor(designator);
            let outcome = ws.dispatch(Action::AddSpace(space))?;
            for id in &outcome.created {
                println!("{}", id);
            }
        }
        SpaceCommands::Delete { id } => {
            ws.dispatch(Action::DeleteSpace { id: id.clone() })?;
            println!("Deleted space {}", id);
        }
    }

    ws.close().await
}

pub async fn cmd_defect(config: MjopConfig, command: DefectCommands) -> Result<()> {
    let mut ws = Workspace::open(config).await?;

    match command {
        DefectCommands::Add {
            element_id,
            category,
            labels,
        } => {
            let count = labels.len();
            ws.dispatch(Action::AddDefects {
                target: DefectTarget::Element(element_id.clone()),
                category: category.clone(),
                labels,
            })?;
            tracing::info!(element_id = %element_id, category = %category, count, "Defects recorded");
        }
        DefectCommands::Remove {
            element_id,
            category,
            labels,
        } => {
            ws.dispatch(Action::RemoveDefects {
                target: DefectTarget::Element(element_id),
                category,
                labels,
            })?;
        }
    }

    ws.close().await
}
