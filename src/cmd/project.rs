//! Record setup and read-only views: `init`, `show`, `overview`.

use anyhow::{Context, Result};

use mjop::config::{MjopConfig, MjopToml};
use mjop::errors::SyncError;
use mjop::model::Severity;
use mjop::sync::{Snapshot, SyncBackend};

use super::workspace::Workspace;

pub async fn cmd_init(config: &MjopConfig) -> Result<()> {
    std::fs::create_dir_all(&config.mjop_dir)
        .with_context(|| format!("Failed to create {}", config.mjop_dir.display()))?;

    let config_path = config.config_file();
    let wrote_config = if config_path.exists() {
        false
    } else {
        MjopToml::default().save(&config_path)?;
        true
    };

    let backend = config.local_backend();
    let record_id = config.record_id();
    let created_record = match backend.fetch(&record_id).await {
        Ok(_) => false,
        Err(SyncError::RecordNotFound { .. }) => {
            backend
                .save(&record_id, &Snapshot::default(), None)
                .await
                .with_context(|| format!("Failed to create record '{}'", record_id))?;
            true
        }
        Err(e) => return Err(e).context("Existing record is unreadable"),
    };

    if wrote_config || created_record {
        println!("Initialized mjop project at {}", config.mjop_dir.display());
        println!();
        println!("  .mjop/");
        println!("  ├── mjop.toml           # sync and scheduling defaults");
        println!("  └── data/{}.json  # the record", record_id);
        println!();
        println!("Next steps:");
        println!("  1. `mjop space add <name>` and `mjop element add <name>`");
        println!("  2. `mjop schedule --name ... --date ... --element <id>`");
        println!("  3. `mjop overview` to see the yearly plan");
    } else {
        println!(
            "mjop project already initialized at {}",
            config.mjop_dir.display()
        );
    }
    Ok(())
}

pub async fn cmd_show(config: MjopConfig, json: bool) -> Result<()> {
    let ws = Workspace::open(config).await?;
    if json {
        println!("{}", ws.snapshot().to_json()?);
        return ws.close().await;
    }

    let state = ws.state();
    println!(
        "{} {}",
        console::style("Record").bold().cyan(),
        ws.config.record_id()
    );
    println!();

    println!("{}", console::style("Spaces").bold());
    if state.spaces().is_empty() {
        println!("  (none)");
    }
    for space in state.spaces() {
        println!(
            "  {}  {}  {}",
            console::style(&space.id).dim(),
            space.name,
            space.floor_designator()
        );
    }
    println!();

    println!("{}", console::style("Elements").bold());
    if state.elements().is_empty() {
        println!("  (none)");
    }
    for element in state.elements() {
        let space = state.space_name_for(element).unwrap_or("-");
        println!(
            "  {}  {}  [{}]",
            console::style(&element.id).dim(),
            element.name,
            space
        );
        let defects: Vec<String> = Severity::ALL
            .iter()
            .map(|s| (s, element.gebreken.bucket(*s).len()))
            .filter(|(_, n)| *n > 0)
            .map(|(s, n)| format!("{} {}", n, s))
            .collect();
        if !defects.is_empty() {
            println!("      defects: {}", defects.join(", "));
        }
        for task in &element.tasks {
            let due = task
                .end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "undated".to_string());
            let grouped = if task.is_grouped { " (grouped)" } else { "" };
            println!(
                "      {} {}  {}  {:.2}{}",
                console::style("•").dim(),
                due,
                task.name,
                task.cost,
                grouped
            );
        }
    }
    println!();

    println!("{}", console::style("Task groups").bold());
    if state.task_groups().is_empty() {
        println!("  (none)");
    }
    for group in state.task_groups() {
        println!(
            "  {}  {}  {}  {} element(s)  {:.2}",
            console::style(&group.id).dim(),
            group.date.map(|d| d.to_string()).unwrap_or_default(),
            group.name,
            group.subtasks.len(),
            group.total_cost()
        );
    }

    ws.close().await
}

pub async fn cmd_overview(config: MjopConfig, json: bool) -> Result<()> {
    let ws = Workspace::open(config).await?;
    let overview = ws.state().yearly_overview();

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
    } else if overview.is_empty() {
        println!("No dated tasks.");
    } else {
        println!("{:>6}  {:>6}  {:>14}", "Year", "Tasks", "Cost");
        let mut total = 0.0;
        for (year, totals) in &overview {
            println!("{:>6}  {:>6}  {:>14.2}", year, totals.tasks, totals.cost);
            total += totals.cost;
        }
        println!(
            "{}",
            console::style(format!("{:>6}  {:>6}  {:>14.2}", "Total", "", total)).bold()
        );
    }

    ws.close().await
}
