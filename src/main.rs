use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mjop::config::MjopConfig;
use mjop::logging::{self, Verbosity};

mod cmd;

#[derive(Parser)]
#[command(name = "mjop")]
#[command(version, about = "Multi-year maintenance planner")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Record to operate on. Overrides MJOP_RECORD_ID and mjop.toml.
    #[arg(long, global = true)]
    pub record: Option<String>,

    /// Remote persistence endpoint. Overrides MJOP_SYNC_URL and mjop.toml.
    #[arg(long, global = true)]
    pub sync_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .mjop/ with a default mjop.toml and an empty record
    Init,
    /// Print spaces, elements, tasks and groups of the current record
    Show {
        /// Print the raw snapshot JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Add or delete elements
    Element {
        #[command(subcommand)]
        command: ElementCommands,
    },
    /// Add or delete spaces
    Space {
        #[command(subcommand)]
        command: SpaceCommands,
    },
    /// Record or clear defects on an element
    Defect {
        #[command(subcommand)]
        command: DefectCommands,
    },
    /// Plan maintenance for a set of elements and commit it
    Schedule(ScheduleArgs),
    /// Edit or delete scheduled task groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },
    /// List overlapping tasks in the committed plan
    Conflicts,
    /// Task count and cost per year
    Overview {
        #[arg(long)]
        json: bool,
    },
    /// Pull the record from the remote endpoint into the local data directory
    Fetch,
    /// Push the local record to the remote endpoint
    Push {
        /// File to upload alongside the snapshot
        #[arg(long)]
        attach: Option<PathBuf>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ElementCommands {
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Space the element belongs to
        #[arg(long)]
        space: Option<String>,
        /// Category tag; repeatable
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Acquisition date (YYYY-MM-DD)
        #[arg(long)]
        acquired: Option<String>,
        /// Expected lifetime in years
        #[arg(long)]
        lifetime: Option<u32>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum SpaceCommands {
    Add {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, conflicts_with = "all_floors")]
        floor: Option<i32>,
        #[arg(long)]
        all_floors: bool,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum DefectCommands {
    Add {
        element_id: String,
        /// ernstig, serieus or gering
        category: String,
        #[arg(required = true)]
        labels: Vec<String>,
    },
    Remove {
        element_id: String,
        category: String,
        #[arg(required = true)]
        labels: Vec<String>,
    },
}

#[derive(clap::Args, Clone)]
pub struct ScheduleArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// First due date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,
    /// Cost per task; with --individual it may be omitted
    #[arg(long, default_value = "")]
    pub cost: String,
    /// Target element; repeatable
    #[arg(long = "element")]
    pub elements: Vec<String>,
    /// Target every element carrying this category
    #[arg(long)]
    pub category: Option<String>,
    /// Per-element price as ELEMENT_ID=COST; repeatable
    #[arg(long = "individual")]
    pub individual: Vec<String>,
    /// Repeat the work every N months (default from mjop.toml)
    #[arg(long)]
    pub periodic: bool,
    #[arg(long)]
    pub every: Option<String>,
    #[arg(long)]
    pub years: Option<String>,
    /// Yearly indexation in percent (default from mjop.toml when --index)
    #[arg(long)]
    pub index: bool,
    #[arg(long)]
    pub index_rate: Option<String>,
    /// Show the plan and its conflicts without committing
    #[arg(long)]
    pub dry_run: bool,
    /// Commit even when the plan overlaps existing work
    #[arg(long)]
    pub allow_conflicts: bool,
}

#[derive(Subcommand, Clone)]
pub enum GroupCommands {
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        cost: Option<f64>,
        /// Replace the group's elements; repeatable
        #[arg(long = "element")]
        elements: Vec<String>,
        /// Per-element price as ELEMENT_ID=COST; switches to individual pricing
        #[arg(long = "individual")]
        individual: Vec<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    Show,
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet), cli.log_json);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = MjopConfig::with_cli_args(project_dir, cli.record.clone(), cli.sync_url.clone())?;
    for warning in config.validate() {
        tracing::warn!(config = %config.config_file().display(), "{}", warning);
    }

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config).await?,
        Commands::Show { json } => cmd::cmd_show(config, *json).await?,
        Commands::Element { command } => cmd::cmd_element(config, command.clone()).await?,
        Commands::Space { command } => cmd::cmd_space(config, command.clone()).await?,
        Commands::Defect { command } => cmd::cmd_defect(config, command.clone()).await?,
        Commands::Schedule(args) => cmd::cmd_schedule(config, args.clone()).await?,
        Commands::Group { command } => cmd::cmd_group(config, command.clone()).await?,
        Commands::Conflicts => cmd::cmd_conflicts(config).await?,
        Commands::Overview { json } => cmd::cmd_overview(config, *json).await?,
        Commands::Fetch => cmd::cmd_fetch(config).await?,
        Commands::Push { attach } => cmd::cmd_push(config, attach.as_deref()).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
