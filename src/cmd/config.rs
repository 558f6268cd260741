//! Configuration view and validation: `mjop config`.

use anyhow::Result;

use mjop::config::MjopConfig;

use crate::ConfigCommands;

pub fn cmd_config(config: &MjopConfig, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config_path = config.config_file();
            println!();
            println!("mjop configuration");
            println!("==================");
            println!();
            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("Config file: (none, using defaults)");
            }
            println!();

            println!("[sync] (effective)");
            println!("  record_id = \"{}\"", config.record_id());
            match config.base_url() {
                Some(url) => println!("  base_url = \"{}\"", url),
                None => println!("  base_url = (local only)"),
            }
            println!("  data_dir = \"{}\"", config.data_dir().display());
            println!("  timeout_secs = {}", config.toml.sync.timeout_secs);
            println!();

            let schedule = &config.toml.schedule;
            println!("[schedule]");
            println!(
                "  default_periodicity_months = {}",
                schedule.default_periodicity_months
            );
            println!("  default_total_years = {}", schedule.default_total_years);
            if let Some(rate) = schedule.default_indexation_rate {
                println!("  default_indexation_rate = {}", rate);
            }
            println!("  block_on_conflicts = {}", schedule.block_on_conflicts);
        }
        Some(ConfigCommands::Validate) => {
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("{}", console::style("Configuration is valid.").green());
            } else {
                for warning in &warnings {
                    println!("{} {}", console::style("warning:").yellow().bold(), warning);
                }
                anyhow::bail!("{} configuration problem(s)", warnings.len());
            }
        }
    }
    Ok(())
}
