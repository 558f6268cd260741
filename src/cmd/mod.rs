//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled                        |
//! |-------------|------------------------------------------|
//! | `project`   | `Init`, `Show`, `Overview`              |
//! | `entity`    | `Element`, `Space`, `Defect`            |
//! | `schedule`  | `Schedule`, `Group`, `Conflicts`        |
//! | `sync`      | `Fetch`, `Push`                         |
//! | `config`    | `Config`                                |
//!
//! Commands that edit the record go through `workspace::Workspace`, which
//! saves every accepted change to the local data directory.

pub mod config;
pub mod entity;
pub mod project;
pub mod schedule;
pub mod sync;
pub mod workspace;

pub use config::cmd_config;
pub use entity::{cmd_defect, cmd_element, cmd_space};
pub use project::{cmd_init, cmd_overview, cmd_show};
pub use schedule::{cmd_conflicts, cmd_group, cmd_schedule};
pub use sync::{cmd_fetch, cmd_push};
