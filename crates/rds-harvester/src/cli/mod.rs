//! CLI subcommand implementations for the `rds-harvester` binary.

pub mod args;
pub mod doctor;
pub mod links_cmd;
pub mod prompt;
pub mod run_cmd;
pub mod token_cmd;
