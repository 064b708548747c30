//! CLI module for replset
//!
//! Offline planning commands:
//! - plan-psa: show the two reconfigs of a PA -> PSA transition
//! - plan-add / plan-remove: show the reconfig a membership change submits
//! - schedule: show the retry backoff schedule

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{plan_add_member, plan_psa, plan_remove_member, run, run_command, schedule};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_config, write_error, write_response};
