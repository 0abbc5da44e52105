//! CMDB Admin
//!
//! Command-line runner for the lifecycle migrations. Every subcommand works on
//! a store snapshot file, prints its report to stdout and logs through
//! `tracing` to stderr.
//!
//! # Subcommands
//!
//! - `adapt-forms`: insert lifecycle fields into form layouts
//! - `legacy-usage`: list form placements of legacy status fields
//! - `dictionary-lock`: mark legacy status fields read-only
//! - `attach`: attach a report file to a record

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cli;
pub mod commands;

use cli::Invocation;

/// Execute a parsed invocation and return the text to print
///
/// # Errors
/// Returns error if the subcommand fails
pub fn execute(invocation: &Invocation) -> anyhow::Result<String> {
    match invocation {
        Invocation::Adapt(args) => commands::adapt_forms(args),
        Invocation::Usage(args) => commands::legacy_usage_report(args),
        Invocation::Lock(args) => commands::dictionary_lock(args),
        Invocation::Attach(args) => commands::attach_report(args),
    }
}
