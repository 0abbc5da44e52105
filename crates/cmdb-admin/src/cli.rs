//! Command-line definition

use crate::commands::{AdaptArgs, AttachArgs, LockArgs, UsageArgs};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Parsed subcommand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `adapt-forms`
    Adapt(AdaptArgs),
    /// `legacy-usage`
    Usage(UsageArgs),
    /// `dictionary-lock`
    Lock(LockArgs),
    /// `attach`
    Attach(AttachArgs),
}

fn store_arg() -> Arg {
    Arg::new("store")
        .long("store")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Store snapshot (.json, .yaml or .yml)")
}

fn out_arg() -> Arg {
    Arg::new("out")
        .long("out")
        .value_parser(value_parser!(PathBuf))
        .help("Write the updated store here instead of over --store")
}

fn apply_arg() -> Arg {
    Arg::new("apply")
        .long("apply")
        .action(ArgAction::SetTrue)
        .help("Write changes; without it the run only plans and reports")
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Configuration file (.json, .yaml or .toml)")
}

/// Build the command tree
#[must_use]
pub fn build_cli() -> Command {
    Command::new("cmdb-admin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("One-shot CMDB lifecycle migrations")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("adapt-forms")
                .about("Insert lifecycle fields into classic form layouts")
                .arg(store_arg())
                .arg(config_arg())
                .arg(
                    Arg::new("preset")
                        .long("preset")
                        .value_parser(["ci-forms", "asset-forms"])
                        .default_value("ci-forms")
                        .help("Built-in configuration used when --config is absent"),
                )
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .value_parser(["per-view", "per-section"])
                        .help("Override the anchor mode"),
                )
                .arg(apply_arg())
                .arg(out_arg())
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .value_parser(value_parser!(PathBuf))
                        .help("Also write the report to this file (semicolon, CRLF)"),
                ),
        )
        .subcommand(
            Command::new("legacy-usage")
                .about("Report where legacy status fields sit on forms")
                .arg(store_arg())
                .arg(
                    Arg::new("fields")
                        .long("fields")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Comma-separated field names"),
                ),
        )
        .subcommand(
            Command::new("dictionary-lock")
                .about("Mark legacy status fields read-only in the dictionary")
                .arg(store_arg())
                .arg(config_arg())
                .arg(apply_arg())
                .arg(out_arg()),
        )
        .subcommand(
            Command::new("attach")
                .about("Attach a report file to an existing record")
                .arg(store_arg())
                .arg(Arg::new("table").long("table").required(true).help("Target table"))
                .arg(Arg::new("id").long("id").required(true).help("Target sys_id"))
                .arg(
                    Arg::new("basename")
                        .long("basename")
                        .required(true)
                        .help("Attachment file name stem"),
                )
                .arg(
                    Arg::new("csv")
                        .long("csv")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Report file to attach"),
                )
                .arg(out_arg()),
        )
}

fn path(args: &ArgMatches, name: &str) -> Option<PathBuf> {
    args.get_one::<PathBuf>(name).cloned()
}

fn text(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

/// Turn matches into an [`Invocation`]
///
/// Required arguments are enforced by clap; a missing one here reports as an
/// error rather than a panic.
///
/// # Errors
/// Returns error if a required argument is absent
pub fn invocation(matches: &ArgMatches) -> anyhow::Result<Invocation> {
    let required_path = |args: &ArgMatches, name: &str| {
        path(args, name).ok_or_else(|| anyhow::anyhow!("--{name} is required"))
    };
    let required_text = |args: &ArgMatches, name: &str| {
        text(args, name).ok_or_else(|| anyhow::anyhow!("--{name} is required"))
    };

    match matches.subcommand() {
        Some(("adapt-forms", args)) => Ok(Invocation::Adapt(AdaptArgs {
            store: required_path(args, "store")?,
            config: path(args, "config"),
            preset: text(args, "preset").unwrap_or_else(|| "ci-forms".into()),
            mode: text(args, "mode"),
            apply: args.get_flag("apply"),
            out: path(args, "out"),
            csv: path(args, "csv"),
        })),
        Some(("legacy-usage", args)) => Ok(Invocation::Usage(UsageArgs {
            store: required_path(args, "store")?,
            fields: args
                .get_many::<String>("fields")
                .map(|v| v.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect())
                .unwrap_or_default(),
        })),
        Some(("dictionary-lock", args)) => Ok(Invocation::Lock(LockArgs {
            store: required_path(args, "store")?,
            config: path(args, "config"),
            apply: args.get_flag("apply"),
            out: path(args, "out"),
        })),
        Some(("attach", args)) => Ok(Invocation::Attach(AttachArgs {
            store: required_path(args, "store")?,
            table: required_text(args, "table")?,
            id: required_text(args, "id")?,
            basename: required_text(args, "basename")?,
            csv: required_path(args, "csv")?,
            out: path(args, "out"),
        })),
        Some((other, _)) => anyhow::bail!("unknown subcommand {other}"),
        None => anyhow::bail!("no subcommand given"),
    }
}
