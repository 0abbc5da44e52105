//! Subcommand implementations
//!
//! Each command loads a store snapshot, runs one operation and returns the
//! text to print. Snapshots are only written back when the run is allowed to
//! write.

use anyhow::Context;
use cmdb_lifecycle::{
    default_usage_fields, enforce_read_only, legacy_usage, render_usage, AdaptConfig, AnchorMode,
    DictionaryConfig, FormAdapter, ViewLabels,
};
use cmdb_report::{attach, AttachmentSpec, CsvOptions, LineLog, Report, RunMode};
use cmdb_store::{MemoryStore, Snapshot, SysId};
use std::path::{Path, PathBuf};

/// `adapt-forms` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptArgs {
    /// Store snapshot
    pub store: PathBuf,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Built-in configuration when no file is given
    pub preset: String,
    /// Anchor mode override
    pub mode: Option<String>,
    /// Write changes
    pub apply: bool,
    /// Snapshot destination
    pub out: Option<PathBuf>,
    /// Attachment-style report copy
    pub csv: Option<PathBuf>,
}

/// `legacy-usage` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageArgs {
    /// Store snapshot
    pub store: PathBuf,
    /// Fields to look for; empty means the default list
    pub fields: Vec<String>,
}

/// `dictionary-lock` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockArgs {
    /// Store snapshot
    pub store: PathBuf,
    /// Configuration file
    pub config: Option<PathBuf>,
    /// Write changes
    pub apply: bool,
    /// Snapshot destination
    pub out: Option<PathBuf>,
}

/// `attach` arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachArgs {
    /// Store snapshot
    pub store: PathBuf,
    /// Target table
    pub table: String,
    /// Target record
    pub id: String,
    /// Attachment name stem
    pub basename: String,
    /// File to attach
    pub csv: PathBuf,
    /// Snapshot destination
    pub out: Option<PathBuf>,
}

fn load_store(path: &Path) -> anyhow::Result<MemoryStore> {
    let snapshot =
        Snapshot::load(path).with_context(|| format!("loading store {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = snapshot.row_count(), "store loaded");
    Ok(MemoryStore::from_snapshot(snapshot))
}

fn save_store(store: &MemoryStore, source: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let target = out.unwrap_or(source);
    store
        .to_snapshot()
        .save(target)
        .with_context(|| format!("saving store {}", target.display()))?;
    tracing::info!(path = %target.display(), writes = store.write_count(), "store saved");
    Ok(())
}

fn adapt_config(args: &AdaptArgs) -> anyhow::Result<AdaptConfig> {
    let mut config = match &args.config {
        Some(path) => AdaptConfig::from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => match args.preset.as_str() {
            "asset-forms" => AdaptConfig::asset_forms(),
            _ => AdaptConfig::ci_forms(),
        },
    };
    if let Some(mode) = &args.mode {
        if mode != config.mode.tag() {
            config.mode = match mode.as_str() {
                "per-section" => AnchorMode::per_section_default(),
                "per-view" => AnchorMode::per_view_default(),
                other => anyhow::bail!("unknown mode {other}"),
            };
        }
    }
    let apply = args.apply || config.apply;
    Ok(config.with_apply(apply))
}

/// Run the form migration
///
/// # Errors
/// Returns error if the store or configuration cannot be loaded, a read
/// fails during the run, or output cannot be written
pub fn adapt_forms(args: &AdaptArgs) -> anyhow::Result<String> {
    let config = adapt_config(args)?;
    let mut store = load_store(&args.store)?;
    let adapter = FormAdapter::new(config).context("invalid configuration")?;
    let mode = adapter.mode();

    let mut report = Report::new();
    let mut log = LineLog::new();
    let summary = adapter
        .run(&mut store, &mut (&mut report, &mut log))
        .context("form adaptation aborted")?;
    tracing::info!(
        units = summary.units,
        failed = summary.units_failed,
        lines = log.lines().len(),
        "run complete"
    );

    if let Some(csv) = &args.csv {
        let body = report.render_with_footer(&CsvOptions::attachment(), mode)?;
        std::fs::write(csv, body).with_context(|| format!("writing {}", csv.display()))?;
    }
    if mode.writes() {
        save_store(&store, &args.store, args.out.as_deref())?;
    }
    Ok(report.render_with_footer(&CsvOptions::default(), mode)?)
}

/// Print where legacy fields sit on forms
///
/// # Errors
/// Returns error if the store cannot be loaded or a query fails
pub fn legacy_usage_report(args: &UsageArgs) -> anyhow::Result<String> {
    let store = load_store(&args.store)?;
    let fields = if args.fields.is_empty() {
        default_usage_fields()
    } else {
        args.fields.clone()
    };
    let rows = legacy_usage(&store, &fields, &mut ViewLabels::new())?;
    let mut out = render_usage(&rows, &CsvOptions::default())?;
    out.push_str(&format!("---\nRows: {}\n", rows.len()));
    Ok(out)
}

/// Enforce dictionary read-only
///
/// # Errors
/// Returns error if loading fails or a read fails during the run
pub fn dictionary_lock(args: &LockArgs) -> anyhow::Result<String> {
    let mut config = match &args.config {
        Some(path) => DictionaryConfig::from_path(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DictionaryConfig::default(),
    };
    config.apply = config.apply || args.apply;
    let mode = RunMode::from_apply(config.apply);

    let mut store = load_store(&args.store)?;
    let report = enforce_read_only(&mut store, &config).context("dictionary lock aborted")?;
    if mode.writes() {
        save_store(&store, &args.store, args.out.as_deref())?;
    }

    let mut lines = report.lines();
    lines.push(format!("Mode: {}", mode.label()));
    Ok(lines.join("\n") + "\n")
}

/// Attach a report file to a record
///
/// # Errors
/// Returns error if the target record does not exist (nothing is written) or
/// any file operation fails
pub fn attach_report(args: &AttachArgs) -> anyhow::Result<String> {
    let mut store = load_store(&args.store)?;
    let text = std::fs::read_to_string(&args.csv)
        .with_context(|| format!("reading {}", args.csv.display()))?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();

    let attached = attach(
        &mut store,
        &args.table,
        &SysId::new(args.id.trim()),
        &AttachmentSpec::csv(args.basename.as_str()),
        &lines,
        chrono::Local::now().naive_local(),
    )
    .with_context(|| format!("attaching to {}/{}", args.table, args.id))?;

    save_store(&store, &args.store, args.out.as_deref())?;
    Ok(format!(
        "Attached {} ({} bytes) as sys_attachment {}\n",
        attached.file_name, attached.size_bytes, attached.sys_id
    ))
}
