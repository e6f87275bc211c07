//! Top-level CLI definition and dispatch.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::json;

use file_integrity_compare::compare::driver::run_compare;
use file_integrity_compare::compare::loader::load_baseline;
use file_integrity_compare::compare::report::ReportWriter;
use file_integrity_compare::compare::session::{
    CompareOptions, CompareSession, Newline, SessionCounters, StorageMode,
};
use file_integrity_compare::core::attrs::{ATTR_TABLE, AttrMask};
use file_integrity_compare::core::config::Config;
use file_integrity_compare::core::errors::{FicError, Result};
use file_integrity_compare::decode::SnapshotReader;
use file_integrity_compare::logger::jsonl::JsonlLogger;

/// File Integrity Compare — classifies snapshot records against a baseline.
#[derive(Debug, Parser)]
#[command(
    name = "fic",
    author,
    version,
    about = "File Integrity Compare - snapshot comparison engine",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Compare a snapshot against a trusted baseline.
    Compare(CompareArgs),
    /// List the attributes recognized in snapshot headers and masks.
    Fields,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct CompareArgs {
    /// Trusted baseline snapshot file.
    baseline: PathBuf,
    /// Snapshot to compare against the baseline.
    snapshot: PathBuf,
    /// Report destination. Defaults to the configured path, then stdout.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Attributes to diff (mask grammar, e.g. "all-magic" or "size+md5").
    /// Defaults to the attributes both files actually recorded.
    #[arg(short, long, value_name = "MASK")]
    mask: Option<String>,
    /// Spill baseline payloads to an unlinked, memory-mapped backing file.
    #[arg(long)]
    memory_map: bool,
    /// Terminate report lines with CRLF instead of LF.
    #[arg(long)]
    crlf: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    shell: CompletionShell,
}

/// Dispatch the parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    if cli.no_color {
        control::set_override(false);
    }
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match &cli.command {
        Command::Compare(args) => run_compare_command(cli, &config, args),
        Command::Fields => run_fields(cli),
        Command::Completions(args) => {
            generate(
                args.shell,
                &mut Cli::command(),
                "fic",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}

fn run_compare_command(cli: &Cli, config: &Config, args: &CompareArgs) -> Result<()> {
    let logger = if config.log.enabled {
        JsonlLogger::new(config.log.path.clone())
    } else {
        JsonlLogger::disabled()
    };

    let outcome = execute_compare(cli, config, args, &logger);
    if let Err(err) = &outcome {
        logger.error(err.code(), &err.to_string());
    }
    outcome
}

fn execute_compare(
    cli: &Cli,
    config: &Config,
    args: &CompareArgs,
    logger: &JsonlLogger,
) -> Result<()> {
    let mut baseline_reader = SnapshotReader::open(&args.baseline)?;
    let mut snapshot_reader = SnapshotReader::open(&args.snapshot)?;

    let mut options = CompareOptions::from_config(config)?;
    options.compare_mask = resolve_compare_mask(
        args,
        cli.config.is_some(),
        config,
        baseline_reader.field_mask(),
        snapshot_reader.field_mask(),
    )?;
    if args.memory_map {
        options.storage = StorageMode::MemoryMapped {
            dir: config.compare.memory_map_dir.clone(),
        };
    }
    if args.crlf {
        options.newline = Newline::Crlf;
    }
    let teardown = options.teardown;
    let mut session = CompareSession::new(options);

    logger.compare_start(baseline_reader.file_name(), snapshot_reader.file_name());

    let report_path = args.output.clone().or_else(|| config.report.path.clone());
    let (out, target): (Box<dyn Write>, PathBuf) = match &report_path {
        Some(path) => {
            let file = File::create(path).map_err(|e| FicError::io(path, e))?;
            (Box::new(BufWriter::new(file)), path.clone())
        }
        None => (Box::new(io::stdout().lock()), PathBuf::from("<stdout>")),
    };
    let mut report = ReportWriter::new(out, target, session.options().newline);

    let storage = session.options().storage.clone();
    let mut baseline = load_baseline(&mut baseline_reader, &storage)?;
    run_compare(&mut session, &mut baseline, &mut snapshot_reader, &mut report)?;
    report.write_header()?; // Empty reports still carry the header line.
    report.finish()?;

    logger.compare_complete(session.counters());
    print_summary(cli, session.counters(), report_path.as_deref());

    baseline.release(teardown);
    Ok(())
}

/// Compare-mask precedence: `--mask`, then an explicitly supplied config
/// file or `FIC_COMPARE_MASK`, then the attributes both snapshots
/// actually recorded.
fn resolve_compare_mask(
    args: &CompareArgs,
    config_given: bool,
    config: &Config,
    baseline_mask: AttrMask,
    snapshot_mask: AttrMask,
) -> Result<AttrMask> {
    if let Some(mask) = &args.mask {
        return mask.parse();
    }
    if config_given || std::env::var_os("FIC_COMPARE_MASK").is_some() {
        return config.compare_mask();
    }
    Ok(baseline_mask.intersect(snapshot_mask))
}

fn print_summary(cli: &Cli, counters: &SessionCounters, report_path: Option<&std::path::Path>) {
    if cli.json {
        let summary = json!({
            "analyzed": counters.analyzed(),
            "changed": counters.changed(),
            "unknown": counters.unknown(),
            "crossed": counters.crossed(),
            "new": counters.new_records(),
            "missing": counters.missing(),
        });
        println!("{summary}");
        return;
    }

    // Keep the human summary off stdout when the report itself goes there.
    let mut out: Box<dyn Write> = if report_path.is_some() {
        Box::new(io::stdout().lock())
    } else {
        Box::new(io::stderr().lock())
    };
    let _ = writeln!(out, "{}", "=== Comparison summary ===".bold());
    let _ = writeln!(out, "  analyzed: {}", counters.analyzed());
    let _ = writeln!(out, "  changed:  {}", counters.changed().to_string().yellow());
    let _ = writeln!(out, "  unknown:  {}", counters.unknown());
    let _ = writeln!(out, "  crossed:  {}", counters.crossed());
    let _ = writeln!(out, "  new:      {}", counters.new_records().to_string().green());
    let _ = writeln!(out, "  missing:  {}", counters.missing().to_string().red());
}

fn run_fields(cli: &Cli) -> Result<()> {
    if cli.json {
        let fields: Vec<_> = ATTR_TABLE
            .iter()
            .map(|spec| json!({ "name": spec.name, "bit": spec.bit }))
            .collect();
        println!("{}", serde_json::to_string(&fields)?);
        return Ok(());
    }
    println!("bit  name");
    for spec in &ATTR_TABLE {
        println!("{:>3}  {}", spec.bit, spec.name);
    }
    Ok(())
}
