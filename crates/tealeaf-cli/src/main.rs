// ─────────────────────────────────────────────────────────────────────
// TeaLeaf Post — tealeaf-post Command Line
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `tealeaf-post`: merge chunked VTK dumps, diff two runs, decode solver logs.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tealeaf_core::perf_log::decode_performance_dir;
use tealeaf_core::pipeline::{compare_directories, merge_directory};
use tealeaf_types::codec::Encoding;
use tealeaf_types::config::{
    BoundaryPolicy, ChunkLayout, DuplicatePolicy, FailurePolicy, PostprocessConfig,
};
use tealeaf_types::constants::{DEFAULT_ERROR_PREFIX, VISIT_FILENAME};
use tealeaf_vtk::LegacyVtkCodec;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, global = true)]
    verbose: bool,

    /// JSON file seeding the post-processing options
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge per-chunk VTK dumps into one grid file per iteration
    Merge(MergeArgs),
    /// Write |expected - actual| grids for two directories of merged files
    Error(ErrorArgs),
    /// Extract timestep, CG iteration and wallclock series from tea.out
    Perf(PerfArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Directory containing the input VTK files
    #[arg(short, long, default_value = "target/vtk")]
    input: PathBuf,

    /// Directory to produce the merged VTK files in
    #[arg(short, long, default_value = "target/vtk/postprocess")]
    output: PathBuf,

    /// Prefix of the output VTK filenames
    #[arg(short = 'p', long = "output-prefix")]
    prefix: Option<String>,

    /// Directory containing the 'tea.visit' file
    #[arg(short, long, default_value = "target/vtk")]
    visit: PathBuf,

    /// Write binary VTK files
    #[arg(long)]
    bin: bool,

    /// Remove the input VTK files after a successful merge
    #[arg(long)]
    rm: bool,

    /// Keep the last of several files claiming the same chunk
    #[arg(long)]
    allow_duplicates: bool,

    /// Deduplicate boundary coordinates without checking vertex counts
    #[arg(long)]
    exact_boundaries: bool,

    /// Record failing iterations and carry on with the rest
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Args, Debug)]
struct ErrorArgs {
    /// Directory containing the reference VTK files
    #[arg(short, long)]
    expected: PathBuf,

    /// Directory containing the actual VTK files
    #[arg(short, long)]
    actual: PathBuf,

    /// Directory to write difference grids in [default: <actual>/error]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Prefix of the output VTK filenames
    #[arg(short = 'p', long = "output-prefix", default_value = DEFAULT_ERROR_PREFIX)]
    prefix: String,

    /// Write binary VTK files
    #[arg(long)]
    bin: bool,

    /// Write per-iteration error statistics to this JSON file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Record failing iterations and carry on with the rest
    #[arg(long)]
    continue_on_error: bool,
}

#[derive(Args, Debug)]
struct PerfArgs {
    /// Directory containing tea.out
    #[arg(long)]
    log: PathBuf,

    /// JSON file to write the series to
    #[arg(short, long)]
    output: PathBuf,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn base_config(path: Option<&Path>) -> Result<PostprocessConfig> {
    match path {
        Some(path) => PostprocessConfig::from_file(path)
            .with_context(|| format!("loading config '{}'", path.display())),
        None => Ok(PostprocessConfig::default()),
    }
}

fn run_merge(args: MergeArgs, mut config: PostprocessConfig) -> Result<()> {
    if let Some(prefix) = args.prefix {
        config.output_prefix = prefix;
    }
    if args.bin {
        config.encoding = Encoding::Binary;
    }
    if args.rm {
        config.remove_inputs = true;
    }
    if args.allow_duplicates {
        config.duplicate_policy = DuplicatePolicy::LastWins;
    }
    if args.exact_boundaries {
        config.boundary_policy = BoundaryPolicy::Exact;
    }
    if args.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }

    let visit = args.visit.join(VISIT_FILENAME);
    let layout = ChunkLayout::from_visit_file(&visit)
        .with_context(|| format!("reading chunk layout from '{}'", visit.display()))?;
    tracing::info!(
        grid_x_chunks = layout.grid_x_chunks,
        grid_y_chunks = layout.grid_y_chunks,
        "chunk layout"
    );

    let report = merge_directory(
        &LegacyVtkCodec,
        &args.input,
        &args.output,
        Some(&layout),
        &config,
    )
    .with_context(|| format!("merging '{}'", args.input.display()))?;

    for failure in &report.failures {
        tracing::error!(iteration = failure.iteration, "{}", failure.error);
    }
    if !report.failures.is_empty() {
        bail!("{} iteration(s) could not be merged", report.failures.len());
    }
    Ok(())
}

fn run_error(args: ErrorArgs, mut config: PostprocessConfig) -> Result<()> {
    config.output_prefix = args.prefix;
    if args.bin {
        config.encoding = Encoding::Binary;
    }
    if args.continue_on_error {
        config.failure_policy = FailurePolicy::Continue;
    }
    let output = args.output.unwrap_or_else(|| args.actual.join("error"));

    let report = compare_directories(
        &LegacyVtkCodec,
        &args.expected,
        &args.actual,
        &output,
        &config,
    )
    .with_context(|| {
        format!(
            "comparing '{}' against '{}'",
            args.actual.display(),
            args.expected.display()
        )
    })?;

    if let Some(path) = &args.summary {
        report
            .series
            .write_json(path)
            .with_context(|| format!("writing summary '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "error summary written");
    }
    for failure in &report.failures {
        tracing::error!(iteration = failure.iteration, "{}", failure.error);
    }
    if !report.failures.is_empty() {
        bail!("{} iteration(s) could not be compared", report.failures.len());
    }
    Ok(())
}

fn run_perf(args: PerfArgs) -> Result<()> {
    let series = decode_performance_dir(&args.log)
        .with_context(|| format!("decoding solver log in '{}'", args.log.display()))?;
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.output, series.to_json()?)
        .with_context(|| format!("writing '{}'", args.output.display()))?;
    tracing::info!(steps = series.len(), path = %args.output.display(), "performance series written");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = base_config(cli.config.as_deref())?;

    match cli.command {
        Command::Merge(args) => run_merge(args, config),
        Command::Error(args) => run_error(args, config),
        Command::Perf(args) => run_perf(args),
    }
}
