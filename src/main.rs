//! Diction Series CLI
//!
//! Windowed dictionary word-usage time series from speech transcripts.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use diction_series::{
    batch::{discover_sessions, run_session, BatchRunner, SessionJob},
    config::Config,
    core::{OverlapPolicy, SessionAnalyzer, SessionBounds, WindowConfig},
    io::{read_dictionary, read_session_bounds, OutputFormat},
    lexicon::Lexicon,
    report::create_shared_log_with_persistence,
    VERSION,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "diction-series")]
#[command(version = VERSION)]
#[command(about = "Windowed dictionary word-usage time series from speech transcripts", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the analysis commands; each overrides the config file.
#[derive(Args, Debug, Default)]
struct AnalysisArgs {
    /// Dictionary CSV with word and category columns
    #[arg(long, short)]
    dictionary: Option<PathBuf>,

    /// Overlap policy (unbounded or bounded)
    #[arg(long)]
    policy: Option<OverlapPolicy>,

    /// Participant speakers for the bounded policy (comma-separated)
    #[arg(long)]
    participants: Option<String>,

    /// Window length in seconds
    #[arg(long)]
    window_size: Option<f64>,

    /// Seconds between window starts
    #[arg(long)]
    step: Option<f64>,

    /// Output format (csv, json or jsonl)
    #[arg(long)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single transcript
    Analyze {
        /// Transcript CSV with start, end, text and speaker columns
        transcript: PathBuf,

        /// Output directory
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output file prefix (defaults to the transcript's session prefix)
        #[arg(long)]
        prefix: Option<String>,

        /// Session cutoff start in seconds
        #[arg(long, requires = "end")]
        start: Option<f64>,

        /// Session cutoff end in seconds
        #[arg(long, requires = "start")]
        end: Option<f64>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyze every transcript under `group N` directories
    Batch {
        /// Root holding the `group N` transcript directories
        #[arg(long)]
        transcripts: Option<PathBuf>,

        /// Output root (one `group_N` directory per group)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Number of groups to scan
        #[arg(long)]
        groups: Option<usize>,

        /// Session cutoffs CSV (session,start,end)
        #[arg(long)]
        cutoffs: Option<PathBuf>,

        /// Worker threads
        #[arg(long)]
        workers: Option<usize>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// List the categories a dictionary produces
    Categories {
        /// Dictionary CSV
        #[arg(long, short)]
        dictionary: Option<PathBuf>,
    },

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Analyze {
            transcript,
            output,
            prefix,
            start,
            end,
            analysis,
        } => cmd_analyze(config, &transcript, output, prefix, start.zip(end), analysis),
        Commands::Batch {
            transcripts,
            output,
            groups,
            cutoffs,
            workers,
            analysis,
        } => cmd_batch(config, transcripts, output, groups, cutoffs, workers, analysis),
        Commands::Categories { dictionary } => cmd_categories(config, dictionary),
        Commands::Config => cmd_config(config, cli.config.as_deref()),
    });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.context("could not load configuration")
}

/// Apply command-line overrides to the configuration.
fn apply_analysis_args(config: &mut Config, args: AnalysisArgs) -> anyhow::Result<()> {
    if let Some(dictionary) = args.dictionary {
        config.dictionary_path = dictionary;
    }
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(participants) = args.participants {
        config.participants = participants
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if args.window_size.is_some() || args.step.is_some() {
        let window = WindowConfig {
            size_secs: args.window_size.unwrap_or(config.window.size_secs),
            step_secs: args.step.unwrap_or(config.window.step_secs),
            ..config.window
        };
        window.validate()?;
        config.window = window;
    }
    if let Some(format) = args.format {
        config.output_format = format;
    }
    Ok(())
}

fn load_lexicon(config: &Config) -> anyhow::Result<Lexicon> {
    let entries = read_dictionary(&config.dictionary_path, &config.dictionary_columns)?;
    let lexicon = Lexicon::build(entries)
        .with_context(|| format!("invalid dictionary {:?}", config.dictionary_path))?;
    if lexicon.is_empty() {
        tracing::warn!(path = ?config.dictionary_path, "dictionary produced no categories");
    }
    Ok(lexicon)
}

fn build_analyzer(config: &Config) -> anyhow::Result<SessionAnalyzer> {
    let lexicon = load_lexicon(config)?;
    Ok(SessionAnalyzer::new(lexicon, config.analysis_options())?)
}

fn cmd_analyze(
    mut config: Config,
    transcript: &Path,
    output: Option<PathBuf>,
    prefix: Option<String>,
    cutoff: Option<(f64, f64)>,
    analysis: AnalysisArgs,
) -> anyhow::Result<()> {
    apply_analysis_args(&mut config, analysis)?;
    let analyzer = build_analyzer(&config)?;

    let prefix = match prefix {
        Some(prefix) => prefix,
        None => session_prefix_of(transcript)?,
    };
    let job = SessionJob {
        group: None,
        prefix,
        transcript: transcript.to_path_buf(),
        out_dir: output.unwrap_or_else(|| config.output_dir.clone()),
    };

    let mut bounds = HashMap::new();
    if let Some((start, end)) = cutoff {
        bounds.insert(job.key(), SessionBounds::new(start, end));
    }

    let report = run_session(&job, &analyzer, &bounds, config.output_format)
        .with_context(|| format!("analyzing {transcript:?}"))?;

    println!("Analyzed {transcript:?} ({} policy)", config.policy);
    println!(
        "  Utterances: {} kept, {} dropped",
        report.stats.utterances_kept,
        report.stats.rows_dropped()
    );
    println!("  Windows: {}", report.stats.windows);
    println!("  Speakers: {}", report.speakers);
    println!("  Group table: {:?}", report.files.group);
    for path in &report.files.speakers {
        println!("  Speaker table: {path:?}");
    }
    Ok(())
}

fn session_prefix_of(transcript: &Path) -> anyhow::Result<String> {
    let name = transcript
        .file_name()
        .and_then(|n| n.to_str())
        .context("transcript path has no file name")?;
    Ok(diction_series::batch::session_prefix(name)
        .map(str::to_string)
        .unwrap_or_else(|| {
            transcript
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(name)
                .to_string()
        }))
}

#[allow(clippy::too_many_arguments)]
fn cmd_batch(
    mut config: Config,
    transcripts: Option<PathBuf>,
    output: Option<PathBuf>,
    groups: Option<usize>,
    cutoffs: Option<PathBuf>,
    workers: Option<usize>,
    analysis: AnalysisArgs,
) -> anyhow::Result<()> {
    apply_analysis_args(&mut config, analysis)?;
    if let Some(transcripts) = transcripts {
        config.transcripts_dir = transcripts;
    }
    if let Some(output) = output {
        config.output_dir = output;
    }
    if let Some(groups) = groups {
        config.num_groups = groups;
    }
    if cutoffs.is_some() {
        config.cutoffs_path = cutoffs;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    config.validate()?;

    if config.policy == OverlapPolicy::Bounded && config.cutoffs_path.is_none() {
        bail!("the bounded policy needs a cutoffs file (--cutoffs)");
    }

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Diction Series v{VERSION}");
    println!();

    let analyzer = build_analyzer(&config)?;
    let bounds = match &config.cutoffs_path {
        Some(path) => read_session_bounds(path)?,
        None => HashMap::new(),
    };

    println!("Starting analysis...");
    println!("  Transcripts: {:?}", config.transcripts_dir);
    println!("  Output: {:?}", config.output_dir);
    println!("  Policy: {}", config.policy);
    println!(
        "  Window: {}s every {}s",
        config.window.size_secs, config.window.step_secs
    );
    println!("  Categories: {}", analyzer.lexicon().categories().len());
    println!("  Workers: {}", config.workers);
    println!();

    let run_log = create_shared_log_with_persistence(config.data_path.join("run_log.json"));
    let jobs = discover_sessions(
        &config.transcripts_dir,
        &config.output_dir,
        config.num_groups,
        &run_log,
    )?;
    println!("Found {} transcript(s)", jobs.len());
    println!("Press Ctrl+C to stop after the running sessions");
    println!();

    let runner = BatchRunner::new(
        analyzer,
        bounds,
        config.output_format,
        config.workers,
        Arc::clone(&run_log),
    );
    ctrlc_handler(runner.stop_flag());

    let summary = runner.run(jobs);

    if let Err(e) = run_log.save() {
        eprintln!("Warning: Could not save run log: {e}");
    }

    println!();
    if summary.cancelled > 0 {
        println!("Stopped early: {} session(s) not started", summary.cancelled);
    }
    println!("{}", run_log.summary());
    println!();
    println!("Processing complete!");
    Ok(())
}

fn cmd_categories(mut config: Config, dictionary: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(dictionary) = dictionary {
        config.dictionary_path = dictionary;
    }
    let lexicon = load_lexicon(&config)?;

    println!("Dictionary: {:?}", config.dictionary_path);
    println!(
        "  {} literal word(s), {} wildcard pattern(s)",
        lexicon.literal_count(),
        lexicon.pattern_count()
    );
    println!();
    for category in lexicon.categories() {
        println!("{category}");
    }
    Ok(())
}

fn cmd_config(config: Config, path: Option<&Path>) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.map(Path::to_path_buf).unwrap_or_else(Config::config_path)
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(stop: Arc<AtomicBool>) {
    if let Err(e) = ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    }) {
        eprintln!("Warning: Could not set Ctrl+C handler: {e}");
    }
}
