use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sgrep_bench::agent::{AgentMode, AgentPreset};
use sgrep_bench::config::SamplePolicy;
use sgrep_bench::query_set::BuildMode;
use sgrep_bench::runner::QueryMode;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Benchmark semantic code search (sgrep) against ripgrep", long_about = None)]
struct Cli {
    /// Log more to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Harness config file (default: .sgrep-bench/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a query set from a repository's symbols and comments
    BuildQueries {
        /// Repository to scan
        #[arg(long)]
        repo: PathBuf,

        /// Output JSONL file
        #[arg(long)]
        out: PathBuf,

        /// Maximum records (default: from config or 100)
        #[arg(long)]
        max_items: Option<usize>,

        /// Query derivation mode
        #[arg(long, value_enum, default_value_t = BuildModeArg::Symbols)]
        mode: BuildModeArg,

        /// Candidate selection (default: from config or document)
        #[arg(long, value_enum)]
        sample: Option<SampleArg>,

        /// Seed for random sampling
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run sgrep and rg over a query set and score them
    Bench {
        /// Repository the query set was built from
        #[arg(long)]
        repo: PathBuf,

        /// Query set JSONL
        #[arg(long)]
        queries: PathBuf,

        /// Outcome CSV (one row per query and tool)
        #[arg(long)]
        out: PathBuf,

        /// Results evaluated per query (default: from config or 10)
        #[arg(long)]
        limit: Option<usize>,

        /// Which query text to search
        #[arg(long, value_enum, default_value_t = QueryModeArg::Mixed)]
        mode: QueryModeArg,

        /// Repeated runs; the report takes per-metric medians (default: from config or 1)
        #[arg(long)]
        runs: Option<usize>,

        /// Per-invocation timeout in seconds (default: from config or 60)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Tools to benchmark
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = vec![ToolArg::Sgrep, ToolArg::Rg])]
        tools: Vec<ToolArg>,

        /// Require result lines to overlap the target line range
        #[arg(long)]
        match_lines: bool,

        /// Count failed and timed-out queries as misses instead of excluding them
        #[arg(long)]
        count_failures_as_misses: bool,

        /// Write the aggregate summary CSV here
        #[arg(long)]
        summary_csv: Option<PathBuf>,

        /// Write the Markdown report here
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Print the aggregate report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score sgrep and keywordized rg against a curated gold query set
    Gold {
        /// Repository the gold set refers to
        #[arg(long)]
        repo: PathBuf,

        /// Gold query set JSONL
        #[arg(long)]
        gold: PathBuf,

        /// Outcome CSV
        #[arg(long)]
        out: PathBuf,

        /// Results evaluated per query (default: from config or 10)
        #[arg(long)]
        limit: Option<usize>,

        /// Per-invocation timeout in seconds (default: from config or 60)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Write the Markdown report here
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Print the aggregate report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-aggregate previously written outcome CSVs
    Summarize {
        /// Outcome CSVs; each is one run
        #[arg(required = true)]
        csv: Vec<PathBuf>,

        /// Cutoff for Hit@K (default: from config or 10)
        #[arg(long)]
        k: Option<usize>,

        /// Count failed and timed-out queries as misses instead of excluding them
        #[arg(long)]
        count_failures_as_misses: bool,

        /// Write the aggregate summary CSV here
        #[arg(long)]
        summary_csv: Option<PathBuf>,

        /// Write the Markdown report here
        #[arg(long)]
        markdown: Option<PathBuf>,

        /// Print the aggregate report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Index a repository with sgrep and keep its profile output
    Index {
        /// Repository to index
        #[arg(long)]
        repo: PathBuf,

        /// File receiving sgrep's stdout verbatim
        #[arg(long)]
        out: PathBuf,

        /// Timeout in seconds (default: 1800)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Count agent tool calls and tokens with and without semantic search
    Agent {
        /// Repository the agent works in
        #[arg(long)]
        repo: PathBuf,

        /// Session grouping and tool rules
        #[arg(long, value_enum, default_value_t = AgentPresetArg::Forced)]
        preset: AgentPresetArg,

        /// Whether semantic search is allowed
        #[arg(long, value_enum, default_value_t = AgentModeArg::Sgrep)]
        mode: AgentModeArg,

        /// Queries, one per line (default: built-in list)
        #[arg(long)]
        queries_file: Option<PathBuf>,

        /// JSON report path (default: reports/codex_toolcall_<label>.json)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BuildModeArg {
    Symbols,
    Comments,
    Semantic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SampleArg {
    Document,
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum QueryModeArg {
    Keyword,
    Semantic,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ToolArg {
    Sgrep,
    Rg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AgentPresetArg {
    PerQuery,
    Forced,
    Natural,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AgentModeArg {
    Sgrep,
    Rg,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::BuildQueries {
            repo,
            out,
            max_items,
            mode,
            sample,
            seed,
        } => {
            commands::build_queries::execute(
                &config,
                commands::build_queries::BuildQueriesOptions {
                    repo,
                    out,
                    max_items,
                    mode: match mode {
                        BuildModeArg::Symbols => BuildMode::Symbols,
                        BuildModeArg::Comments => BuildMode::Comments,
                        BuildModeArg::Semantic => BuildMode::Semantic,
                    },
                    sample: sample.map(|s| match s {
                        SampleArg::Document => SamplePolicy::Document,
                        SampleArg::Random => SamplePolicy::Random,
                    }),
                    seed,
                },
            )?;
        }
        Commands::Bench {
            repo,
            queries,
            out,
            limit,
            mode,
            runs,
            timeout_secs,
            tools,
            match_lines,
            count_failures_as_misses,
            summary_csv,
            markdown,
            json,
        } => {
            commands::bench::execute(
                &config,
                commands::bench::BenchOptions {
                    repo,
                    queries,
                    out,
                    limit,
                    mode: match mode {
                        QueryModeArg::Keyword => QueryMode::Keyword,
                        QueryModeArg::Semantic => QueryMode::Semantic,
                        QueryModeArg::Mixed => QueryMode::Mixed,
                    },
                    runs,
                    timeout_secs,
                    use_sgrep: tools.contains(&ToolArg::Sgrep),
                    use_rg: tools.contains(&ToolArg::Rg),
                    match_lines,
                    count_failures_as_misses,
                    summary_csv,
                    markdown,
                    json,
                },
            )?;
        }
        Commands::Gold {
            repo,
            gold,
            out,
            limit,
            timeout_secs,
            markdown,
            json,
        } => {
            commands::gold::execute(
                &config,
                commands::gold::GoldOptions {
                    repo,
                    gold,
                    out,
                    limit,
                    timeout_secs,
                    markdown,
                    json,
                },
            )?;
        }
        Commands::Summarize {
            csv,
            k,
            count_failures_as_misses,
            summary_csv,
            markdown,
            json,
        } => {
            commands::summarize::execute(
                &config,
                commands::summarize::SummarizeOptions {
                    csv,
                    k,
                    count_failures_as_misses,
                    summary_csv,
                    markdown,
                    json,
                },
            )?;
        }
        Commands::Index {
            repo,
            out,
            timeout_secs,
        } => {
            commands::index::execute(&config, &repo, &out, timeout_secs)?;
        }
        Commands::Agent {
            repo,
            preset,
            mode,
            queries_file,
            out,
        } => {
            commands::agent::execute(
                &config,
                commands::agent::AgentOptions {
                    repo,
                    preset: match preset {
                        AgentPresetArg::PerQuery => AgentPreset::PerQuery,
                        AgentPresetArg::Forced => AgentPreset::Forced,
                        AgentPresetArg::Natural => AgentPreset::Natural,
                    },
                    mode: match mode {
                        AgentModeArg::Sgrep => AgentMode::Sgrep,
                        AgentModeArg::Rg => AgentMode::Rg,
                    },
                    queries_file,
                    out,
                },
            )?;
        }
    }

    Ok(())
}
