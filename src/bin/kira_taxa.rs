use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_taxa::app::{App, ProgressSink, SearchOptions};
use kira_taxa::config::ConfigLoader;
use kira_taxa::domain::{MatchingMode, parse_dataset_key};
use kira_taxa::error::TaxaError;
use kira_taxa::gbif::GbifHttpClient;
use kira_taxa::output::{JsonOutput, OutputMode, StderrProgress};
use kira_taxa::rank::Rank;
use kira_taxa::resolver::Resolver;
use kira_taxa::source::SearchFilters;
use kira_taxa::walker::QueryOptions;

#[derive(Parser)]
#[command(name = "kira-taxa")]
#[command(about = "Resolve scientific-name usages and their hierarchy from GBIF")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Resolve name usages by local key or persistent id")]
    Usage(UsageArgs),
    #[command(about = "Find name usages by name")]
    Search(SearchArgs),
    #[command(about = "Walk the ancestors of a name usage")]
    Higher(HigherArgs),
    #[command(about = "Walk the descendants of a name usage")]
    Lower(LowerArgs),
}

#[derive(Args)]
struct UsageArgs {
    #[arg(required = true)]
    keys: Vec<String>,
}

#[derive(Args)]
struct SearchArgs {
    query: String,

    #[arg(long, value_enum, default_value_t = MatchingMode::Exact)]
    mode: MatchingMode,

    #[arg(long)]
    rank: Option<Rank>,

    #[arg(long)]
    synonyms: bool,

    #[arg(long)]
    basionyms: bool,

    #[arg(long)]
    strict: bool,

    #[arg(long)]
    verbose: bool,

    #[arg(long)]
    classification: Option<String>,

    #[arg(long)]
    dataset: Option<String>,

    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Args)]
struct HigherArgs {
    key: String,

    #[arg(long)]
    rank_stop: Option<Rank>,

    #[arg(long, default_value_t = -1, allow_negative_numbers = true, help = "Ancestor levels; negative walks the full chain")]
    height: i32,
}

#[derive(Args)]
struct LowerArgs {
    key: String,

    #[arg(long, default_value_t = 0, allow_negative_numbers = true, help = "Generations below the children; negative is unbounded")]
    depth: i32,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(taxa) = report.downcast_ref::<TaxaError>() {
            return ExitCode::from(map_exit_code(taxa));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TaxaError) -> u8 {
    match error {
        TaxaError::NotFound(_) => 2,
        error if error.is_transport() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.progress {
        OutputMode::Verbose
    } else {
        OutputMode::Quiet
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = GbifHttpClient::new(&config.gbif)?;
    let app = App::new(Resolver::new(client, config.resolver));
    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Verbose => &StderrProgress,
        OutputMode::Quiet => &JsonOutput,
    };

    match cli.command {
        Commands::Usage(args) => {
            let result = app.usage(&args.keys, sink)?;
            JsonOutput::print_usage(&result).into_diagnostic()
        }
        Commands::Search(args) => {
            let dataset_key = args.dataset.as_deref().map(parse_dataset_key).transpose()?;
            let options = SearchOptions {
                mode: Some(args.mode),
                query: QueryOptions {
                    rank: args.rank,
                    include_synonyms: args.synonyms,
                    include_basionyms: args.basionyms,
                    strict: args.strict,
                    verbose: args.verbose,
                    classification: args.classification,
                    filters: SearchFilters {
                        dataset_key,
                        limit: args.limit,
                        ..Default::default()
                    },
                },
            };
            let result = app.search(&args.query, &options, sink)?;
            JsonOutput::print_search(&result).into_diagnostic()
        }
        Commands::Higher(args) => {
            let result = app.higher(&args.key, args.rank_stop, args.height, sink)?;
            JsonOutput::print_hierarchy(&result).into_diagnostic()
        }
        Commands::Lower(args) => {
            let result = app.lower(&args.key, args.depth, sink)?;
            JsonOutput::print_hierarchy(&result).into_diagnostic()
        }
    }
}
