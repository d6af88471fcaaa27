//! growthwise CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use growthwise::{
    commands::{
        cmd_ask, cmd_diagnose, cmd_index_build, cmd_index_status, cmd_init, cmd_query,
        cmd_recommend, cmd_tables_reduce, print_ask_result, print_build_stats, print_diagnosis,
        print_index_status, print_init, print_query_results, print_recommendation,
        print_reduce_stats, InitOptions,
    },
    config::Config,
    error::{Error, Result},
    growth::Sex,
    progress::LogWriterFactory,
    recommend::PatientContext,
    service::GrowthGuide,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "growthwise")]
#[command(version, about = "WHO child-growth z-scores with guideline-grounded feeding recommendations", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Measurements shared by `diagnose` and `recommend`
#[derive(clap::Args)]
struct Measurements {
    /// Sex of the child (female/f/girl/0 or male/m/boy/1)
    #[arg(long)]
    sex: String,

    /// Age in completed months
    #[arg(long)]
    age: u32,

    /// Weight in kilograms
    #[arg(long)]
    weight: f64,

    /// Height or recumbent length in centimetres
    #[arg(long)]
    height: f64,
}

impl Measurements {
    fn sex(&self) -> Result<Sex> {
        self.sex.parse()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Compute z-scores and diagnosis labels
    Diagnose {
        #[command(flatten)]
        measurements: Measurements,
    },

    /// Diagnose, then produce a caregiver recommendation
    Recommend {
        #[command(flatten)]
        measurements: Measurements,

        /// Output language code (e.g. en, id)
        #[arg(long)]
        language: Option<String>,

        /// Known food allergies (repeatable or comma-separated)
        #[arg(long = "allergy", value_delimiter = ',')]
        allergies: Vec<String>,

        /// Food preferences (repeatable or comma-separated)
        #[arg(long = "preference", value_delimiter = ',')]
        preferences: Vec<String>,

        /// Free-text notes from the caregiver
        #[arg(long)]
        notes: Option<String>,
    },

    /// Manage the guideline index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },

    /// Show the guideline chunks retrieved for a query
    Query {
        /// The search query
        query: String,

        /// Maximum number of results (defaults to rag.top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Ask a free-form question answered from the guidelines
    Ask {
        /// The question
        question: String,
    },

    /// Preprocess WHO reference tables
    Tables {
        #[command(subcommand)]
        action: TablesAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Ingest the docs directory and add new chunks
    Build {
        /// Delete the existing collection first
        #[arg(long)]
        rebuild: bool,
    },

    /// Show index location and record count
    Status,
}

#[derive(Subcommand)]
enum TablesAction {
    /// Reduce a daily `Day,L,M,S` table to monthly rows
    Reduce {
        /// Daily input CSV
        input: PathBuf,

        /// Monthly output CSV
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(if e.is_user_error() { 2 } else { 1 });
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    let json = cli.json;

    // Commands that need no configuration
    match &cli.command {
        Commands::Init { force } => {
            let config = cmd_init(InitOptions::from_cli(cli.config.clone(), *force))?;
            return emit(json, &config.paths.config_file, || print_init(&config));
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "growthwise", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Tables {
            action: TablesAction::Reduce { input, output },
        } => {
            let stats = cmd_tables_reduce(input, output)?;
            return emit(json, &stats, || print_reduce_stats(&stats));
        }
        _ => {}
    }

    let config = load_config(cli.config)?;
    let guide = GrowthGuide::from_config(config);

    match cli.command {
        Commands::Diagnose { measurements } => {
            let diagnosis = cmd_diagnose(
                &guide,
                measurements.sex()?,
                measurements.age,
                measurements.weight,
                measurements.height,
            )?;
            emit(json, &diagnosis, || print_diagnosis(&diagnosis))?;
        }

        Commands::Recommend {
            measurements,
            language,
            allergies,
            preferences,
            notes,
        } => {
            let patient = PatientContext {
                age_months: measurements.age,
                sex: measurements.sex()?,
                weight_kg: measurements.weight,
                height_cm: measurements.height,
                language,
                allergies: trimmed(allergies),
                preferences: trimmed(preferences),
                notes,
            };
            let result = cmd_recommend(&guide, &patient).await?;
            emit(json, &result, || print_recommendation(&result))?;
        }

        Commands::Index { action } => match action {
            IndexAction::Build { rebuild } => {
                let stats = cmd_index_build(&guide, rebuild).await?;
                emit(json, &stats, || print_build_stats(&stats))?;
            }
            IndexAction::Status => {
                let status = cmd_index_status(&guide).await?;
                emit(json, &status, || print_index_status(&status))?;
            }
        },

        Commands::Query { query, limit } => {
            let result = cmd_query(&guide, &query, limit).await?;
            emit(json, &result, || print_query_results(&result))?;
        }

        Commands::Ask { question } => {
            let result = cmd_ask(&guide, &question).await;
            emit(json, &result, || print_ask_result(&result))?;
        }

        Commands::Init { .. } | Commands::Completions { .. } | Commands::Tables { .. } => {}
    }

    Ok(())
}

/// Print as pretty JSON or through the human-readable printer
fn emit<T: Serialize>(json: bool, value: &T, print: impl FnOnce()) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print();
    }
    Ok(())
}

fn trimmed(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `--config` must exist; the default location falls back to built-in defaults
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) if path.is_dir() => Config::load_from(Some(path)),
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}. Run 'growthwise init' first.",
                    path.display()
                )));
            }
            Config::load(&path)
        }
        None => Config::load_from(None),
    }
}
