//! Mathroute - adaptive routing of math questions between a curated
//! knowledge base and web search
//!
//! Command-line entry point. State (sessions, feedback, performance) is kept
//! in a JSON file between invocations so ratings keep shaping later routing.

use clap::{Parser, Subcommand};
use mathroute_core::error::Result;
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

mod cli;

use cli::{config::ConfigAction, feedback::Scores, helpers::GlobalOpts, kb::KbAction};

#[derive(Parser)]
#[command(name = "mathroute")]
#[command(about = "Step-by-step math answers from a knowledge base or the web", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file path (overrides MATHROUTE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// State file path (overrides MATHROUTE_STATE_PATH)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a math question
    Ask {
        /// The question text
        question: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rate the answer of a previous session
    Feedback {
        /// Session ID printed by `ask`
        session_id: String,

        /// Rating from 1 (poor) to 5 (excellent)
        rating: u8,

        /// Free-form comments
        #[arg(short, long)]
        comments: Option<String>,

        /// Accuracy score (0.0-1.0)
        #[arg(long)]
        accuracy: Option<f64>,

        /// Clarity score (0.0-1.0)
        #[arg(long)]
        clarity: Option<f64>,

        /// Completeness score (0.0-1.0)
        #[arg(long)]
        completeness: Option<f64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show what the router has learned from feedback
    Insights {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Inspect the knowledge base
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Library events are logged under the lib crate name
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!(
        "mathroute={level},mathroute_core={level},reqwest=warn,hyper=warn"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Mathroute v{} starting...", env!("CARGO_PKG_VERSION"));

    let opts = GlobalOpts {
        config_path: cli.config,
        state_path: cli.state,
    };

    match cli.command {
        Commands::Ask { question, format } => cli::ask::handle(question, format, &opts).await,
        Commands::Feedback {
            session_id,
            rating,
            comments,
            accuracy,
            clarity,
            completeness,
            format,
        } => {
            let scores = Scores {
                accuracy,
                clarity,
                completeness,
            };
            cli::feedback::handle(session_id, rating, comments, scores, format, &opts).await
        }
        Commands::Insights { format } => cli::insights::handle(format, &opts).await,
        Commands::Kb { action } => cli::kb::handle(action, &opts).await,
        Commands::Config { action } => cli::config::handle(action, &opts).await,
    }
}
