//! CLI command definitions and handlers

mod estimate;
mod feedback;
mod history;
mod init;
mod train;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use storypoint::config::Settings;
use storypoint::{Estimator, ModelLoader, RecordStore, StoryPoints};
use tracing::error;

/// Parse a value that must be on the story point scale
fn parse_points(s: &str) -> Result<u32, String> {
    let n: u32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    StoryPoints::try_from(n).map(u32::from)
}

/// storypoint - Agile story point estimation
///
/// 100% LOCAL - models, history and feedback stay on your machine.
#[derive(Parser, Debug)]
#[command(name = "storypoint")]
#[command(
    version,
    about = "Estimate Agile story points for user stories and keep an auditable feedback log",
    after_help = "\
Examples:
  storypoint train                                   Train the model on the seed stories
  storypoint estimate \"As a user, I want to reset my password\"
  storypoint estimate --json \"story one\" \"story two\"
  storypoint feedback <PREDICTION_ID> --story \"...\" --actual 5
  storypoint history --limit 20"
)]
pub struct Cli {
    /// Project root holding storypoint.toml (default: current directory)
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        env = "LOG_LEVEL",
        ignore_case = true,
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// Gradient boosted trees
    Gbdt,
    /// Ridge regression
    Linear,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create storypoint.toml and the data directory
    Init,

    /// Estimate story points for one or more user stories
    Estimate {
        /// User story text (several stories are estimated in parallel)
        #[arg(required = true)]
        stories: Vec<String>,

        /// Output JSON for scripting
        #[arg(long)]
        json: bool,

        /// Do not append the prediction to the history log
        #[arg(long)]
        no_record: bool,
    },

    /// Record the correct story points for an earlier prediction
    Feedback {
        /// Id printed by `estimate` (not checked against the history)
        prediction_id: String,

        /// Original story text
        #[arg(long)]
        story: String,

        /// Correct story points (1, 2, 3, 5, 8 or 13)
        #[arg(long, value_parser = parse_points)]
        actual: u32,
    },

    /// Show recent predictions, newest first
    History {
        /// Number of predictions to show (default: store.history_limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Output JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Delete all prediction history (feedback is kept)
    ClearHistory {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Train the model from seed stories and recorded feedback
    Train {
        /// Regressor to fit
        #[arg(long, value_enum, default_value = "gbdt")]
        algorithm: AlgorithmArg,

        /// Boosting iterations (gbdt)
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Maximum tree depth (gbdt)
        #[arg(long, default_value = "6")]
        max_depth: u32,

        /// Shrinkage per tree (gbdt)
        #[arg(long, default_value = "0.1")]
        learning_rate: f64,

        /// Ridge penalty (linear)
        #[arg(long, default_value = "1.0")]
        alpha: f64,

        /// Vocabulary size cap
        #[arg(long, default_value = "1000")]
        max_features: usize,

        /// Train on the seed stories only
        #[arg(long)]
        no_feedback: bool,

        /// Show feedback statistics instead of training
        #[arg(long)]
        stats: bool,
    },

    /// Show version info
    Version,
}

/// Objects shared by a command. Built once per process.
pub struct AppContext {
    pub root: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    pub fn new(root: PathBuf) -> Self {
        let settings = Settings::load(&root);
        Self { root, settings }
    }

    /// Load the model artifacts. A load failure is logged, not returned:
    /// estimates then fail with `ModelNotLoaded`.
    pub fn estimator(&self) -> Estimator {
        let loader = Arc::new(ModelLoader::new());
        if let Err(e) = loader.load(
            &self.settings.model.vectorizer_path,
            &self.settings.model.model_path,
        ) {
            error!(
                "Failed to load ML models: {}. Run `storypoint train` to create them.",
                e
            );
        }
        Estimator::new(loader)
    }

    pub fn open_store(&self) -> Result<RecordStore> {
        let data_dir = &self.settings.store.data_dir;
        RecordStore::open(data_dir)
            .with_context(|| format!("Failed to open record store at {}", data_dir.display()))
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::new(cli.root);

    match cli.command {
        Commands::Init => init::run(&ctx),

        Commands::Estimate {
            stories,
            json,
            no_record,
        } => estimate::run(&ctx, &stories, json, !no_record),

        Commands::Feedback {
            prediction_id,
            story,
            actual,
        } => feedback::run(&ctx, &prediction_id, &story, actual),

        Commands::History { limit, json } => {
            let limit = limit.unwrap_or(ctx.settings.store.history_limit);
            history::run(&ctx, limit, json)
        }

        Commands::ClearHistory { yes } => history::clear(&ctx, yes),

        Commands::Train {
            algorithm,
            trees,
            max_depth,
            learning_rate,
            alpha,
            max_features,
            no_feedback,
            stats,
        } => {
            if stats {
                return train::stats(&ctx);
            }
            let options = train::TrainOptions {
                algorithm,
                trees,
                max_depth,
                learning_rate,
                alpha,
                max_features,
                include_feedback: !no_feedback,
            };
            train::run(&ctx, &options)
        }

        Commands::Version => {
            println!("storypoint {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points("8"), Ok(8));
        assert_eq!(parse_points(" 13 "), Ok(13));
        assert!(parse_points("4").unwrap_err().contains("scale"));
        assert!(parse_points("lots").unwrap_err().contains("not a valid number"));
    }

    #[test]
    fn test_estimate_requires_a_story() {
        assert!(Cli::try_parse_from(["storypoint", "estimate"]).is_err());
        let cli = Cli::try_parse_from(["storypoint", "estimate", "--json", "a story"]).unwrap();
        match cli.command {
            Commands::Estimate { stories, json, no_record } => {
                assert_eq!(stories, vec!["a story".to_string()]);
                assert!(json);
                assert!(!no_record);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_feedback_rejects_off_scale_points() {
        let parsed = Cli::try_parse_from([
            "storypoint", "feedback", "abc", "--story", "text", "--actual", "4",
        ]);
        assert!(parsed.is_err());
    }
}
