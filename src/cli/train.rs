//! Train command - fit the vectorizer and regressor

use super::{AlgorithmArg, AppContext};
use anyhow::{Context, Result};
use console::style;
use storypoint::estimator::{train, Algorithm, GbdtParams, TrainConfig};
use tracing::warn;

/// Command-line training knobs
pub struct TrainOptions {
    pub algorithm: AlgorithmArg,
    pub trees: usize,
    pub max_depth: u32,
    pub learning_rate: f64,
    pub alpha: f64,
    pub max_features: usize,
    pub include_feedback: bool,
}

impl TrainOptions {
    fn to_config(&self, ctx: &AppContext) -> TrainConfig {
        TrainConfig {
            vectorizer_path: ctx.settings.model.vectorizer_path.clone(),
            model_path: ctx.settings.model.model_path.clone(),
            max_features: self.max_features,
            algorithm: match self.algorithm {
                AlgorithmArg::Gbdt => Algorithm::GradientBoosting,
                AlgorithmArg::Linear => Algorithm::Ridge,
            },
            gbdt: GbdtParams {
                trees: self.trees,
                max_depth: self.max_depth,
                learning_rate: self.learning_rate,
            },
            alpha: self.alpha,
            include_feedback: self.include_feedback,
        }
    }
}

pub fn run(ctx: &AppContext, options: &TrainOptions) -> Result<()> {
    if options.max_features == 0 {
        anyhow::bail!("--max-features must be at least 1");
    }
    if options.trees == 0 {
        anyhow::bail!("--trees must be at least 1");
    }

    let config = options.to_config(ctx);

    let feedback = if config.include_feedback {
        let store = ctx.open_store()?;
        let records = store.feedback_records().context("Failed to read feedback log")?;
        let (usable, skipped): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| storypoint::StoryPoints::try_from(r.actual_points).is_ok());
        if !skipped.is_empty() {
            warn!("Skipping {} feedback records with off-scale points", skipped.len());
        }
        usable
    } else {
        Vec::new()
    };

    println!("\n{} Training story point model\n", style("▶").bold());
    let result = train(&config, &feedback).context("Training failed")?;

    println!("  Samples:     {} ({} from feedback)", result.samples, result.feedback_samples);
    println!("  Vocabulary:  {} terms", result.vocabulary_size);
    println!("  Algorithm:   {}", style(result.algorithm).cyan());
    println!("  Train RMSE:  {:.3}", result.training_rmse);
    println!(
        "\n{} Wrote {} and {}",
        style("✓").green(),
        style(result.vectorizer_path.display()).cyan(),
        style(result.model_path.display()).cyan()
    );
    Ok(())
}

/// Print feedback log statistics
pub fn stats(ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.feedback_stats().context("Failed to read feedback log")?;
    if stats.total == 0 {
        println!("No feedback recorded yet. Use `storypoint feedback` to add corrections.");
        return Ok(());
    }
    print!("{}", stats);
    Ok(())
}
