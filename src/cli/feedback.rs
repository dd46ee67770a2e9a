//! Feedback command - record a human correction

use super::AppContext;
use anyhow::{Context, Result};
use console::style;
use tracing::info;

pub fn run(ctx: &AppContext, prediction_id: &str, story: &str, actual: u32) -> Result<()> {
    if prediction_id.trim().is_empty() {
        anyhow::bail!("Prediction id must not be empty");
    }
    if story.trim().is_empty() {
        anyhow::bail!("User story must not be empty");
    }

    let store = ctx.open_store()?;
    let feedback_id = store
        .append_feedback(prediction_id, story, actual)
        .context("Failed to record feedback")?;
    info!("Feedback {} recorded for prediction {}", feedback_id, prediction_id);

    println!(
        "{} Recorded {} points for prediction {}",
        style("✓").green(),
        style(actual).bold(),
        style(prediction_id).cyan()
    );
    println!("  Feedback id: {}", style(&feedback_id).dim());
    println!(
        "  {}",
        style("Run `storypoint train` to include corrections in the model.").dim()
    );
    Ok(())
}
