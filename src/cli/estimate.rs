//! Estimate command - score user stories and log the predictions

use super::AppContext;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use storypoint::{Confidence, EstimationResult, EstimatorError, StoryPoints};
use tracing::info;

/// What the command reports for one story
#[derive(Debug, Serialize)]
struct PredictionOutput<'a> {
    /// None when run with --no-record
    id: Option<String>,
    user_story: &'a str,
    predicted_story_points: StoryPoints,
    raw_prediction: f64,
    model_used: String,
    confidence: Confidence,
    created_at: DateTime<Utc>,
}

/// Reject stories that are blank or shorter than `min_len` after trimming
fn validate_story(story: &str, min_len: usize) -> Result<()> {
    let trimmed = story.trim();
    if trimmed.is_empty() {
        anyhow::bail!("User story must not be empty");
    }
    if trimmed.chars().count() < min_len {
        anyhow::bail!(
            "User story is too short ({} characters, minimum {}): {:?}",
            trimmed.chars().count(),
            min_len,
            trimmed
        );
    }
    Ok(())
}

pub fn run(ctx: &AppContext, stories: &[String], json: bool, record: bool) -> Result<()> {
    let min_len = ctx.settings.input.min_story_length;
    for story in stories {
        validate_story(story, min_len)?;
    }

    let estimator = ctx.estimator();
    let results: Vec<Result<EstimationResult, EstimatorError>> = match stories {
        [single] => vec![estimator.estimate(single)],
        _ => estimator.estimate_batch(stories),
    };

    let store = if record { Some(ctx.open_store()?) } else { None };

    let mut outputs = Vec::with_capacity(stories.len());
    for (story, result) in stories.iter().zip(results) {
        let result = result.context("Prediction failed")?;

        // Recorded predictions report the timestamp that was logged
        let (id, created_at) = match &store {
            Some(store) => {
                let record = store
                    .record_prediction(
                        story,
                        result.predicted_points,
                        result.confidence,
                        &result.model_used,
                    )
                    .context("Failed to record prediction")?;
                (Some(record.id), record.timestamp)
            }
            None => (None, Utc::now()),
        };

        info!(
            "Prediction success ({}): {} points",
            id.as_deref().unwrap_or("unrecorded"),
            result.predicted_points
        );

        outputs.push(PredictionOutput {
            id,
            user_story: story,
            predicted_story_points: result.predicted_points,
            raw_prediction: result.raw_prediction,
            model_used: result.model_used,
            confidence: result.confidence,
            created_at,
        });
    }

    if json {
        let rendered = match outputs.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(&outputs)?,
        };
        println!("{}", rendered);
        return Ok(());
    }

    for output in &outputs {
        print_prediction(output);
    }
    Ok(())
}

fn print_prediction(output: &PredictionOutput<'_>) {
    let confidence = match output.confidence {
        Confidence::High => style(output.confidence.to_string()).green(),
        Confidence::Medium => style(output.confidence.to_string()).yellow(),
        Confidence::Low => style(output.confidence.to_string()).red(),
    };

    println!("\n{}", style(output.user_story).bold());
    println!(
        "  {} {} points (raw {:.2}, {} confidence)",
        style("→").cyan(),
        style(output.predicted_story_points).bold(),
        output.raw_prediction,
        confidence
    );
    println!("  Model: {}", style(&output.model_used).dim());
    println!(
        "  At:    {}",
        style(output.created_at.format("%Y-%m-%d %H:%M:%S UTC")).dim()
    );
    if let Some(id) = &output.id {
        println!("  Id:    {}", style(id).dim());
    }
}
