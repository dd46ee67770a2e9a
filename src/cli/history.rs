//! History commands - list and clear logged predictions

use super::AppContext;
use anyhow::{Context, Result};
use console::style;
use storypoint::PredictionRecord;

/// Longest story prefix shown in the table
const STORY_PREVIEW_CHARS: usize = 60;

pub fn run(ctx: &AppContext, limit: usize, json: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let records = store.recent_predictions(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No predictions recorded yet. Run `storypoint estimate` first.");
        return Ok(());
    }

    println!(
        "\n{} ({} most recent)\n",
        style("Prediction history").bold(),
        records.len()
    );
    for record in &records {
        print_record(record);
    }
    Ok(())
}

fn print_record(record: &PredictionRecord) {
    println!(
        "  {} {:>2} pts  {:<6}  {}",
        style(record.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
        style(record.predicted_points).bold(),
        record.confidence.to_string(),
        preview(&record.user_story)
    );
    println!("    {} {}", style("id").dim(), style(&record.id).dim());
}

fn preview(story: &str) -> String {
    if story.chars().count() <= STORY_PREVIEW_CHARS {
        return story.to_string();
    }
    let cut: String = story.chars().take(STORY_PREVIEW_CHARS - 3).collect();
    format!("{}...", cut)
}

pub fn clear(ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to clear prediction history without --yes");
    }
    let store = ctx.open_store()?;
    store
        .clear_predictions()
        .context("Failed to clear prediction history")?;
    println!(
        "{} Cleared prediction history at {}",
        style("✓").green(),
        style(store.history_path().display()).cyan()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_long_stories() {
        assert_eq!(preview("short story"), "short story");
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), STORY_PREVIEW_CHARS);
        assert!(shown.ends_with("..."));
    }
}
