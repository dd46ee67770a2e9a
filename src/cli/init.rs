//! Init command - write storypoint.toml and create the data directory

use super::AppContext;
use anyhow::{Context, Result};
use console::style;
use storypoint::config::init_config;

pub fn run(ctx: &AppContext) -> Result<()> {
    println!("\n{} Initializing storypoint\n", style("▶").bold());

    let (config_path, created) = init_config(&ctx.root)?;
    if created {
        println!("{} Created {}", style("✓").green(), style(config_path.display()).cyan());
    } else {
        println!(
            "{} Config already exists at {}",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
    }

    // Settings were read before the file existed; defaults match the example file
    let store = ctx.open_store()?;
    println!(
        "{} Data directory ready at {}",
        style("✓").green(),
        style(store.data_dir().display()).cyan()
    );

    let model_dir = ctx
        .settings
        .model
        .model_path
        .parent()
        .map(|p| p.to_path_buf());
    if let Some(dir) = model_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    println!("\n{}", style("Next steps:").bold());
    println!("  storypoint train");
    println!("  storypoint estimate \"As a user, I want to reset my password\"");
    Ok(())
}
