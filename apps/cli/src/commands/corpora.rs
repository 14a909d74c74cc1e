//! Corpora command implementation.

use colored::Colorize;
use serde_json::json;
use strand_data::{DatasetConfig, LazyCache};

/// Execute the corpora command.
pub fn execute(config: &DatasetConfig, json_output: bool) -> anyhow::Result<()> {
    let registry = config.registry();

    if json_output {
        let corpora: Vec<_> = registry
            .names()
            .filter_map(|name| registry.get(name))
            .map(|corpus| {
                json!({
                    "name": corpus.name(),
                    "path": corpus.path().display().to_string(),
                    "cached": LazyCache::exists(corpus.path()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&corpora)?);
        return Ok(());
    }

    if registry.is_empty() {
        println!("{}", "No corpora registered".yellow());
        println!("  {}", "Add [corpora.<name>] tables with a `path` to the config file".dimmed());
        return Ok(());
    }

    println!("{}", "Corpora:".bold());
    for name in registry.names() {
        let Some(corpus) = registry.get(name) else { continue };
        let cached = if LazyCache::exists(corpus.path()) { "cached".green() } else { "not cached".dimmed() };
        println!("  {}: {} [{}]", name.cyan(), corpus.path().display(), cached);
    }
    Ok(())
}
