//! Cache command implementation.

use colored::Colorize;
use serde_json::json;
use strand_data::lazy::LazyLayout;
use strand_data::{CacheStatus, Dataset, DatasetConfig, LazyCache};

/// Execute the cache command.
///
/// Materializes the lazy cache of the named corpus, parsing it only when the
/// cache does not exist yet.
pub fn execute(config: &DatasetConfig, name: &str, json_output: bool) -> anyhow::Result<()> {
    let registry = config.registry();
    let Some(corpus) = registry.get(name) else {
        anyhow::bail!("corpus {name:?} is not registered in [corpora]");
    };

    let reader = config.reader_options();
    let materialized = LazyCache::new(config.load_mode).materialize(corpus.path(), || corpus.load(&reader))?;
    let cache_dir = LazyLayout::for_corpus_path(corpus.path()).root().to_path_buf();
    let records = materialized.dataset.len();

    if json_output {
        let output = json!({
            "corpus": name,
            "status": materialized.status,
            "records": records,
            "cache_dir": cache_dir.display().to_string(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let status = match materialized.status {
        CacheStatus::Created => "created".green(),
        CacheStatus::Reused => "reused".cyan(),
    };
    println!("{} {} ({} records)", "✓".green(), name.bold(), records);
    println!("  Cache: {} [{}]", cache_dir.display(), status);
    Ok(())
}
