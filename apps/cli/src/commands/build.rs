//! Build command implementation.

use colored::Colorize;
use serde::Serialize;
use strand_data::{assemble, dataset_fingerprint, AssembledDataset, Dataset, DatasetConfig, TaskDataset};

const SLOT_NAMES: [&str; 3] = ["train", "val", "test"];

#[derive(Debug, Serialize)]
struct SlotReport {
    name: &'static str,
    kind: &'static str,
    records: usize,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct BuildReport {
    records: usize,
    sources: usize,
    fingerprint: String,
    tokenizer: String,
    vocab_size: usize,
    task: String,
    /// `None` marks an absent slot.
    slots: Vec<Option<SlotReport>>,
}

fn slot_report(name: &'static str, dataset: &TaskDataset) -> SlotReport {
    SlotReport { name, kind: dataset.kind(), records: dataset.num_records(), samples: dataset.len() }
}

/// Execute the build command.
///
/// Runs the full pipeline and reports the resulting slots.
pub fn execute(config: &DatasetConfig, json_output: bool) -> anyhow::Result<()> {
    let registry = config.registry();
    let assembly = assemble(config, &registry, None)?;

    let slots = match &assembly.dataset {
        AssembledDataset::Single(ds) => vec![Some(slot_report("all", ds))],
        AssembledDataset::Split(slots) => slots
            .iter()
            .zip(SLOT_NAMES)
            .map(|(slot, name)| slot.as_ref().map(|ds| slot_report(name, ds)))
            .collect(),
    };

    let report = BuildReport {
        records: assembly.combined.len(),
        sources: assembly.combined.num_sources(),
        fingerprint: dataset_fingerprint(assembly.combined.as_ref())?.to_string(),
        tokenizer: assembly.tokenizer.name().to_string(),
        vocab_size: assembly.tokenizer.vocab_size(),
        task: config.task_type()?.to_string(),
        slots,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Dataset built".bold().cyan());
    println!();
    println!("  Sources: {} ({} records)", report.sources, report.records.to_string().green());
    println!("  Fingerprint: {}", report.fingerprint.dimmed());
    println!("  Tokenizer: {} (vocab {})", report.tokenizer, report.vocab_size);
    println!("  Task: {}", report.task);
    println!();
    println!("{}", "Slots:".bold());
    for (idx, slot) in report.slots.iter().enumerate() {
        match slot {
            Some(slot) => println!(
                "  {}: {} records, {} samples ({})",
                slot.name.cyan(),
                slot.records,
                slot.samples,
                slot.kind
            ),
            None => println!("  {}: {}", SLOT_NAMES[idx].cyan(), "absent".yellow()),
        }
    }

    Ok(())
}
