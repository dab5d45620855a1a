//! CLI command for loading JT files and printing what was found

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use console::style;
use rayon::prelude::*;

use crate::cli::progress::{self, CUBE, LOOKING_GLASS};
use crate::import::{ImportOptions, JtDocument, JtImporter, LoadProgress, Severity};

pub fn execute(files: &[PathBuf], options: &ImportOptions, json: bool, quiet: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    if !quiet {
        progress::print_step(1, 2, LOOKING_GLASS, &format!("Loading {} file(s)...", files.len()));
    }

    let mp = progress::multi_progress(quiet);
    // Every load owns its importer and context
    let results: Vec<(&PathBuf, crate::Result<JtDocument>)> = files
        .par_iter()
        .map(|path| {
            let total = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            let pb = progress::add_file_bar(&mp, total, &path.display().to_string());
            let callback = |p: &LoadProgress| progress::update_bar(&pb, p);
            let result = JtImporter::new(options.clone())
                .with_progress(&callback)
                .import_file(path);
            pb.finish_and_clear();
            (path, result)
        })
        .collect();

    if !quiet {
        progress::print_step(2, 2, CUBE, "Summarizing...");
    }

    let mut failed = 0;
    let mut summaries = Vec::new();
    for (path, result) in &results {
        match result {
            Ok(document) if json => summaries.push(document.summary()),
            Ok(document) => print_document(path, document),
            Err(err) => {
                failed += 1;
                eprintln!("{} {}: {err}", style("error:").red().bold(), path.display());
            }
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&summaries).context("serializing summary")?;
        println!("{out}");
    }
    if !quiet {
        progress::print_done(started.elapsed());
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} file(s) failed to load", files.len());
    }
    Ok(())
}

fn print_document(path: &Path, document: &JtDocument) {
    let model = &document.model;
    println!("{}", style(path.display()).bold());
    println!("  Version: {}", document.version);
    if !document.comment.is_empty() {
        println!("  Comment: {}", document.comment);
    }
    println!(
        "  Scene graph: {} nodes, {}",
        document.scene.len(),
        if document.is_monolithic() { "monolithic" } else { "with sub partitions" }
    );

    for (label, value) in model.model_information() {
        println!("  {label}: {value}");
    }
    if let Some([min, max]) = model.extreme_values() {
        println!(
            "  Bounds: [{:.3}, {:.3}, {:.3}] - [{:.3}, {:.3}, {:.3}]{}",
            min[0],
            min[1],
            min[2],
            max[0],
            max[1],
            max[2],
            if document.is_2d() { " (2D)" } else { "" }
        );
    }

    if !model.layers().is_empty() {
        println!("  Layers:");
        for (layer, batches) in model.triangles() {
            let triangles: usize = batches.iter().map(|b| b.triangle_count()).sum();
            println!("    {layer}: {triangles} triangles");
        }
    }

    if !model.external_references().is_empty() {
        println!("  External references:");
        for reference in model.external_references() {
            let status = if reference.resolved {
                style("resolved").green()
            } else {
                style("missing").red()
            };
            println!("    {} ({status})", reference.file_name);
        }
    }

    if !document.unsupported_entities.is_empty() {
        println!("  Unsupported entities:");
        for entity in &document.unsupported_entities {
            println!("    {entity}");
        }
    }

    if !document.load_information.is_empty() {
        println!("  Load information:");
        for info in &document.load_information {
            let severity = match info.severity {
                Severity::Info => style(info.severity.as_str()).dim(),
                Severity::Warning => style(info.severity.as_str()).yellow(),
                Severity::Error => style(info.severity.as_str()).red(),
            };
            println!("    {severity}: {}", info.message);
        }
    }
    println!();
}
