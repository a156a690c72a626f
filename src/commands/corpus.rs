use colored::Colorize;
use log::warn;
use std::path::Path;

use super::{print_block, spinner};
use crate::pipeline::{BatchReport, CorpusPipeline, FileReport, IngestOutcome, UploadedFile};
use crate::session::Session;

/// Splits an argument line into paths. Single or double quotes group a
/// path that contains spaces.
pub(crate) fn split_paths(args: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for c in args.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    paths.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if in_token {
        paths.push(current);
    }
    paths
}

pub async fn upload(pipeline: &CorpusPipeline, session: &mut Session, args: &str) -> Result<(), String> {
    let paths = split_paths(args);
    if paths.is_empty() {
        return Err("Usage: upload <path>...".to_string());
    }

    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in &paths {
        let Some(name) = Path::new(path).file_name().map(|n| n.to_string_lossy().into_owned()) else {
            warn!("Skipping {}: not a file path", path);
            unreadable.push(FileReport {
                name: path.clone(),
                outcome: IngestOutcome::Failed {
                    reason: "Not a file".to_string(),
                },
            });
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => files.push(UploadedFile { name, bytes }),
            Err(e) => {
                warn!("Skipping {}: {}", path, e);
                unreadable.push(FileReport {
                    name,
                    outcome: IngestOutcome::Failed {
                        reason: format!("Failed to read {}: {}", path, e),
                    },
                });
            }
        }
    }

    let mut report = if files.is_empty() {
        BatchReport::default()
    } else {
        let pb = spinner(format!("Processing {} file(s)", files.len()));
        let report = pipeline.ingest_batch(session, files).await;
        pb.finish_and_clear();
        report
    };
    report.files.extend(unreadable);

    for file in &report.files {
        match &file.outcome {
            IngestOutcome::Added { kind, chars } => {
                println!("✅ {} ({}, {} chars)", file.name.bright_yellow(), kind, chars)
            }
            IngestOutcome::Duplicate => {
                println!("⏭️  {} already uploaded, skipped", file.name.bright_yellow())
            }
            IngestOutcome::Rejected { reason } => println!("❌ {}", reason.red()),
            IngestOutcome::Empty => println!(
                "⚠️  No text found in {}, it was not added",
                file.name.bright_yellow()
            ),
            IngestOutcome::Failed { reason } => {
                println!("⚠️  {}: {}", file.name.bright_yellow(), reason.red())
            }
        }
    }

    println!(
        "\n📊 {} new summaries | {} new comparisons",
        report.new_summaries.to_string().cyan(),
        report.new_comparisons.to_string().cyan()
    );
    if report.suggestions_refreshed && !session.suggestions().is_empty() {
        println!("💡 Suggested questions are ready, type 'suggestions' to see them.");
    }
    Ok(())
}

pub fn list_documents(session: &Session) -> Result<(), String> {
    if session.documents().is_empty() {
        println!("No documents uploaded yet.");
        return Ok(());
    }
    println!("\n📚 Documents:");
    for (name, doc) in session.documents().iter() {
        println!(
            "  • {} ({}, {} chars, added {})",
            name.bright_yellow(),
            doc.kind,
            doc.text.chars().count(),
            doc.ingested_at.format("%H:%M:%S")
        );
    }
    Ok(())
}

pub fn show_summaries(session: &Session) -> Result<(), String> {
    if session.summaries().is_empty() {
        println!("No summaries yet. Upload documents first.");
        return Ok(());
    }
    for (name, summary) in session.summaries().iter() {
        print_block(&format!("📋 Summary: {}", name), summary);
    }
    Ok(())
}

pub fn show_comparisons(session: &Session) -> Result<(), String> {
    if session.documents().len() < 2 {
        println!(
            "{}",
            "More than one document is required to perform document comparison.".bright_cyan()
        );
        return Ok(());
    }
    for (key, comparison) in session.comparisons().iter() {
        print_block(&format!("⚖️ Comparison: {}", key), comparison);
    }
    Ok(())
}
