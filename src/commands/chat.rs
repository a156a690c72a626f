use colored::Colorize;
use serde_json::Value;

use super::{print_block, spinner};
use crate::pipeline::CorpusPipeline;
use crate::session::{Session, Speaker};

pub fn show_suggestions(session: &Session) -> Result<(), String> {
    if session.suggestions().is_empty() {
        println!("No suggestions yet.");
        return Ok(());
    }
    println!("\n💡 Suggested Questions:");
    for (i, suggestion) in session.suggestions().iter().enumerate() {
        println!("  {}. {}", (i + 1).to_string().cyan(), suggestion);
    }
    println!("\nUse 'pick <n>' then 'ask' to submit one.");
    Ok(())
}

/// `pick` is one-based on the command line.
pub fn pick(pipeline: &CorpusPipeline, session: &mut Session, args: &str) -> Result<(), String> {
    let position: usize = args
        .parse()
        .map_err(|_| "Usage: pick <n>".to_string())?;
    let index = position
        .checked_sub(1)
        .ok_or_else(|| "Suggestions are numbered from 1".to_string())?;

    let question = pipeline
        .select_suggestion(session, index)
        .map_err(|e| e.to_string())?;
    println!("❓ Next question: {}", question.bright_yellow());
    println!("Type 'ask' to submit it or type your own question.");
    Ok(())
}

pub async fn ask(pipeline: &CorpusPipeline, session: &mut Session, text: &str) -> Result<(), String> {
    if !text.is_empty() {
        pipeline.set_pending_question(session, text);
    }
    let question = session.pending_question().to_string();

    let pb = spinner("Thinking".to_string());
    let result = pipeline.ask(session, &question).await;
    pb.finish_and_clear();

    let answer = result.map_err(|e| e.to_string())?;
    print_block("💬 Answer:", &answer);

    if !session.suggestions().is_empty() {
        println!();
        show_suggestions(session)?;
    }
    Ok(())
}

pub async fn history(session: &mut Session, args: &str) -> Result<(), String> {
    let (action, path) = match args.split_once(char::is_whitespace) {
        Some((action, path)) => (action, path.trim()),
        None => (args, ""),
    };

    match action {
        "" => {
            if session.chat_history().is_empty() {
                println!("No conversation yet.");
            }
            for turn in session.chat_history() {
                match turn.speaker {
                    Speaker::User => println!("\n👤 {}", turn.message.bright_yellow()),
                    Speaker::Assistant => println!("🤖 {}", turn.message.truecolor(255, 236, 179)),
                }
            }
            Ok(())
        }
        "save" if !path.is_empty() => {
            let json = serde_json::to_string_pretty(&session.transcript())
                .map_err(|e| format!("Failed to serialize history: {}", e))?;
            tokio::fs::write(path, json)
                .await
                .map_err(|e| format!("Failed to write {}: {}", path, e))?;
            println!("💾 Saved {} entries to {}", session.chat_history().len(), path.bright_yellow());
            Ok(())
        }
        "load" if !path.is_empty() => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| format!("Failed to read {}: {}", path, e))?;
            let entries: Vec<Value> =
                serde_json::from_str(&raw).map_err(|e| format!("Invalid history file: {}", e))?;

            let rejected = session.import_transcript(&entries);
            for problem in &rejected {
                println!("⚠️  {}", problem.to_string().red());
            }
            println!(
                "📂 Loaded {} entries ({} skipped)",
                entries.len() - rejected.len(),
                rejected.len()
            );
            Ok(())
        }
        _ => Err("Usage: history [save <file> | load <file>]".to_string()),
    }
}
