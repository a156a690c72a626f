use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::pipeline::CorpusPipeline;
use crate::session::Session;

mod chat;
mod corpus;
mod system;

/// Drives one terminal session: parses a command line and runs it against
/// the pipeline.
pub struct CommandHandler {
    pipeline: CorpusPipeline,
    session: Session,
}

impl CommandHandler {
    pub fn new(pipeline: CorpusPipeline) -> Self {
        Self {
            pipeline,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<(), String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "help" | "exit" | "quit" => system::handle_command(command, &self.pipeline),
            "upload" => corpus::upload(&self.pipeline, &mut self.session, rest).await,
            "summaries" => corpus::show_summaries(&self.session),
            "compare" | "comparisons" => corpus::show_comparisons(&self.session),
            "docs" => corpus::list_documents(&self.session),
            "suggestions" => chat::show_suggestions(&self.session),
            "pick" => chat::pick(&self.pipeline, &mut self.session, rest),
            "ask" => chat::ask(&self.pipeline, &mut self.session, rest).await,
            "history" => chat::history(&mut self.session, rest).await,
            "reset" => {
                self.pipeline.reset(&mut self.session);
                println!("🧹 Session cleared. Upload new documents to start again.");
                Ok(())
            }
            // Anything else is a typed question.
            _ => chat::ask(&self.pipeline, &mut self.session, input).await,
        }
    }
}

pub(crate) fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub(crate) fn print_block(title: &str, body: &str) {
    println!("\n{}", title.bright_cyan().bold());
    println!("{}", body.truecolor(255, 236, 179));
}
