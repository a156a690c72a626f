use colored::Colorize;

use crate::pipeline::CorpusPipeline;

pub fn handle_command(input: &str, pipeline: &CorpusPipeline) -> Result<(), String> {
    match input.to_lowercase().as_str() {
        "help" => {
            let backend = if pipeline.generator().is_available() {
                pipeline.generator().provider_name().green()
            } else {
                "not initialized".red()
            };
            println!("\n🤖 Generation backend: {}", backend);
            println!();

            println!("📄 Document Commands:");
            println!("  upload <path>...   - Add PDF, DOCX, TXT, PNG or JPG files");
            println!("  docs               - List ingested documents");
            println!("  summaries          - Show the summary of every document");
            println!("  compare            - Show pairwise document comparisons");
            println!();

            println!("💬 Question Commands:");
            println!("  ask <question>     - Ask about the uploaded documents");
            println!("  ask                - Submit the picked suggestion");
            println!("  suggestions        - Show suggested questions");
            println!("  pick <n>           - Use suggestion n as the next question");
            println!("  history            - Show the conversation");
            println!("  history save <file>, history load <file>");
            println!("  Any other text is asked as a question.");
            println!();

            println!("⚙️ System Commands:");
            println!("  reset  - Clear all documents and the conversation");
            println!("  help   - Show this help menu");
            println!("  exit   - Exit the program");
            Ok(())
        }
        "exit" | "quit" => {
            println!("👋 Goodbye!");
            std::process::exit(0);
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}
