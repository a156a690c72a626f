use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use docdialog::api;
use docdialog::commands::CommandHandler;
use docdialog::config::AppConfig;
use docdialog::document::DocumentExtractor;
use docdialog::llm::Generator;
use docdialog::pipeline::CorpusPipeline;
use docdialog::providers::build_provider;
use dotenv::dotenv;
use log::{error, info};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    api_key: Option<String>,

    /// gemini, openai or deepseek
    #[arg(long)]
    provider: Option<String>,

    /// Serve the HTTP API instead of the terminal session
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "3000")]
    port: u16,

    #[arg(long)]
    session_capacity: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    colored::control::set_override(true);
    dotenv().ok();

    let args = Args::parse();

    if args.api {
        tracing_subscriber::fmt().init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut config = AppConfig::from_env()?;
    if let Some(name) = &args.provider {
        config = config.with_provider(name.parse()?);
    }
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(capacity) = args.session_capacity {
        config.session_capacity = capacity;
    }

    let generator = build_generator(&config).await;
    let extractor = Arc::new(DocumentExtractor::from_config(&config.extraction));
    let pipeline = CorpusPipeline::new(generator, extractor);

    if args.api {
        run_api_server(pipeline, &config, args.port).await
    } else {
        run_cli_mode(pipeline).await
    }
}

/// A missing or broken backend is reported here, once; the app still
/// starts and every generation yields the not-initialized placeholder.
async fn build_generator(config: &AppConfig) -> Generator {
    let api_key = match config.credential() {
        Ok(key) => key.to_string(),
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.to_string().red());
            return Generator::unavailable();
        }
    };

    match build_provider(config.provider, api_key, config.provider_config.clone()).await {
        Ok(provider) => {
            info!(
                "Using {} with model {}",
                provider.provider_name(),
                config.provider_config.model
            );
            Generator::new(provider, config.provider_config.timeout)
        }
        Err(e) => {
            error!("Failed to initialize {} provider: {}", config.provider, e);
            eprintln!(
                "{}",
                format!("Failed to initialize {} provider: {}", config.provider, e).red()
            );
            Generator::unavailable()
        }
    }
}

async fn run_cli_mode(pipeline: CorpusPipeline) -> Result<()> {
    let mut command_handler = CommandHandler::new(pipeline);

    // Show initial help menu
    if let Err(e) = command_handler.handle_command("help").await {
        println!("{}", e.red());
    }

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                if let Err(e) = command_handler.handle_command(input).await {
                    println!("{}", e.red());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(pipeline: CorpusPipeline, config: &AppConfig, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = api::create_api(pipeline, config.session_capacity);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, sessions = config.session_capacity, "API server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
