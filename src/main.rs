//! Studio Consultant CLI
//!
//! - `chat` runs a terminal conversation with the studio consultant
//! - `enhance` polishes a portfolio video description
//! - `config` prints the resolved configuration with secrets redacted

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use studio_consultant::adapters::ai::GeminiGateway;
use studio_consultant::application::{
    ConversationSession, DescriptionEnhancer, SubmitOutcome, Surface, SurfaceProfile,
};
use studio_consultant::config::{AppConfig, LogFormat, LoggingConfig};
use studio_consultant::ports::CompletionGateway;

const QUIT_COMMAND: &str = "/quit";

#[derive(Parser)]
#[command(name = "studio-consultant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the studio consultant (type /quit to leave)
    Chat {
        /// Chat surface whose opening line is used (widget or panel)
        #[arg(long, default_value = "widget")]
        surface: Surface,
    },

    /// Enhance a video description for the portfolio
    Enhance {
        /// Raw description text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Chat { surface } => run_chat(&config, surface).await,
        Commands::Enhance { text } => run_enhance(&config, &text.join(" ")).await,
        Commands::Config => {
            print_config(&config);
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout carries only the conversation.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_target(false).init(),
    }
}

fn build_gateway(config: &AppConfig) -> Result<Arc<dyn CompletionGateway>> {
    config.validate().context("invalid configuration")?;
    let gateway_config = config
        .ai
        .gateway_config()
        .context("GEMINI_API_KEY is not set")?;
    let gateway = GeminiGateway::new(gateway_config).context("failed to build Gemini client")?;
    Ok(Arc::new(gateway))
}

async fn run_chat(config: &AppConfig, surface: Surface) -> Result<()> {
    let gateway = build_gateway(config)?;
    let profile = SurfaceProfile::for_surface(surface).with_params(config.ai.chat_params());
    let session = ConversationSession::for_surface(profile, gateway)?
        .with_exchange_timeout(config.chat.timeout())
        .with_history_window(config.chat.max_history_turns);

    info!(session_id = %session.id(), %surface, "Chat started");
    if let Some(opening) = session.transcript().first() {
        println!("{}\n", opening.text());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == QUIT_COMMAND {
            break;
        }

        tokio::select! {
            outcome = session.submit(&line) => match outcome {
                SubmitOutcome::Rejected(_) => continue,
                SubmitOutcome::Replied(turn) | SubmitOutcome::Fallback(turn) => {
                    println!("\n{}\n", turn.text());
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    info!(
        session_id = %session.id(),
        turns = session.transcript().len(),
        "Chat ended"
    );
    Ok(())
}

async fn run_enhance(config: &AppConfig, raw_text: &str) -> Result<()> {
    let gateway = build_gateway(config)?;
    let enhancer = DescriptionEnhancer::new(gateway);

    match enhancer.enhance(raw_text).await {
        Some(text) => println!("{text}"),
        None => anyhow::bail!("nothing to enhance: description is blank"),
    }
    Ok(())
}

fn print_config(config: &AppConfig) {
    let key = if config.ai.has_gemini() {
        "[REDACTED]"
    } else {
        "(unset)"
    };
    let window = config
        .chat
        .max_history_turns
        .map_or_else(|| "all".to_string(), |n| n.to_string());

    println!("ai.gemini_api_key          {key}");
    println!("ai.base_url                {}", config.ai.base_url);
    println!("ai.chat_model              {}", config.ai.chat_model);
    println!("ai.enhance_model           {}", config.ai.enhance_model);
    println!("ai.temperature             {}", config.ai.temperature);
    println!("ai.thinking_budget         {}", config.ai.thinking_budget);
    println!("chat.exchange_timeout_secs {}", config.chat.exchange_timeout_secs);
    println!("chat.max_history_turns     {window}");
    println!("logging.level              {}", config.logging.level);
    println!("logging.format             {:?}", config.logging.format);
}
