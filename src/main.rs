use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::{Level, info};

use waav_voice_chat::{
    RouterEvent, SessionConfig, VoiceSession,
    config::DisplayConfig,
    core::emotion::EmotionReferences,
    core::session::{render_system_prompt, should_exit},
};

/// WaaV Voice Chat - emotion-tagged streaming speech for LLM replies
#[derive(Parser, Debug)]
#[command(name = "waav-voice-chat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat (default)
    Run,

    /// List the emotions found in the reference directory
    Emotions,

    /// Print the rendered system prompt
    Prompt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        SessionConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        SessionConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    let level = if cli.debug || config.display.debug {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Some(config_path) = &cli.config {
        info!("Loaded configuration from {}", config_path.display());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Emotions => {
            let references = EmotionReferences::load(&config.tts.references_dir)?;
            for emotion in references.emotions() {
                println!("{emotion}");
            }
            Ok(())
        }
        Commands::Prompt => {
            let references = EmotionReferences::load(&config.tts.references_dir)?;
            println!(
                "{}",
                render_system_prompt(&config.chat, references.emotions())
            );
            Ok(())
        }
        Commands::Run => chat(config).await,
    }
}

async fn chat(config: SessionConfig) -> anyhow::Result<()> {
    let display = config.display.clone();
    let user = config.chat.user.clone();
    let assistant = config.chat.char.clone();

    let mut session = VoiceSession::start(config).await?;
    println!("Type a message, or 'exit' to quit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{user}: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let text = line?;
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if should_exit(text) {
            break;
        }

        print!("{assistant}: ");
        io::stdout().flush()?;
        session
            .run_turn(text, |event| print_event(&display, event))
            .await?;
        println!();
    }

    session.shutdown().await?;
    Ok(())
}

fn print_event(display: &DisplayConfig, event: &RouterEvent) {
    match event {
        RouterEvent::Emotion(emotion) if display.print_emotions => print!("[{emotion}] "),
        RouterEvent::Text(text) if display.print_llm_text => print!("{text}"),
        _ => return,
    }
    let _ = io::stdout().flush();
}
