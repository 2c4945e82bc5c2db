//! Claim Ally command-line entry point

use claim_ally::config::AppConfig;
use claim_ally::observability::init_default_logging;
use claim_ally::session::Session;
use claim_ally::ClaimAlly;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATHS: [&str; 2] = ["claim-ally.toml", "config/claim-ally.toml"];

/// Insurance claim appeal assistant
#[derive(Parser)]
#[command(name = "claim-ally")]
#[command(about = "Check appeal eligibility and draft appeal letters for denied insurance claims")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "CLAIM_ALLY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the appeal assistant
    Chat,
    /// Check whether a denial is still within the appeal window
    Check {
        /// Date of denial, YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// Draft an appeal letter without the conversation
    Draft {
        /// Date of denial, YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        policy_id: String,
        /// Reason the claim was denied
        #[arg(long)]
        reason: String,
    },
    /// Validate configuration
    Config {
        /// Print the resolved configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to read .env file: {e}");
        }
    }

    let cli = Cli::parse();
    init_default_logging();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Chat => run_chat(config).await,
        Commands::Check { date } => run_check(config, &date),
        Commands::Draft {
            date,
            policy_id,
            reason,
        } => run_draft(config, &date, &policy_id, &reason).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }
}

fn load_configuration(config_path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(AppConfig::load_from_file(path)?);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(AppConfig::load_from_file(path)?);
        }
    }

    info!("No configuration file found; using built-in defaults");
    Ok(AppConfig::default())
}

fn build_app(config: AppConfig) -> Result<ClaimAlly, Box<dyn std::error::Error>> {
    Ok(ClaimAlly::from_config(config)?)
}

async fn run_chat(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_app(config)?;
    let mut session = Session::new();
    info!(session_id = %session.id, "Chat session started");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"Claim Ally: tell me about the claim you want to appeal (\"exit\" to quit).\n")
        .await?;

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match app.chat_turn(&mut session, line).await {
            Ok(reply) => {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                let message = format!("Sorry, something went wrong: {}\n", e.user_message());
                stdout.write_all(message.as_bytes()).await?;
            }
        }
    }

    info!(session_id = %session.id, turns = session.history.len(), "Chat session ended");
    Ok(())
}

fn run_check(config: AppConfig, date: &str) -> Result<(), Box<dyn std::error::Error>> {
    let checker = claim_ally::EligibilityChecker::new(
        config.eligibility.appeal_window_days,
        std::sync::Arc::new(claim_ally::eligibility::SystemClock),
    );
    let result = checker.check(date);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_draft(
    config: AppConfig,
    date: &str,
    policy_id: &str,
    reason: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_app(config)?;
    let draft = app.draft_letter(date, policy_id, reason).await?;
    println!("{}", draft.letter);
    Ok(())
}

fn handle_config_command(config: &AppConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    info!("Configuration is valid");

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }

    let credentials = config.check_credentials();
    let search = config.tools.web_search.enabled && config.get_search_api_key().is_some();
    println!("provider: {} ({})", config.llm.provider, config.llm.model);
    println!(
        "credentials: {}",
        if credentials { "found" } else { "missing" }
    );
    println!("web search: {}", if search { "enabled" } else { "disabled" });
    Ok(())
}
