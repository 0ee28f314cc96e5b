mod server;

use clap::{Parser, Subcommand};
use fiscus_core::config;
use fiscus_finance::{RateClient, StatementReader};
use fiscus_providers::Orchestrator;
use fiscus_store::Store;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fiscus", version, about = "Fiscus — personal finance assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and reminder loop.
    Serve,
    /// Check configuration and responder availability.
    Status,
    /// Send a one-shot message to the assistant.
    Ask {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
    /// Convert an amount between currencies using live rates.
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    /// Import a bank statement file into the store.
    Import {
        /// Path to a PDF, image, or CSV statement.
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let store = Store::new(&cfg.storage).await?;
            let orchestrator = Arc::new(Orchestrator::from_config(&cfg));

            if cfg.reminders.enabled {
                tokio::spawn(server::reminder_loop(
                    store.clone(),
                    cfg.reminders.poll_interval_secs,
                ));
            }

            if !cfg.server.enabled {
                anyhow::bail!("server is disabled in config.toml; nothing to run");
            }
            server::serve(cfg.server.clone(), orchestrator, store).await?;
        }
        Commands::Status => {
            let orchestrator = Orchestrator::from_config(&cfg);
            println!("Fiscus — Status Check\n");
            println!("Config: {}", cli.config);
            println!("Database: {}", cfg.storage.db_path);
            println!(
                "Server: {}:{} ({})",
                cfg.server.host,
                cfg.server.port,
                if cfg.server.enabled { "enabled" } else { "disabled" }
            );
            println!(
                "Calendar: {}",
                if cfg.calendar.enabled && !cfg.calendar.access_token.is_empty() {
                    "configured"
                } else if cfg.calendar.enabled {
                    "enabled but missing access_token"
                } else {
                    "disabled"
                }
            );
            println!("\nResponders:");
            for (name, available) in orchestrator.availability().await {
                println!(
                    "  {name}: {}",
                    if available { "available" } else { "not available" }
                );
            }
        }
        Commands::Ask { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: fiscus ask <message>");
            }
            let orchestrator = Orchestrator::from_config(&cfg);
            let reply = orchestrator
                .process_user_input(&message.join(" "), Vec::new())
                .await;
            println!("{}", reply.response);
            println!("\n[{}]", reply.provider);
        }
        Commands::Convert { amount, from, to } => {
            let client = RateClient::from_config(&cfg.rates);
            let conversion = client.convert(amount, &from, &to).await?;
            println!(
                "{} {} = {:.2} {} (rate {})",
                conversion.amount,
                conversion.from,
                conversion.converted_amount,
                conversion.to,
                conversion.rate
            );
        }
        Commands::Import { path } => {
            let content = std::fs::read(&path)?;
            let mime_type = mime_for(&path);

            let store = Store::new(&cfg.storage).await?;
            let orchestrator = Orchestrator::from_config(&cfg);
            let reader = StatementReader::new(orchestrator.primary());

            let import = reader.import(&content, mime_type).await?;
            let added = import.transactions.len();
            let total = store.append_transactions(import.transactions).await?;
            println!(
                "Imported {added} transactions from {} ({}, confidence {:.2}); {total} stored",
                import.bank_name, import.format, import.confidence
            );
        }
    }

    Ok(())
}

/// Guess a mime type from the file extension.
fn mime_for(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".csv") {
        "text/csv"
    } else {
        "text/plain"
    }
}
