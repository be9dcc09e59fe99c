use anyhow::Result;
use clap::{Parser, Subcommand};
use placement_notify::{config, credentials, dispatcher::Dispatcher};
use std::path::PathBuf;
use tracing::error;

#[derive(Debug, Parser)]
#[command(author, version, about = "Check and exercise the SMS notification setup")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "notify.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate credentials, then send a test SMS
    TestSms {
        /// Recipient, e.g. +919876543210 or 9876543210
        #[arg(long)]
        phone: String,
    },
    /// Print the normalized form of a phone number
    Normalize {
        #[arg(long)]
        phone: String,
    },
    /// Report whether credentials are configured
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let dispatcher = Dispatcher::from_config(&cfg)?;

    match args.command {
        Command::Normalize { phone } => match dispatcher.normalize(&phone) {
            Some(n) => println!("{n}"),
            None => println!("(empty)"),
        },
        Command::Check => match credentials::validate(&cfg.twilio) {
            Ok(()) => println!("Credentials are configured"),
            Err(err) => println!("{err}"),
        },
        Command::TestSms { phone } => test_sms(&cfg, &dispatcher, &phone).await,
    }
    Ok(())
}

async fn test_sms(cfg: &config::Config, dispatcher: &Dispatcher, phone: &str) {
    println!("Testing Twilio SMS configuration...");
    println!("{}", "-".repeat(60));

    println!("Step 1: Validating credentials...");
    if let Err(err) = credentials::validate(&cfg.twilio) {
        println!("x {err}");
        return;
    }
    let sid: String = cfg.twilio.account_sid.chars().take(10).collect();
    println!("ok Credentials are configured");
    println!("  Account SID: {sid}...");
    println!("  Twilio Number: {}", cfg.twilio.phone_number);

    println!("\nStep 2: Formatting phone number...");
    let formatted = dispatcher.normalize(phone).unwrap_or_default();
    println!("ok Formatted: {formatted}");

    println!("\nStep 3: Sending test SMS...");
    let body = format!(
        "Test message from Placement Portal. Time: {}",
        chrono::Local::now().to_rfc3339()
    );
    match dispatcher.send(&formatted, &body).await {
        Ok(outcome) if outcome.success() => {
            println!("ok SMS sent successfully!");
            println!("  Message ID: {}", outcome.message_id().unwrap_or_default());
            println!("  To: {}", outcome.recipient().unwrap_or_default());
        }
        Ok(outcome) => println!("x SMS failed: {}", outcome.error().unwrap_or_default()),
        Err(err) => {
            error!(%err, "test SMS error");
            println!("x Error sending SMS: {err}");
        }
    }

    println!("{}", "-".repeat(60));
    println!("Test complete!");
}
