//! # StudyTrack CLI
//!
//! Daily study-goal notifications over WhatsApp.
//!
//! Usage:
//!   studytrack serve                       # HTTP gateway (cron trigger, onboarding, webhook)
//!   studytrack run-daily --date 2026-10-19 # One dispatch run, report on stdout
//!   studytrack channel status              # Inspect the Evolution instance
//!   studytrack channel setup               # Create the instance and print the pairing QR
//!   studytrack config show                 # Show configuration (secrets masked)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use studytrack_channels::EvolutionChannel;
use studytrack_channels::evolution::ConnectState;
use studytrack_core::StudyTrackConfig;
use studytrack_core::traits::{MessagingChannel, TaskStore};
use studytrack_gateway::{AppState, GatewayServer, OnboardingGate};
use studytrack_scheduler::{DailyRunCoordinator, RunSummary};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "studytrack",
    version,
    about = "📚 StudyTrack — daily study goals delivered on WhatsApp"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the daily dispatch once and print the report
    RunDaily {
        /// Run date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Manage the WhatsApp gateway instance
    Channel {
        #[command(subcommand)]
        action: ChannelAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ChannelAction {
    /// List instances and check the configured one is paired
    Status,
    /// Create the configured instance and print its pairing QR code
    Setup,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "studytrack=debug,studytrack_core=debug,studytrack_db=debug,studytrack_channels=debug,studytrack_scheduler=debug,studytrack_gateway=debug,tower_http=debug"
    } else {
        "studytrack=info,studytrack_scheduler=info,studytrack_gateway=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Load config
    let config_path = config_source(cli.config.as_deref());
    let mut config = if cli.config.is_some() {
        StudyTrackConfig::load_from(&config_path)?
    } else {
        StudyTrackConfig::load()?
    };

    match cli.command {
        Commands::Serve { port } => {
            if let Some(p) = port {
                config.server.port = p;
            }
            config.validate()?;

            let (store, channel) = build_adapters(&config)?;
            let coordinator = Arc::new(DailyRunCoordinator::new(store.clone(), channel.clone()));

            let _daily_timer = config.schedule.daily_at()?.map(|at| {
                tracing::info!("⏰ In-process daily run at {at}");
                studytrack_scheduler::timer::spawn_daily(coordinator.clone(), at)
            });

            let state = Arc::new(AppState {
                environment: config.environment.clone(),
                coordinator,
                onboarding: OnboardingGate::new(store, channel.clone()),
                channel,
                start_time: std::time::Instant::now(),
            });

            println!("📚 StudyTrack v{} ({})", env!("CARGO_PKG_VERSION"), config.environment);
            GatewayServer::start(state, &config.server.host, config.server.port).await?;
        }

        Commands::RunDaily { date } => {
            config.validate()?;
            let (store, channel) = build_adapters(&config)?;
            let coordinator = DailyRunCoordinator::new(store, channel);

            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let summary = coordinator.run_daily(date).await;
            println!("{}", serde_json::to_string_pretty(&summary.report())?);

            if let RunSummary::Failed(reason) = &summary {
                anyhow::bail!("daily run for {date} failed: {reason}");
            }
        }

        Commands::Channel { action } => {
            let evolution = EvolutionChannel::new(
                config.evolution.clone(),
                config.webhook.verify_token.clone(),
            )?;

            match action {
                ChannelAction::Status => {
                    println!("📱 Evolution API at {}", config.evolution.base_url);
                    println!("   Expected instance: {}\n", evolution.instance_name());

                    let instances = evolution.fetch_instances().await?;
                    if instances.is_empty() {
                        println!("No instances found. Run `studytrack channel setup`.");
                    }
                    for instance in &instances {
                        println!("  {} {} ({})",
                            if instance.is_open() { "✅" } else { "⬜" },
                            instance.name,
                            instance.status.as_deref().unwrap_or("unknown"));
                    }

                    match instances.iter().find(|i| i.name == evolution.instance_name()) {
                        Some(i) if i.is_open() => println!("\nInstance is connected and ready to send."),
                        Some(_) => println!("\nInstance exists but is not paired. Run `studytrack channel setup`."),
                        None => println!("\nInstance '{}' is missing.", evolution.instance_name()),
                    }
                }
                ChannelAction::Setup => {
                    println!("📱 Creating instance '{}'...", evolution.instance_name());
                    evolution.create_instance().await?;

                    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

                    match evolution.connect_instance().await? {
                        ConnectState::QrCode(qr) => {
                            println!("\nScan this QR code in WhatsApp > Linked devices:");
                            println!("{qr}");
                        }
                        ConnectState::AlreadyOpen => println!("✅ Instance is already connected."),
                        ConnectState::Unknown(body) => {
                            println!("Unexpected connect response:");
                            println!("{}", serde_json::to_string_pretty(&body)?);
                        }
                    }
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if config_path.exists() {
                    println!("# {}", config_path.display());
                } else {
                    println!("# {} (not found, defaults + env)", config_path.display());
                }
                println!("{}", config.to_masked_toml()?);
            }
        },
    }

    Ok(())
}

/// The config file in effect: `--config` when given, else the default path.
fn config_source(cli_path: Option<&str>) -> PathBuf {
    cli_path.map_or_else(StudyTrackConfig::default_path, PathBuf::from)
}

/// Build the configured task store and WhatsApp channel.
fn build_adapters(
    config: &StudyTrackConfig,
) -> Result<(Arc<dyn TaskStore>, Arc<dyn MessagingChannel>)> {
    let store: Arc<dyn TaskStore> = Arc::from(
        studytrack_db::create_store(&config.store).context("opening task store")?,
    );
    let channel: Arc<dyn MessagingChannel> = Arc::new(EvolutionChannel::new(
        config.evolution.clone(),
        config.webhook.verify_token.clone(),
    )?);
    tracing::info!("Store: {} | Channel: {}", store.name(), channel.name());
    Ok((store, channel))
}
