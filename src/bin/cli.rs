//! Weatherboard CLI
//!
//! Command-line client for a running Weatherboard server:
//! - Add readings
//! - Show the Recent Window
//! - Save the chart as SVG
//! - Check status

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use weatherboard::api::dto::{AddReadingRequest, AddReadingResponse, HealthResponse, RecentResponse};
use weatherboard::config::generate_default_config;
use weatherboard::Reading;

#[derive(Parser)]
#[command(name = "weatherboard-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the Weatherboard server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a reading (random temperature, current time by default)
    Add {
        /// Whole degrees Celsius in [0, 100)
        #[arg(short, long)]
        temperature: Option<i64>,
        /// Epoch milliseconds
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Show the most recent readings
    Recent,

    /// Save the current chart as SVG
    Svg {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Add {
            temperature,
            timestamp,
        } => {
            let response = client
                .post(format!("{}/api/v1/readings", cli.api_url))
                .json(&AddReadingRequest {
                    temperature,
                    timestamp,
                })
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                bail!("Failed ({}): {}", status, text);
            }

            let added: AddReadingResponse = response.json().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&added)?),
                OutputFormat::Table => println!(
                    "Added {}°C at {} (id {})",
                    added.reading.temperature,
                    format_timestamp(added.reading.timestamp),
                    added.id
                ),
            }
        }

        Commands::Recent => {
            let response = client
                .get(format!("{}/api/v1/readings/recent", cli.api_url))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;

            if !response.status().is_success() {
                bail!("Failed to fetch readings: {}", response.status());
            }

            let recent: RecentResponse = response.json().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&recent)?),
                OutputFormat::Table => print_table(&recent.readings),
            }
        }

        Commands::Svg { output } => {
            let response = client
                .get(format!("{}/api/v1/chart.svg", cli.api_url))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;

            if !response.status().is_success() {
                bail!("Failed to fetch chart: {}", response.status());
            }

            let svg = response.text().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, svg)
                        .with_context(|| format!("Cannot write {:?}", path))?;
                    println!("Chart written to {:?}", path);
                }
                None => println!("{}", svg),
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await
                .with_context(|| connect_hint(&cli.api_url))?;

            if !response.status().is_success() {
                bail!("API returned error: {}", response.status());
            }

            let health: HealthResponse = response.json().await?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&health)?),
                OutputFormat::Table => {
                    println!("Weatherboard v{}", health.version);
                    println!();
                    println!("API Status: {}", health.status);
                    println!();
                    println!("Store:");
                    println!("  Status: {}", health.store);
                    println!("  Documents: {}", health.documents);
                    println!("  Live queries: {}", health.live_subscriptions);
                    println!();
                    println!("WebSocket connections: {}", health.ws_connections);
                    println!("Uptime: {}", format_duration(health.uptime_seconds));
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, config)
                        .with_context(|| format!("Cannot write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

fn connect_hint(api_url: &str) -> String {
    format!(
        "Cannot connect to Weatherboard at {}. Make sure the server is running: cargo run --bin weatherboard",
        api_url
    )
}

fn format_timestamp(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_table(readings: &[Reading]) {
    if readings.is_empty() {
        println!("No readings yet.");
        println!();
        println!("Add one with:");
        println!("  weatherboard-cli add");
        return;
    }

    println!("{:<26} {:>15} {:>6}", "Time", "Timestamp", "Temp");
    println!("{}", "-".repeat(70));

    for reading in readings {
        println!(
            "{:<26} {:>15} {:>4}°C {}",
            format_timestamp(reading.timestamp),
            reading.timestamp,
            reading.temperature,
            "#".repeat((reading.temperature / 5).max(0) as usize)
        );
    }
}
