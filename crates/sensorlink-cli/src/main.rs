//! sensorlink CLI: inspect and stream sensors from the sensor service.

use std::fmt::Write as _;
use std::time::Duration;

use clap::{Parser, Subcommand};
use sensorlink_client::{load_config, open_client, ClientConfig, SensorClient};
use sensorlink_data::FixedSizeDecoder;
use sensorlink_types::{parse_data_range_list, SensorErrorKind};

#[derive(Parser)]
#[command(
    name = "sensorlink",
    about = "Inspect and stream sensors over the sensor service",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a sensor's properties.
    Describe {
        /// Sensor id, e.g. `accelerometersensor`.
        sensor: String,
    },

    /// Start a session and print incoming records as hex.
    Monitor {
        sensor: String,

        /// Size of one record in bytes.
        #[arg(short, long, default_value_t = 8)]
        record_size: usize,

        /// Sampling interval to request, in milliseconds.
        #[arg(short, long)]
        interval: Option<i32>,

        /// Keep streaming while the display is off.
        #[arg(long)]
        standby_override: bool,

        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(short, long)]
        duration: Option<u64>,
    },

    /// Parse data range notation such as `-2=>2:0.1, 5`.
    Ranges {
        notation: String,

        /// Resolution for ranges that do not give one.
        #[arg(short, long, default_value_t = 0.0)]
        resolution: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Commands::Describe { sensor } => describe(&config, &sensor).await?,
        Commands::Monitor {
            sensor,
            record_size,
            interval,
            standby_override,
            duration,
        } => {
            monitor(
                &config,
                &sensor,
                record_size,
                interval,
                standby_override,
                duration.map(Duration::from_secs),
            )
            .await?;
        }
        Commands::Ranges {
            notation,
            resolution,
        } => {
            let ranges = parse_data_range_list(&notation, resolution);
            if ranges.is_empty() {
                anyhow::bail!("no valid range in {notation:?}");
            }
            for range in ranges {
                println!(
                    "{range}\tmin={} max={} resolution={}",
                    range.min, range.max, range.resolution
                );
            }
        }
    }

    Ok(())
}

async fn describe(config: &ClientConfig, sensor: &str) -> anyhow::Result<()> {
    let client = open_client(config, sensor).await?;

    println!("id:           {}", client.id().await);
    println!("type:         {}", client.sensor_type().await);
    println!("description:  {}", client.description().await);
    println!("hw buffering: {}", client.hw_buffering().await);
    println!("data range:   {}", client.current_data_range().await);
    println!("data ranges:  {}", join(client.available_data_ranges().await));
    println!("intervals:    {}", join(client.available_intervals().await));
    println!(
        "buffer sizes: {}",
        join(
            client
                .available_buffer_sizes()
                .await
                .into_iter()
                .map(|r| format!("{}..={}", r.min, r.max))
        )
    );

    report(client.close().await.code(), sensor);
    Ok(())
}

async fn monitor(
    config: &ClientConfig,
    sensor: &str,
    record_size: usize,
    interval: Option<i32>,
    standby_override: bool,
    duration: Option<Duration>,
) -> anyhow::Result<()> {
    let mut client = open_client(config, sensor).await?;
    if let Some(interval) = interval {
        let _ = client.set_interval(interval);
    }
    if standby_override {
        let _ = client.set_standby_override(true);
    }

    if let Err(e) = client.start().wait().await {
        anyhow::bail!("failed to start {sensor}: {e}");
    }
    tracing::info!(sensor, session = %client.session_id(), "streaming");

    let mut records = 0u64;
    let mut decoder = FixedSizeDecoder::new(record_size, |record: &[u8]| {
        records += 1;
        println!("{records:>8} {}", hex(record));
    });
    client.run(&mut decoder, shutdown(duration)).await;
    drop(decoder);

    let _ = client.stop();
    client.settle().await;
    print_error(&mut client).await;
    tracing::info!(sensor, records, "stopped");

    report(client.close().await.code(), sensor);
    Ok(())
}

async fn shutdown(duration: Option<Duration>) {
    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                () = tokio::time::sleep(duration) => {}
            }
        }
        None => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

async fn print_error(client: &mut SensorClient) {
    let code = client.error_code().await;
    if code.is_error() {
        eprintln!("error {}: {}", code.code(), client.error_string().await);
    }
}

fn report(code: SensorErrorKind, sensor: &str) {
    if code.is_error() {
        tracing::warn!(sensor, code = %code, "client closed with error");
    }
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
