//! NetAlert CLI
//!
//! Command-line interface for the NetAlert alert dispatch service.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use netalert::alerting::{AlertDispatcher, ChannelSenders};
use netalert::api::{AppState, HttpServer};
use netalert::config::LoggingConfig;
use netalert::db::{PostgresPool, Stores};
use netalert::models::{
    AlertConfigInput, ChannelKind, Comparison, DispatchRequest, RECORD_LIST_LIMIT,
};
use netalert::Config;

/// NetAlert - Multi-channel alerting for network inspection
#[derive(Parser)]
#[command(name = "netalert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "NETALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// HTTP API port
        #[arg(long, env = "NETALERT_HTTP_PORT")]
        port: Option<u16>,
    },

    /// Dispatch one alert and print the per-target results
    Send {
        /// Device that triggered the alert
        #[arg(long)]
        device: String,

        /// Alert config to dispatch
        #[arg(long)]
        config_id: i64,

        /// Metric name
        #[arg(long)]
        metric: String,

        /// Observed metric value
        #[arg(long, allow_hyphen_values = true)]
        value: f64,

        /// Message text (generated from the metric when omitted)
        #[arg(long)]
        message: Option<String>,
    },

    /// Manage alert configs
    Alerts {
        #[command(subcommand)]
        command: AlertsCommands,
    },

    /// Show recent alert records
    Records {
        /// Only show records for this device
        #[arg(long)]
        device: Option<String>,
    },

    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Subcommand)]
enum AlertsCommands {
    /// List all alert configs
    List,

    /// Create a new alert config
    Add {
        /// Config name
        #[arg(long)]
        name: String,

        /// Device to watch
        #[arg(long)]
        device: String,

        /// Metric to monitor
        #[arg(long)]
        metric: String,

        /// Threshold value
        #[arg(long, allow_hyphen_values = true)]
        threshold: f64,

        /// Comparison operator (>, <, >=, <=, ==)
        #[arg(long, default_value = ">")]
        comparison: String,

        /// Channels to notify (email, wechat, dingtalk, sms)
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,

        /// Create the config disabled
        #[arg(long)]
        disabled: bool,
    },
}

#[derive(Subcommand)]
enum DbCommands {
    /// Run database migrations
    Migrate,

    /// Check database connectivity
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Pick up a local .env before reading the environment
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.logging, cli.verbose);

    let result = match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await,
        Commands::Send {
            device,
            config_id,
            metric,
            value,
            message,
        } => {
            let request = DispatchRequest {
                device_id: device,
                alert_config_id: config_id,
                metric,
                metric_value: value,
                message,
            };
            run_send(config, request).await
        }
        Commands::Alerts { command } => run_alerts(config, command).await,
        Commands::Records { device } => run_records(config, device).await,
        Commands::Db { command } => run_db(config, command).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_dispatcher(config: &Config, stores: &Stores) -> anyhow::Result<AlertDispatcher> {
    let senders = ChannelSenders::from_config(&config.channels)?;
    Ok(AlertDispatcher::new(stores, senders, &config.channels))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if let Some(metrics_port) = config.server.metrics_port {
        let addr: SocketAddr = format!("{}:{metrics_port}", config.server.host)
            .parse()
            .context("invalid metrics listen address")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start Prometheus exporter")?;
        info!("Prometheus metrics on {}", addr);
    }

    let stores = Stores::connect(&config.database).await?;
    let dispatcher = build_dispatcher(&config, &stores)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let server = HttpServer::new(AppState {
        dispatcher: Arc::new(dispatcher),
        stores,
    });

    server.serve(&addr).await?;
    info!("Shut down");
    Ok(())
}

async fn run_send(config: Config, request: DispatchRequest) -> anyhow::Result<()> {
    let stores = Stores::connect(&config.database).await?;
    let dispatcher = build_dispatcher(&config, &stores)?;

    match dispatcher.dispatch(request).await {
        Ok(outcome) => print_json(&outcome),
        Err(e) => {
            if let Some(results) = e.partial_results() {
                print_json(&serde_json::json!({ "results": results }))?;
            }
            Err(e.into())
        }
    }
}

async fn run_alerts(config: Config, command: AlertsCommands) -> anyhow::Result<()> {
    let stores = Stores::connect(&config.database).await?;

    match command {
        AlertsCommands::List => {
            let configs = stores.configs.list_configs().await?;
            print_json(&configs)
        }
        AlertsCommands::Add {
            name,
            device,
            metric,
            threshold,
            comparison,
            channels,
            disabled,
        } => {
            let input = AlertConfigInput {
                name,
                device_id: device,
                metric,
                threshold,
                comparison: comparison.parse::<Comparison>()?,
                channels: channels.into_iter().map(ChannelKind::from).collect(),
                enabled: !disabled,
            }
            .normalize()?;

            let id = stores.configs.create_config(input).await?;
            print_json(&serde_json::json!({ "id": id }))
        }
    }
}

async fn run_records(config: Config, device: Option<String>) -> anyhow::Result<()> {
    let stores = Stores::connect(&config.database).await?;

    let records = stores
        .records
        .list_records(device.as_deref(), RECORD_LIST_LIMIT)
        .await?;
    let summaries: Vec<_> = records.iter().map(|r| r.summary()).collect();
    print_json(&summaries)
}

async fn run_db(config: Config, command: DbCommands) -> anyhow::Result<()> {
    if config.database.is_memory() {
        println!("In-memory store configured, nothing to do");
        return Ok(());
    }

    let postgres = PostgresPool::new(&config.database).await?;

    match command {
        DbCommands::Migrate => {
            postgres.migrate().await?;
            println!("Migrations applied");
        }
        DbCommands::Check => {
            postgres.health_check().await?;
            println!("Database: connected");
        }
    }
    Ok(())
}
