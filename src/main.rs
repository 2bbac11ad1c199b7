//! WinGo Prediction Oracle
//!
//! Polls a lottery feed, runs an AI predictor pool and serves aggregated
//! accuracy state over HTTP.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wingo_oracle::{
    config::Config,
    engine::{spawn_scheduler, PeriodEngine},
    feed::FeedClient,
    predictor::{DisabledBackend, ForecastBackend, LlmBackend, PredictorPool},
    server::{start_server, AppState},
};

#[derive(Parser)]
#[command(name = "wingo-oracle")]
#[command(about = "WinGo color/size prediction tracker with an AI predictor pool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the poll loop and status server
    Run {
        /// Override the configured server port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a single engine cycle and print the resulting status
    Tick,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { port } => run(config, port).await,
        Commands::Tick => tick_once(config).await,
    }
}

fn build_engine(config: &Config) -> anyhow::Result<Arc<PeriodEngine>> {
    let feed = Arc::new(FeedClient::new(&config.feed)?);

    let backend: Arc<dyn ForecastBackend> = match &config.llm {
        Some(llm_config) => {
            tracing::info!("LLM backend initialized: {}", llm_config.provider);
            Arc::new(LlmBackend::new(llm_config.clone())?)
        }
        None => {
            tracing::warn!("No LLM configured, predictors will use random fallback");
            Arc::new(DisabledBackend)
        }
    };

    let slot_timeout = config
        .llm
        .as_ref()
        .map(|c| c.timeout_secs + 5)
        .unwrap_or(25);
    let pool = PredictorPool::new(&config.predictors.names, backend)
        .with_slot_timeout(Duration::from_secs(slot_timeout));

    Ok(Arc::new(PeriodEngine::new(
        feed,
        pool,
        config.engine.history_cap,
        config.engine.snapshot_limit,
    )))
}

async fn run(config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    tracing::info!("Starting WinGo prediction oracle");

    let engine = build_engine(&config)?;
    let commands = spawn_scheduler(
        engine.clone(),
        Duration::from_secs(config.engine.poll_interval_secs),
    );

    let state = Arc::new(AppState {
        engine,
        commands,
    });

    let port = port_override.unwrap_or(config.server.port);
    start_server(state, port)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}

async fn tick_once(config: Config) -> anyhow::Result<()> {
    let engine = build_engine(&config)?;

    let outcome = engine.tick().await;
    tracing::info!("Tick outcome: {:?}", outcome);

    let status = engine.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
