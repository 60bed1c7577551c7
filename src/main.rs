//! Liquidity Agent CLI
//!
//! Command-line chatbot that manages Uniswap V3 positions with an AI agent.

use clap::{Parser, Subcommand};
use liquidity_agent::actions::{DiscoverRebalanceInput, RebalanceLiquidityInput};
use liquidity_agent::runner::Mode;
use liquidity_agent::{AgentRunner, Config, Network, Result};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "liquidity-agent")]
#[command(about = "AI chatbot that creates and rebalances Uniswap V3 liquidity positions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the wallet data file
    #[arg(long, global = true)]
    wallet_data: Option<PathBuf>,

    /// Override the network for a newly created wallet (base-mainnet, base-sepolia)
    #[arg(short, long, global = true)]
    network: Option<Network>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode
    Chat,

    /// Autonomous mode: the agent acts on its own every interval
    Auto {
        /// Seconds between autonomous actions
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Create or rebalance a position directly, without the chat model
    Rebalance {
        /// Lower tick
        #[arg(long, allow_hyphen_values = true)]
        tick_lower: i32,

        /// Upper tick
        #[arg(long, allow_hyphen_values = true)]
        tick_upper: i32,

        /// Pool address
        #[arg(long)]
        pool: String,

        /// token0 address
        #[arg(long)]
        token0: String,

        /// token1 address
        #[arg(long)]
        token1: String,

        /// Desired token0 amount in wei
        #[arg(long)]
        amount0: String,

        /// Desired token1 amount in wei
        #[arg(long)]
        amount1: String,

        /// Token ID of the position to replace
        #[arg(long)]
        token_id: Option<String>,

        /// Liquidity of the position to replace
        #[arg(long)]
        liquidity: Option<String>,

        /// Look the existing position up through the wallet
        #[arg(long, conflicts_with_all = ["token_id", "liquidity"])]
        discover: bool,

        /// Skip the eth_call preflight
        #[arg(long)]
        no_preflight: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // stdout carries the chat transcript; logs go to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(path) = cli.wallet_data {
        config.agent.wallet_data_file = path;
    }
    if let Some(network) = cli.network {
        config.network = network;
    }

    let command = cli.command;
    tokio::select! {
        result = run(command, config) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Goodbye Agent!");
            std::process::exit(0);
        }
    }
}

async fn run(command: Option<Commands>, mut config: Config) -> Result<()> {
    match command {
        None => AgentRunner::new(config).run(None).await,
        Some(Commands::Chat) => AgentRunner::new(config).run(Some(Mode::Chat)).await,
        Some(Commands::Auto { interval }) => {
            if let Some(secs) = interval {
                config.agent.autonomous_interval_secs = secs;
            }
            AgentRunner::new(config).run(Some(Mode::Auto)).await
        }
        Some(Commands::Rebalance {
            tick_lower,
            tick_upper,
            pool,
            token0,
            token1,
            amount0,
            amount1,
            token_id,
            liquidity,
            discover,
            no_preflight,
        }) => {
            let runner = AgentRunner::new(config).with_preflight(!no_preflight);
            let wallet = runner.connect_wallet()?;

            let status = if discover {
                let input = DiscoverRebalanceInput {
                    tick_a: tick_lower,
                    tick_b: tick_upper,
                    pool,
                    token0,
                    token1,
                    amount0_desired: amount0,
                    amount1_desired: amount1,
                };
                liquidity_agent::rebalance_discovered_liquidity(&wallet, &input).await?
            } else {
                let input = RebalanceLiquidityInput {
                    tick_a: tick_lower,
                    tick_b: tick_upper,
                    pool,
                    token0,
                    token1,
                    amount0_desired: amount0,
                    amount1_desired: amount1,
                    existing_position: token_id.is_some() || liquidity.is_some(),
                    existing_token_id: token_id,
                    existing_liquidity: liquidity,
                };
                liquidity_agent::rebalance_liquidity(&wallet, &input).await?
            };

            println!("{}", status);
            Ok(())
        }
        Some(Commands::Config) => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
