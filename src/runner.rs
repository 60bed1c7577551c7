//! Chatbot runner
//!
//! Loads (or creates) the agent wallet, registers the prebuilt tools and
//! drives a [`ReactAgent`] in chat or autonomous mode. Every chunk the agent
//! produces is printed followed by a separator line.

use crate::agent::{AuditLog, ChatModel, ConversationMemory, OpenAiChatModel, ReactAgent};
use crate::config::{Config, Network, RpcConfig, PRIVATE_KEY_ENV};
use crate::tools::{
    BalanceTool, DiscoverRebalanceTool, RebalanceLiquidityTool, ToolRegistry, WalletDetailsTool,
};
use crate::wallet::store::{load_wallet_data, save_wallet_data};
use crate::wallet::{OnchainWallet, SecureWallet, Wallet};
use crate::{Error, Result};
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Input sent to the agent on every autonomous round
pub const AUTONOMOUS_THOUGHT: &str = "Be creative and do something interesting on the blockchain. \
Choose an action or set of actions and execute it that highlights your abilities.";

/// Printed after every agent chunk
pub const CHUNK_SEPARATOR: &str = "-------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Interactive chat on stdin
    Chat,
    /// Fixed prompt on a timer
    Auto,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "chat" => Ok(Mode::Chat),
            "2" | "auto" => Ok(Mode::Auto),
            other => Err(Error::InvalidArgument(format!("Unknown mode: {}", other))),
        }
    }
}

/// Builds the agent from config and runs it
pub struct AgentRunner {
    config: Config,
    rpc: RpcConfig,
    preflight: bool,
}

impl AgentRunner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rpc: RpcConfig::from_env(),
            preflight: true,
        }
    }

    pub fn with_rpc_config(mut self, rpc: RpcConfig) -> Self {
        self.rpc = rpc;
        self
    }

    /// Enable or disable `eth_call` preflight on the onchain wallet
    pub fn with_preflight(mut self, enabled: bool) -> Self {
        self.preflight = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the persisted wallet, or create a fresh one
    ///
    /// Without a wallet data file, a key in `PRIVATE_KEY` is imported;
    /// otherwise a random key is generated. The exported wallet data is
    /// written back in every case. A loaded wallet keeps the network it was
    /// exported with.
    pub fn load_or_create_wallet(&self) -> Result<(SecureWallet, Network)> {
        let path = &self.config.agent.wallet_data_file;

        let (signer, network) = match load_wallet_data(path)? {
            Some(data) => {
                let signer = SecureWallet::from_wallet_data(&data)?;
                if data.network_id != self.config.network {
                    warn!(
                        stored = %data.network_id,
                        configured = %self.config.network,
                        "Wallet data network differs from config; using the stored network"
                    );
                }
                info!(
                    address = %signer.address_string(),
                    path = %path.display(),
                    "Loaded persisted wallet"
                );
                (signer, data.network_id)
            }
            None => {
                let signer = match std::env::var(PRIVATE_KEY_ENV) {
                    Ok(key) => {
                        let signer = SecureWallet::from_hex(&key)?;
                        info!(address = %signer.address_string(), "Imported wallet from {}", PRIVATE_KEY_ENV);
                        signer
                    }
                    Err(_) => {
                        let signer = SecureWallet::random();
                        info!(address = %signer.address_string(), "Created new wallet");
                        signer
                    }
                };
                (signer, self.config.network)
            }
        };

        save_wallet_data(path, &signer.export(network))?;
        Ok((signer, network))
    }

    pub fn rpc_url(&self, network: Network) -> Result<String> {
        self.rpc
            .for_network(network)
            .map(str::to_string)
            .ok_or_else(|| Error::Config(format!("No RPC URL configured for {}", network)))
    }

    /// Load or create the wallet and connect it to its network
    pub fn connect_wallet(&self) -> Result<OnchainWallet> {
        let (signer, network) = self.load_or_create_wallet()?;
        let rpc_url = self.rpc_url(network)?;
        Ok(OnchainWallet::connect(signer, network, &rpc_url)?.with_preflight(self.preflight))
    }

    /// Prebuilt tools plus the liquidity rebalancing tool
    pub fn build_tools(&self, wallet: Arc<dyn Wallet>, rpc_url: &str) -> Result<ToolRegistry> {
        let mut tools = ToolRegistry::new();
        tools.register(WalletDetailsTool::new(wallet.clone()))?;
        tools.register(BalanceTool::new(&wallet.address(), rpc_url)?)?;
        if self.config.agent.discover_positions {
            tools.register(DiscoverRebalanceTool::new(wallet))?;
        } else {
            tools.register(RebalanceLiquidityTool::new(wallet))?;
        }

        info!(tools = ?tools.names(), "Registered tools");
        Ok(tools)
    }

    pub fn build_agent(&self, model: Arc<dyn ChatModel>, tools: ToolRegistry) -> ReactAgent {
        let mut agent = ReactAgent::new(model, tools)
            .with_system_prompt(self.config.agent.system_prompt.as_str())
            .with_max_iterations(self.config.model.max_iterations)
            .with_memory(ConversationMemory::new().with_max_turns(self.config.agent.max_history_turns));

        if let Some(path) = &self.config.agent.audit_log_path {
            agent = agent.with_audit_log(AuditLog::new(path));
            info!(audit_path = %path, "Audit log enabled");
        }
        agent
    }

    /// Wallet, tools, model and agent in one step
    pub fn initialize_agent(&self) -> Result<ReactAgent> {
        let model = OpenAiChatModel::from_config(&self.config.model)?;
        let wallet = self.connect_wallet()?;
        let rpc_url = self.rpc_url(wallet.network())?;

        let wallet: Arc<dyn Wallet> = Arc::new(wallet);
        let tools = self.build_tools(wallet, &rpc_url)?;
        Ok(self.build_agent(Arc::new(model), tools))
    }

    /// Initialize the agent and run it on stdin/stdout
    ///
    /// Without a `mode` the user is asked to pick one.
    pub async fn run(&self, mode: Option<Mode>) -> Result<()> {
        println!("Starting Agent...");
        let agent = self.initialize_agent()?;

        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = std::io::stdout();

        let mode = match mode {
            Some(mode) => mode,
            None => choose_mode(&mut stdin, &mut stdout).await?,
        };

        let thread_id = self.config.agent.thread_id.as_str();
        match mode {
            Mode::Chat => run_chat(&agent, thread_id, &mut stdin, &mut stdout).await,
            Mode::Auto => {
                let interval = Duration::from_secs(self.config.agent.autonomous_interval_secs);
                run_autonomous(&agent, thread_id, interval, None, &mut stdout).await
            }
        }
    }
}

/// Ask for a mode until a valid choice is entered
pub async fn choose_mode<R, W>(input: &mut R, output: &mut W) -> Result<Mode>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        writeln!(output, "\nAvailable modes:")?;
        writeln!(output, "1. chat    - Interactive chat mode")?;
        writeln!(output, "2. auto    - Autonomous action mode")?;
        write!(output, "\nChoose a mode (enter number or name): ")?;
        output.flush()?;

        let Some(line) = read_line(input).await? else {
            return Err(Error::InvalidArgument(
                "Input closed before a mode was chosen".to_string(),
            ));
        };
        match line.parse::<Mode>() {
            Ok(mode) => return Ok(mode),
            Err(_) => writeln!(output, "Invalid choice. Please try again.")?,
        }
    }
}

/// Interactive loop; `exit` or end of input ends it
pub async fn run_chat<R, W>(
    agent: &ReactAgent,
    thread_id: &str,
    input: &mut R,
    output: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    writeln!(output, "Starting chat mode... Type 'exit' to end.")?;

    loop {
        write!(output, "\nPrompt: ")?;
        output.flush()?;

        let Some(line) = read_line(input).await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.eq_ignore_ascii_case("exit") {
            break;
        }
        if prompt.is_empty() {
            continue;
        }

        if let Err(e) = stream_turn(agent, thread_id, prompt, output).await {
            error!(error = %e, "Agent turn failed");
            writeln!(output, "Error: {}", e)?;
        }
    }

    Ok(())
}

/// Send [`AUTONOMOUS_THOUGHT`] every `interval`, forever or for `max_rounds`
pub async fn run_autonomous<W>(
    agent: &ReactAgent,
    thread_id: &str,
    interval: Duration,
    max_rounds: Option<usize>,
    output: &mut W,
) -> Result<()>
where
    W: Write + Send,
{
    writeln!(output, "Starting autonomous mode...")?;

    let mut rounds = 0usize;
    loop {
        if let Err(e) = stream_turn(agent, thread_id, AUTONOMOUS_THOUGHT, output).await {
            error!(error = %e, round = rounds, "Autonomous round failed");
            writeln!(output, "Error: {}", e)?;
        }

        rounds += 1;
        if max_rounds.is_some_and(|max| rounds >= max) {
            return Ok(());
        }
        tokio::time::sleep(interval).await;
    }
}

async fn stream_turn<W: Write + Send>(
    agent: &ReactAgent,
    thread_id: &str,
    input: &str,
    output: &mut W,
) -> Result<()> {
    let mut write_error = None;
    agent
        .stream(thread_id, input, |event| {
            if write_error.is_none() {
                if let Err(e) = writeln!(output, "{}\n{}", event.text(), CHUNK_SEPARATOR) {
                    write_error = Some(e);
                }
            }
        })
        .await?;

    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedModel;
    use crate::agent::ChatMessage;
    use crate::tools::AgentTool;
    use crate::wallet::testing::MockWallet;
    use std::collections::HashMap;
    use tempfile::tempdir;

    const ANVIL_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn runner(config: Config) -> AgentRunner {
        let urls = HashMap::from([
            (8453, "http://127.0.0.1:8545".to_string()),
            (84532, "http://127.0.0.1:8546".to_string()),
        ]);
        AgentRunner::new(config).with_rpc_config(RpcConfig::with_urls(urls))
    }

    fn text_agent(replies: Vec<ChatMessage>) -> (ReactAgent, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(replies));
        (ReactAgent::new(model.clone(), ToolRegistry::new()), model)
    }

    #[test]
    fn parses_modes() {
        assert_eq!("1".parse::<Mode>().unwrap(), Mode::Chat);
        assert_eq!(" CHAT ".parse::<Mode>().unwrap(), Mode::Chat);
        assert_eq!("2".parse::<Mode>().unwrap(), Mode::Auto);
        assert_eq!("auto".parse::<Mode>().unwrap(), Mode::Auto);
        assert!("3".parse::<Mode>().is_err());
    }

    #[tokio::test]
    async fn choose_mode_reprompts_on_invalid_input() {
        let mut input: &[u8] = b"3\nauto\n";
        let mut output = Vec::new();

        let mode = choose_mode(&mut input, &mut output).await.unwrap();
        assert_eq!(mode, Mode::Auto);

        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Available modes:").count(), 2);
        assert!(printed.contains("Invalid choice. Please try again."));
    }

    #[tokio::test]
    async fn choose_mode_fails_on_closed_input() {
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        assert!(choose_mode(&mut input, &mut output).await.is_err());
    }

    #[tokio::test]
    async fn chat_prints_chunks_until_exit() {
        let (agent, model) = text_agent(vec![ChatMessage::assistant("Hi there")]);
        let mut input: &[u8] = b"hello\n\nEXIT\nnever sent\n";
        let mut output = Vec::new();

        run_chat(&agent, "thread", &mut input, &mut output)
            .await
            .unwrap();

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("Starting chat mode... Type 'exit' to end.\n"));
        assert!(printed.contains(&format!("Hi there\n{}\n", CHUNK_SEPARATOR)));
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn chat_survives_model_errors() {
        let (agent, _model) = text_agent(vec![]);
        let mut input: &[u8] = b"hello\nexit\n";
        let mut output = Vec::new();

        run_chat(&agent, "thread", &mut input, &mut output)
            .await
            .unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.contains("Error: Model backend error"));
    }

    #[tokio::test]
    async fn autonomous_mode_sends_fixed_thought() {
        let (agent, model) = text_agent(vec![
            ChatMessage::assistant("minted"),
            ChatMessage::assistant("rebalanced"),
        ]);
        let mut output = Vec::new();

        run_autonomous(&agent, "thread", Duration::ZERO, Some(2), &mut output)
            .await
            .unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0][1], ChatMessage::user(AUTONOMOUS_THOUGHT));
        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with("Starting autonomous mode...\n"));
        assert!(printed.contains("rebalanced"));
    }

    #[tokio::test]
    async fn autonomous_history_is_windowed() {
        let mut config = Config::default();
        config.agent.max_history_turns = 2;
        let model = Arc::new(ScriptedModel::new(
            (0..5).map(|round| ChatMessage::assistant(format!("round {}", round))).collect(),
        ));
        let agent = runner(config).build_agent(model.clone(), ToolRegistry::new());
        let mut output = Vec::new();

        run_autonomous(&agent, "thread", Duration::ZERO, Some(5), &mut output)
            .await
            .unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 5);
        // system prompt, two remembered turns, the new thought
        assert_eq!(requests[4].len(), 1 + 2 * 2 + 1);
        assert_eq!(requests[4][2], ChatMessage::assistant("round 2"));
        assert_eq!(agent.memory().history("thread").await.len(), 4);
    }

    #[test]
    fn wallet_is_created_once_and_reused() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.agent.wallet_data_file = dir.path().join("wallet_data.txt");
        let runner = runner(config);

        let (first, network) = runner.load_or_create_wallet().unwrap();
        assert_eq!(network, Network::BaseSepolia);
        assert!(dir.path().join("wallet_data.txt").exists());

        let (second, _) = runner.load_or_create_wallet().unwrap();
        assert_eq!(first.address(), second.address());
        assert_eq!(first.wallet_id(), second.wallet_id());
    }

    #[test]
    fn build_tools_picks_rebalance_variant() {
        let mut wallet = MockWallet::new();
        wallet.address = ANVIL_ADDRESS.to_string();
        let wallet: Arc<dyn Wallet> = Arc::new(wallet);

        let discover = runner(Config::default());
        let tools = discover
            .build_tools(wallet.clone(), "http://127.0.0.1:8545")
            .unwrap();
        assert_eq!(
            tools.names(),
            vec!["get_balance", "get_wallet_details", "rebalance_liquidity"]
        );
        let schema = tools.get("rebalance_liquidity").unwrap().input_schema();
        assert!(schema["properties"].get("existing_position").is_none());

        let mut config = Config::default();
        config.agent.discover_positions = false;
        let explicit = runner(config)
            .build_tools(wallet, "http://127.0.0.1:8545")
            .unwrap();
        let schema = explicit.get("rebalance_liquidity").unwrap().input_schema();
        assert!(schema["properties"].get("existing_position").is_some());
    }

    #[test]
    fn missing_rpc_url_is_config_error() {
        let runner = AgentRunner::new(Config::default()).with_rpc_config(RpcConfig::with_urls(HashMap::new()));
        assert!(matches!(
            runner.rpc_url(Network::BaseMainnet),
            Err(Error::Config(_))
        ));
    }
}
