//! Command-line client for the swap session.
//!
//! Reads run against the configured RPC endpoint; writes sign with the key in
//! `SWAP_WALLET_PRIVATE_KEY`. Every command prints JSON to stdout and logs
//! to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use serde_json::json;

use swap_session::blockchain::units;
use swap_session::blockchain::{ChainClient, LocalWallet, RpcChainClient};
use swap_session::config::{load_config, AppConfig, TokenRef};
use swap_session::observability::logging::init_logging;
use swap_session::session::{Notifier, SessionManager, WalletProvider};
use swap_session::swap::{quote, ApprovalDecision, SwapOrchestrator};

const SETTLE_POLL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "swap-cli")]
#[command(about = "Quote and execute Uniswap-V2 swaps from the terminal", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Built-in Sepolia defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balances of the configured tokens
    Balances {
        /// Account to inspect. Defaults to the wallet address.
        #[arg(long)]
        account: Option<Address>,
    },
    /// Quote an exact-input swap
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        slippage_bps: Option<u32>,
    },
    /// Approve the router to spend a token
    Approve {
        #[arg(long)]
        token: String,
    },
    /// Quote, optionally approve, and execute a swap
    Swap {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
        #[arg(long)]
        slippage_bps: Option<u32>,
        /// Submit an approval first if the allowance is too low
        #[arg(long)]
        approve: bool,
    },
    /// Show the reserves of a pair
    Reserves {
        #[arg(long)]
        token_a: String,
        #[arg(long)]
        token_b: String,
    },
    /// Read ERC-20 metadata from chain
    TokenInfo {
        #[arg(long)]
        token: Address,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    init_logging(&config.observability.log_level);

    tracing::info!(
        chain_id = config.network.chain_id,
        router = %config.contracts.router,
        "swap-cli starting"
    );

    match cli.command {
        Commands::Balances { account } => {
            let chain = RpcChainClient::read_only(&config)?;
            let wallet_address = match account {
                Some(account) => account,
                None => LocalWallet::from_env(&config.network)?.address(),
            };
            let mut balances = Vec::new();
            for token in &config.tokens {
                let balance = chain.balance_of(token.address, wallet_address).await?;
                balances.push(json!({
                    "symbol": token.symbol,
                    "address": token.address,
                    "balance": units::format_amount(balance, token.decimals),
                }));
            }
            print_json(&json!({ "account": wallet_address, "balances": balances }))?;
        }
        Commands::Quote {
            from,
            to,
            amount,
            slippage_bps,
        } => {
            let (from, to) = (resolve(&config, &from)?, resolve(&config, &to)?);
            let chain = RpcChainClient::read_only(&config)?;
            let amount_in = units::parse_amount(&amount, from.decimals)?;
            let amounts = chain
                .amounts_out(amount_in, &quote::direct_path(&from, &to))
                .await?;
            let Some(amount_out) = amounts.last().copied().filter(|out| !out.is_zero()) else {
                print_json(&json!({ "route": false }))?;
                return Ok(());
            };
            let slippage = slippage_bps.unwrap_or(config.swap.default_slippage_bps);
            let impact = quote::quote_impact_pct(&from, amount_in, &to, amount_out);
            print_json(&json!({
                "route": true,
                "from": from.symbol,
                "to": to.symbol,
                "amount_in": units::format_amount(amount_in, from.decimals),
                "amount_out": units::format_amount(amount_out, to.decimals),
                "amount_out_min": units::format_amount(
                    units::apply_slippage(amount_out, slippage),
                    to.decimals
                ),
                "slippage_bps": slippage,
                "price_impact_pct": impact,
                "price_impact_warning": impact > config.swap.price_impact_warning_pct,
            }))?;
        }
        Commands::Approve { token } => {
            let token = resolve(&config, &token)?;
            let pair = other_token(&config, &token)?;
            let (orchestrator, _session) = connect(&config, token.clone(), pair).await?;
            let receipt = orchestrator.approve().await?;
            print_json(&json!({ "token": token.symbol, "receipt": receipt }))?;
        }
        Commands::Swap {
            from,
            to,
            amount,
            slippage_bps,
            approve,
        } => {
            let (from, to) = (resolve(&config, &from)?, resolve(&config, &to)?);
            let (orchestrator, _session) = connect(&config, from, to).await?;
            if let Some(bps) = slippage_bps {
                orchestrator.set_slippage_bps(bps)?;
            }
            orchestrator.refresh_balances().await?;
            orchestrator.set_from_amount(amount);
            settle(&orchestrator, &config).await;

            if orchestrator.approval_required() {
                if !approve {
                    return Err("allowance too low; rerun with --approve".into());
                }
                orchestrator.approve().await?;
            }
            let execution = orchestrator.swap().await?;
            let form = orchestrator.snapshot();
            print_json(&json!({
                "execution": execution,
                "from_balance": units::format_amount(form.from_balance, form.from_token.decimals),
                "to_balance": units::format_amount(form.to_balance, form.to_token.decimals),
            }))?;
            orchestrator.shutdown();
        }
        Commands::Reserves { token_a, token_b } => {
            let (a, b) = (resolve(&config, &token_a)?, resolve(&config, &token_b)?);
            let chain = RpcChainClient::read_only(&config)?;
            match chain.pair_reserves(a.address, b.address).await? {
                Some(reserves) => print_json(&json!({ "pair": reserves }))?,
                None => print_json(&json!({ "pair": null }))?,
            }
        }
        Commands::TokenInfo { token } => {
            let chain = RpcChainClient::read_only(&config)?;
            print_json(&chain.token_info(token).await?)?;
        }
    }

    Ok(())
}

/// Connect a key-backed session and start an orchestrator on it.
async fn connect(
    config: &AppConfig,
    from: TokenRef,
    to: TokenRef,
) -> Result<(SwapOrchestrator, SessionManager), Box<dyn std::error::Error>> {
    let wallet = LocalWallet::from_env(&config.network)?;
    let chain = RpcChainClient::with_signer(config, wallet.signer())?;
    let provider: Arc<dyn WalletProvider> = Arc::new(wallet);

    let session = SessionManager::new(Some(provider), config.network.clone(), Notifier::new());
    session.connect().await?;

    let orchestrator = SwapOrchestrator::new(Arc::new(chain), &session, config, from, to)?;
    orchestrator.start();
    Ok((orchestrator, session))
}

/// Wait until the quote and allowance check for the current amount land.
async fn settle(orchestrator: &SwapOrchestrator, config: &AppConfig) {
    let budget = Duration::from_millis(config.swap.quote_debounce_ms)
        + Duration::from_secs(config.chain.rpc_timeout_secs * 2);
    let waited = tokio::time::timeout(budget, async {
        loop {
            let form = orchestrator.snapshot();
            let quoted = !form.quoting && (form.quote.is_some() || !form.route_available);
            if quoted && form.approval.decision != ApprovalDecision::Undecided {
                break;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    })
    .await;
    if waited.is_err() {
        tracing::warn!(?budget, "Quote did not settle in time");
    }
}

fn resolve(config: &AppConfig, key: &str) -> Result<TokenRef, Box<dyn std::error::Error>> {
    config
        .token(key)
        .cloned()
        .ok_or_else(|| format!("unknown token '{}'", key).into())
}

fn other_token(config: &AppConfig, token: &TokenRef) -> Result<TokenRef, Box<dyn std::error::Error>> {
    config
        .tokens
        .iter()
        .find(|t| t.address != token.address)
        .cloned()
        .ok_or_else(|| "config needs at least two tokens".into())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
