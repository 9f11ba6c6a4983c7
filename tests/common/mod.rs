//! Shared fakes for integration testing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use swap_session::blockchain::types::{
    AddLiquidity, ChainError, ChainResult, ExactInSwap, ExactOutSwap, PairReserves,
    RemoveLiquidity, TxReceipt,
};
use swap_session::blockchain::units;
use swap_session::blockchain::ChainClient;
use swap_session::config::{AppConfig, TokenRef};
use swap_session::session::{
    AddChainParams, Notifier, SessionManager, WalletError, WalletEvent, WalletProvider,
};
use swap_session::SwapOrchestrator;

pub const CHAIN_ID: u64 = 31337;
pub const OTHER_CHAIN_ID: u64 = 1;

pub fn account() -> Address {
    Address::repeat_byte(0xAA)
}

pub fn other_account() -> Address {
    Address::repeat_byte(0xBB)
}

pub fn router() -> Address {
    Address::repeat_byte(0x0E)
}

pub fn tka() -> TokenRef {
    TokenRef {
        address: Address::repeat_byte(0x01),
        symbol: "TKA".to_string(),
        name: "Token A".to_string(),
        decimals: 18,
    }
}

pub fn tkb() -> TokenRef {
    TokenRef {
        address: Address::repeat_byte(0x02),
        symbol: "TKB".to_string(),
        name: "Token B".to_string(),
        decimals: 18,
    }
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.network.chain_id = CHAIN_ID;
    config.network.name = "Local".to_string();
    config.network.rpc_url = "http://localhost:8545".to_string();
    config.contracts.router = router();
    config.contracts.factory = Address::repeat_byte(0x0F);
    config.tokens = vec![tka(), tkb()];
    config
}

/// Parse a whole-token amount with 18 decimals.
pub fn amount(text: &str) -> U256 {
    units::parse_amount(text, 18).unwrap()
}

/// Let spawned tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

/// Scriptable injected wallet.
pub struct FakeWallet {
    pub authorized: AtomicBool,
    pub reject_requests: AtomicBool,
    pub reject_add: AtomicBool,
    pub request_delay: Mutex<Duration>,
    chain_id: Mutex<u64>,
    known_chains: Mutex<HashSet<u64>>,
    accounts: Mutex<Vec<Address>>,
    pub switch_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    events: broadcast::Sender<WalletEvent>,
}

impl FakeWallet {
    pub fn new(chain_id: u64) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            authorized: AtomicBool::new(false),
            reject_requests: AtomicBool::new(false),
            reject_add: AtomicBool::new(false),
            request_delay: Mutex::new(Duration::ZERO),
            chain_id: Mutex::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            accounts: Mutex::new(vec![account()]),
            switch_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            events,
        })
    }

    /// Simulate a user action in the wallet UI.
    pub fn emit(&self, event: WalletEvent) {
        match &event {
            WalletEvent::AccountsChanged(accounts) => {
                *self.accounts.lock().unwrap() = accounts.clone();
            }
            WalletEvent::ChainChanged(chain_id) => {
                *self.chain_id.lock().unwrap() = *chain_id;
            }
        }
        let _ = self.events.send(event);
    }

    pub fn current_chain(&self) -> u64 {
        *self.chain_id.lock().unwrap()
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        let delay = *self.request_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        if self.authorized.load(Ordering::SeqCst) {
            Ok(self.accounts.lock().unwrap().clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.known_chains.lock().unwrap().contains(&chain_id) {
            return Err(WalletError::from_code(4902, "Unrecognized chain ID", chain_id));
        }
        if self.current_chain() != chain_id {
            self.emit(WalletEvent::ChainChanged(chain_id));
        }
        Ok(())
    }

    async fn add_chain(&self, params: AddChainParams) -> Result<(), WalletError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_add.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        self.known_chains.lock().unwrap().insert(params.chain_id);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// In-memory router and tokens. Quotes pay `amount × rate_num / rate_den`.
pub struct FakeChain {
    balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    rate: Mutex<(u64, u64)>,
    quote_delays: Mutex<HashMap<U256, Duration>>,
    pub balance_delay: Mutex<Duration>,
    pub tx_delay: Mutex<Duration>,
    pub no_route: AtomicBool,
    pub fail_approve: AtomicBool,
    pub fail_swap: AtomicBool,
    pub quote_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub allowance_calls: AtomicUsize,
    pub approve_calls: AtomicUsize,
    pub swap_calls: AtomicUsize,
    pub last_swap: Mutex<Option<ExactInSwap>>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            balances: Mutex::new(HashMap::new()),
            allowances: Mutex::new(HashMap::new()),
            rate: Mutex::new((995, 1000)),
            quote_delays: Mutex::new(HashMap::new()),
            balance_delay: Mutex::new(Duration::ZERO),
            tx_delay: Mutex::new(Duration::ZERO),
            no_route: AtomicBool::new(false),
            fail_approve: AtomicBool::new(false),
            fail_swap: AtomicBool::new(false),
            quote_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            allowance_calls: AtomicUsize::new(0),
            approve_calls: AtomicUsize::new(0),
            swap_calls: AtomicUsize::new(0),
            last_swap: Mutex::new(None),
        })
    }

    pub fn set_balance(&self, token: Address, owner: Address, value: U256) {
        self.balances.lock().unwrap().insert((token, owner), value);
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.balances
            .lock()
            .unwrap()
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, value: U256) {
        self.allowances
            .lock()
            .unwrap()
            .insert((token, owner, spender), value);
    }

    pub fn set_rate(&self, num: u64, den: u64) {
        *self.rate.lock().unwrap() = (num, den);
    }

    /// Delay the quote for one specific input amount.
    pub fn delay_quote(&self, amount_in: U256, delay: Duration) {
        self.quote_delays.lock().unwrap().insert(amount_in, delay);
    }

    fn quote(&self, amount_in: U256) -> U256 {
        let (num, den) = *self.rate.lock().unwrap();
        amount_in * U256::from(num) / U256::from(den)
    }

    async fn mined(&self) -> TxReceipt {
        let delay = *self.tx_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        let nonce = self.approve_calls.load(Ordering::SeqCst) + self.swap_calls.load(Ordering::SeqCst);
        TxReceipt {
            tx_hash: TxHash::repeat_byte(nonce as u8),
            block_number: Some(100 + nonce as u64),
        }
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn balance_of(&self, token: Address, account: Address) -> ChainResult<U256> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.balance_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        Ok(self.balance(token, account))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> ChainResult<U256> {
        self.allowance_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .allowances
            .lock()
            .unwrap()
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn amounts_out(&self, amount_in: U256, path: &[Address]) -> ChainResult<Vec<U256>> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self
            .quote_delays
            .lock()
            .unwrap()
            .get(&amount_in)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        if self.no_route.load(Ordering::SeqCst) {
            return Err(ChainError::Reverted("UniswapV2Library: INSUFFICIENT_LIQUIDITY".into()));
        }
        assert_eq!(path.len(), 2);
        Ok(vec![amount_in, self.quote(amount_in)])
    }

    async fn amounts_in(&self, amount_out: U256, _path: &[Address]) -> ChainResult<Vec<U256>> {
        let (num, den) = *self.rate.lock().unwrap();
        Ok(vec![amount_out * U256::from(den) / U256::from(num), amount_out])
    }

    async fn pair_reserves(&self, token_a: Address, token_b: Address) -> ChainResult<Option<PairReserves>> {
        Ok(Some(PairReserves {
            pair: Address::repeat_byte(0x0C),
            reserve0: self.balance(token_a, Address::repeat_byte(0x0C)),
            reserve1: self.balance(token_b, Address::repeat_byte(0x0C)),
            block_timestamp_last: 0,
        }))
    }

    async fn token_info(&self, token: Address) -> ChainResult<TokenRef> {
        [tka(), tkb()]
            .into_iter()
            .find(|t| t.address == token)
            .ok_or_else(|| ChainError::Rpc("execution reverted".into()))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> ChainResult<TxReceipt> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        let receipt = self.mined().await;
        if self.fail_approve.load(Ordering::SeqCst) {
            return Err(ChainError::Wallet("user rejected transaction".into()));
        }
        self.set_allowance(token, account(), spender, amount);
        Ok(receipt)
    }

    async fn swap_exact_in(&self, order: ExactInSwap) -> ChainResult<TxReceipt> {
        self.swap_calls.fetch_add(1, Ordering::SeqCst);
        let receipt = self.mined().await;
        if self.fail_swap.load(Ordering::SeqCst) {
            return Err(ChainError::Reverted("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT".into()));
        }
        let (from, to) = (order.path[0], order.path[1]);
        let out = self.quote(order.amount_in);
        let from_balance = self.balance(from, order.recipient);
        self.set_balance(from, order.recipient, from_balance - order.amount_in);
        let to_balance = self.balance(to, order.recipient);
        self.set_balance(to, order.recipient, to_balance + out);
        *self.last_swap.lock().unwrap() = Some(order);
        Ok(receipt)
    }

    async fn swap_exact_out(&self, _order: ExactOutSwap) -> ChainResult<TxReceipt> {
        Ok(self.mined().await)
    }

    async fn add_liquidity(&self, _order: AddLiquidity) -> ChainResult<TxReceipt> {
        Ok(self.mined().await)
    }

    async fn remove_liquidity(&self, _order: RemoveLiquidity) -> ChainResult<TxReceipt> {
        Ok(self.mined().await)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub wallet: Arc<FakeWallet>,
    pub chain: Arc<FakeChain>,
    pub session: SessionManager,
    pub orchestrator: SwapOrchestrator,
}

impl Harness {
    /// Orchestrator over a fresh session, not yet connected.
    pub fn new() -> Self {
        let wallet = FakeWallet::new(CHAIN_ID);
        let chain = FakeChain::new();
        let provider: Arc<dyn WalletProvider> = wallet.clone();
        let session = SessionManager::new(Some(provider), config().network, Notifier::new());
        let client: Arc<dyn ChainClient> = chain.clone();
        let orchestrator = SwapOrchestrator::new(client, &session, &config(), tka(), tkb()).unwrap();
        orchestrator.start();
        Self {
            wallet,
            chain,
            session,
            orchestrator,
        }
    }

    /// Connected, funded with 1000 TKA and an unlimited router allowance.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.chain.set_balance(tka().address, account(), amount("1000"));
        harness
            .chain
            .set_allowance(tka().address, account(), router(), U256::MAX);
        harness.session.connect().await.unwrap();
        settle().await;
        harness
    }

    /// Enter an amount and wait out the debounce and the quote.
    pub async fn quote(&self, text: &str) {
        self.orchestrator.set_from_amount(text);
        tokio::time::sleep(Duration::from_millis(600)).await;
    }
}
