//! 测试辅助模块
//! 三个外部能力的内存实现（记录调用次数）以及常用的链/配置构造函数

#![allow(dead_code)]

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use ironclaim::{
    config::ClaimConfig,
    domain::{
        ChainProfile, ChainRegistry, Currency, FeeCurrency, GasPriceStep, RewardRecord, StdFee,
        WithdrawRewardMsg,
    },
    service::{
        BroadcastOutcome, CachedPriceFeed, ClaimOrchestrator, ClaimSigner, PriceFeed,
        PriceSnapshot, QueryClient, SignerError, SimulateResponse,
    },
};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// 默认领取配置（与环境变量无关）
pub fn test_config() -> ClaimConfig {
    ClaimConfig {
        gas_adjustment: dec("1.5"),
        low_tier_threshold: dec("0.2"),
        reference_fiat: "usd".into(),
        display_fiat: "usd".into(),
        settle_delay_ms: 1000,
        price_wait_timeout_secs: 10,
        broadcast_timeout_secs: 120,
        max_validators_per_tx: 8,
        default_gas_per_validator: 140_000,
        memo: String::new(),
        chains_file: None,
    }
}

/// `u{symbol}` 最小单位、6 位小数、coingecko id 为小写符号
pub fn currency(symbol: &str) -> Currency {
    let lower = symbol.to_lowercase();
    Currency::new(symbol, &format!("u{}", lower), 6).with_coingecko_id(&lower)
}

/// 质押币种即手续费币种，gas 单价 low/average/high = 0.01/0.025/0.04
pub fn chain(chain_id: &str, symbol: &str) -> ChainProfile {
    let cur = currency(symbol);
    ChainProfile {
        chain_id: chain_id.to_string(),
        chain_name: chain_id.to_string(),
        stake_currency: Some(cur.clone()),
        fee_currencies: vec![FeeCurrency {
            currency: cur,
            gas_price_step: Some(GasPriceStep {
                low: dec("0.01"),
                average: dec("0.025"),
                high: dec("0.04"),
            }),
        }],
    }
}

pub fn address_for(chain_id: &str) -> String {
    format!("{}-delegator", chain_id)
}

pub fn reward(chain_id: &str, validator: &str, amount: Decimal, cur: &Currency) -> RewardRecord {
    RewardRecord {
        chain_id: chain_id.to_string(),
        validator_address: validator.to_string(),
        amount,
        currency: cur.clone(),
    }
}

/// 价格快照：coingecko id -> usd
pub fn snapshot(prices: &[(&str, &str)]) -> PriceSnapshot {
    PriceSnapshot::new(
        prices
            .iter()
            .map(|(id, usd)| {
                let mut by_fiat = HashMap::new();
                by_fiat.insert("usd".to_string(), dec(usd));
                (id.to_string(), by_fiat)
            })
            .collect(),
    )
}

// ============ 查询能力 ============

#[derive(Default)]
pub struct FakeQueryClient {
    rewards: Mutex<HashMap<String, std::result::Result<Vec<RewardRecord>, String>>>,
    balances: Mutex<HashMap<(String, String), Decimal>>,
    inflation: Mutex<HashMap<String, Decimal>>,
    pub reward_fetches: AtomicUsize,
    pub balance_fetches: AtomicUsize,
}

impl FakeQueryClient {
    pub fn set_rewards(&self, chain_id: &str, records: Vec<RewardRecord>) {
        self.rewards
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), Ok(records));
    }

    pub fn fail_rewards(&self, chain_id: &str, cause: &str) {
        self.rewards
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), Err(cause.to_string()));
    }

    pub fn set_balance(&self, chain_id: &str, denom: &str, amount: Decimal) {
        self.balances
            .lock()
            .unwrap()
            .insert((chain_id.to_string(), denom.to_string()), amount);
    }

    pub fn set_inflation(&self, chain_id: &str, rate: Decimal) {
        self.inflation
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), rate);
    }
}

#[async_trait]
impl QueryClient for FakeQueryClient {
    async fn get_pending_rewards(&self, chain_id: &str, _address: &str) -> Result<Vec<RewardRecord>> {
        self.reward_fetches.fetch_add(1, Ordering::SeqCst);
        match self.rewards.lock().unwrap().get(chain_id) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(cause)) => Err(anyhow!(cause.clone())),
            None => Ok(vec![]),
        }
    }

    async fn get_balance(&self, chain_id: &str, _address: &str, denom: &str) -> Result<Option<Decimal>> {
        self.balance_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&(chain_id.to_string(), denom.to_string()))
            .copied())
    }

    async fn get_inflation_rate(&self, chain_id: &str) -> Result<Decimal> {
        self.inflation
            .lock()
            .unwrap()
            .get(chain_id)
            .copied()
            .ok_or_else(|| anyhow!("inflation not available for {}", chain_id))
    }
}

// ============ 签名能力 ============

/// 广播行为
#[derive(Debug, Clone)]
pub enum BroadcastBehavior {
    Outcome(BroadcastOutcome),
    Error(SignerError),
    /// 永不返回
    Hang,
    /// 延迟后返回
    Delayed(Duration, BroadcastOutcome),
}

/// 一次签名调用的记录
#[derive(Debug, Clone)]
pub struct SignCall {
    pub chain_id: String,
    pub messages: Vec<WithdrawRewardMsg>,
    pub fee: StdFee,
}

pub struct FakeSigner {
    batch_signing: bool,
    simulations: Mutex<HashMap<String, std::result::Result<u64, SignerError>>>,
    broadcasts: Mutex<HashMap<String, BroadcastBehavior>>,
    pub simulate_calls: AtomicUsize,
    /// 签名广播调用实际返回的次数
    pub completed_broadcasts: AtomicUsize,
    sign_calls: Mutex<Vec<SignCall>>,
}

impl FakeSigner {
    /// 默认：模拟用量 100000，广播成功
    pub fn new(batch_signing: bool) -> Self {
        Self {
            batch_signing,
            simulations: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(HashMap::new()),
            simulate_calls: AtomicUsize::new(0),
            completed_broadcasts: AtomicUsize::new(0),
            sign_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_gas_used(&self, chain_id: &str, gas_used: u64) {
        self.simulations
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), Ok(gas_used));
    }

    pub fn fail_simulation(&self, chain_id: &str, err: SignerError) {
        self.simulations
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), Err(err));
    }

    pub fn set_broadcast(&self, chain_id: &str, behavior: BroadcastBehavior) {
        self.broadcasts
            .lock()
            .unwrap()
            .insert(chain_id.to_string(), behavior);
    }

    pub fn sign_calls(&self) -> Vec<SignCall> {
        self.sign_calls.lock().unwrap().clone()
    }

    pub fn sign_calls_for(&self, chain_id: &str) -> usize {
        self.sign_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.chain_id == chain_id)
            .count()
    }
}

#[async_trait]
impl ClaimSigner for FakeSigner {
    fn supports_batch_signing(&self) -> bool {
        self.batch_signing
    }

    async fn simulate(
        &self,
        chain_id: &str,
        _messages: &[WithdrawRewardMsg],
        _memo: &str,
    ) -> std::result::Result<SimulateResponse, SignerError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        match self.simulations.lock().unwrap().get(chain_id) {
            Some(Ok(gas_used)) => Ok(SimulateResponse { gas_used: *gas_used }),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(SimulateResponse { gas_used: 100_000 }),
        }
    }

    async fn sign_and_broadcast(
        &self,
        chain_id: &str,
        messages: &[WithdrawRewardMsg],
        fee: &StdFee,
        _memo: &str,
    ) -> std::result::Result<BroadcastOutcome, SignerError> {
        self.sign_calls.lock().unwrap().push(SignCall {
            chain_id: chain_id.to_string(),
            messages: messages.to_vec(),
            fee: fee.clone(),
        });

        let behavior = self.broadcasts.lock().unwrap().get(chain_id).cloned();
        let result = match behavior {
            Some(BroadcastBehavior::Outcome(outcome)) => Ok(outcome),
            Some(BroadcastBehavior::Error(err)) => Err(err),
            Some(BroadcastBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(BroadcastBehavior::Delayed(delay, outcome)) => {
                tokio::time::sleep(delay).await;
                Ok(outcome)
            }
            None => Ok(BroadcastOutcome::Accepted {
                tx_hash: format!("{}-TX", chain_id.to_uppercase()),
            }),
        };
        self.completed_broadcasts.fetch_add(1, Ordering::SeqCst);
        result
    }
}

// ============ 组装 ============

pub struct Harness {
    pub orchestrator: Arc<ClaimOrchestrator>,
    pub query: Arc<FakeQueryClient>,
    pub signer: Arc<FakeSigner>,
    pub prices: Arc<CachedPriceFeed>,
}

impl Harness {
    /// 每条链都有账户；价格已发布
    pub fn new(chains: Vec<ChainProfile>, prices: &[(&str, &str)], batch_signing: bool) -> Self {
        let feed = Arc::new(CachedPriceFeed::new(["usd"]));
        if !prices.is_empty() {
            feed.publish_snapshot(snapshot(prices));
        }
        Self::with_feed(chains, feed, batch_signing, test_config())
    }

    pub fn with_feed(
        chains: Vec<ChainProfile>,
        feed: Arc<CachedPriceFeed>,
        batch_signing: bool,
        config: ClaimConfig,
    ) -> Self {
        let accounts = chains
            .iter()
            .map(|c| (c.chain_id.clone(), address_for(&c.chain_id)))
            .collect();
        let query = Arc::new(FakeQueryClient::default());
        let signer = Arc::new(FakeSigner::new(batch_signing));
        let price_feed: Arc<dyn PriceFeed> = feed.clone();

        let orchestrator = Arc::new(ClaimOrchestrator::new(
            &config,
            ChainRegistry::from_profiles(chains),
            accounts,
            query.clone(),
            price_feed,
            signer.clone(),
        ));

        Self {
            orchestrator,
            query,
            signer,
            prices: feed,
        }
    }

    /// 设置某链的单个验证人奖励与充足余额
    pub fn fund(&self, profile: &ChainProfile, reward_amount: Decimal) {
        let Some(stake) = profile.stake_currency.as_ref() else {
            return;
        };
        self.query.set_rewards(
            &profile.chain_id,
            vec![reward(&profile.chain_id, "valoper1", reward_amount, stake)],
        );
        self.query.set_balance(
            &profile.chain_id,
            &stake.coin_minimal_denom,
            Decimal::from(10_000_000),
        );
    }

    /// 等待所有链离开 loading（配合暂停时钟使用）
    pub async fn settle(&self) {
        for _ in 0..1_000 {
            if !self.orchestrator.is_claim_all_loading().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("claims did not settle");
    }
}
