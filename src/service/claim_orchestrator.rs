//! 多链领取编排
//!
//! 持有唯一的 ClaimState 表，对外提供：
//! - 可领取列表（按法币价值排序，失败链沉底）
//! - 总价值 / 聚合 loading 标志
//! - 单链领取、全部领取、确认错误、展开/收起

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use futures::future::join_all;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::ClaimConfig,
    domain::{
        chain_config::{ChainProfile, ChainRegistry, Currency},
        claim_state::{BeginOutcome, ClaimState, ClaimStateStore},
        reward::PendingRewards,
    },
    error::{ClaimError, OrchestratorError},
    service::{
        balance_guard::BalanceGuard,
        claim_executor::{ClaimExecutor, ClaimMode, ClaimRequest},
        gas_estimator::FeeEstimator,
        price_service::PriceFeed,
        query_client::QueryClient,
        reward_query::{RewardQuery, StakingSummary},
        signer::ClaimSigner,
    },
};

/// 可领取列表中的一项（每次读取重新计算）
#[derive(Debug, Clone, PartialEq)]
pub struct ViewToken {
    pub chain_id: String,
    pub chain_name: String,
    /// 质押币种待领取总额（最小单位）
    pub reward_amount: Decimal,
    pub currency: Currency,
    /// 无价格时为空，排序时视为 0
    pub fiat_value: Option<Decimal>,
    pub state: ClaimState,
}

impl ViewToken {
    pub fn has_failure(&self) -> bool {
        self.state.failure().is_some()
    }
}

/// 排序：先按法币价值降序，再把带错误的链稳定地移到末尾
pub fn sort_view_tokens(tokens: &mut [ViewToken]) {
    tokens.sort_by(|a, b| {
        let a_value = a.fiat_value.unwrap_or(Decimal::ZERO);
        let b_value = b.fiat_value.unwrap_or(Decimal::ZERO);
        b_value.cmp(&a_value)
    });
    tokens.sort_by_key(ViewToken::has_failure);
}

/// 单链领取请求的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDispatch {
    /// 已开始，携带尝试 ID
    Started(Uuid),
    /// 已有进行中的领取，本次忽略
    AlreadyLoading,
    /// 该链处于失败状态，本次操作视为确认错误
    Acknowledged,
    /// 没有可领取奖励的验证人
    NothingToClaim,
}

/// 全部领取的调度结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimAllReport {
    pub expanded: bool,
    /// 签名器不支持批量签名时只展开列表
    pub expand_only: bool,
    pub started: Vec<String>,
    pub already_loading: Vec<String>,
    pub nothing_to_claim: Vec<String>,
    pub missing_account: Vec<String>,
}

pub struct ClaimOrchestrator {
    registry: Arc<ChainRegistry>,
    /// chain_id -> 账户地址
    accounts: HashMap<String, String>,
    rewards: Arc<RewardQuery>,
    price_feed: Arc<dyn PriceFeed>,
    states: ClaimStateStore,
    executor: Arc<ClaimExecutor>,
    display_fiat: String,
    max_validators_per_tx: usize,
    expanded: AtomicBool,
}

impl ClaimOrchestrator {
    pub fn new(
        config: &ClaimConfig,
        registry: ChainRegistry,
        accounts: HashMap<String, String>,
        query_client: Arc<dyn QueryClient>,
        price_feed: Arc<dyn PriceFeed>,
        signer: Arc<dyn ClaimSigner>,
    ) -> Self {
        let states = ClaimStateStore::new();
        let rewards = Arc::new(RewardQuery::new(query_client.clone()));
        let executor = Arc::new(ClaimExecutor::new(
            states.clone(),
            rewards.clone(),
            Arc::new(FeeEstimator::new(price_feed.clone(), config)),
            Arc::new(BalanceGuard::new(query_client)),
            signer,
            config,
        ));

        Self {
            registry: Arc::new(registry),
            accounts,
            rewards,
            price_feed,
            states,
            executor,
            display_fiat: config.display_fiat.clone(),
            max_validators_per_tx: config.max_validators_per_tx,
            expanded: AtomicBool::new(false),
        }
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn address_of(&self, chain_id: &str) -> Option<&str> {
        self.accounts.get(chain_id).map(String::as_str)
    }

    fn profile(&self, chain_id: &str) -> Result<&ChainProfile, OrchestratorError> {
        self.registry
            .get(chain_id)
            .ok_or_else(|| OrchestratorError::UnknownChain(chain_id.to_string()))
    }

    fn account(&self, chain_id: &str) -> Result<&str, OrchestratorError> {
        self.address_of(chain_id)
            .ok_or_else(|| OrchestratorError::AccountMissing(chain_id.to_string()))
    }

    /// 并发刷新所有有账户的链的待领取奖励
    ///
    /// 单链失败只体现在返回值里，缓存保留上一次成功结果。
    pub async fn refresh_rewards(&self) -> Vec<(String, Result<PendingRewards, ClaimError>)> {
        let fetches = self.registry.list_chains().iter().filter_map(|profile| {
            let address = self.address_of(&profile.chain_id)?;
            let rewards = &self.rewards;
            Some(async move {
                let result = rewards
                    .fetch_pending_rewards(&profile.chain_id, address)
                    .await;
                (profile.chain_id.clone(), result)
            })
        });

        let results = join_all(fetches).await;
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        tracing::info!(chains = results.len(), failed, "Pending rewards refreshed");
        results
    }

    /// 单链的当前状态（首次访问时创建）
    pub async fn claim_state(&self, chain_id: &str) -> Result<ClaimState, OrchestratorError> {
        self.profile(chain_id)?;
        Ok(self.states.get(chain_id).await)
    }

    /// 可领取列表，已排序
    pub async fn claimable_chains(&self) -> Vec<ViewToken> {
        let mut tokens = Vec::new();

        for profile in self.registry.list_chains() {
            let Some(stake) = profile.stake_currency.as_ref() else {
                continue;
            };
            if profile.fee_currencies.is_empty() {
                continue;
            }
            let Some(address) = self.address_of(&profile.chain_id) else {
                continue;
            };

            let reward = self
                .rewards
                .stakable_reward(&profile.chain_id, address, stake)
                .await;
            if reward <= Decimal::ZERO {
                continue;
            }

            tokens.push(ViewToken {
                chain_id: profile.chain_id.clone(),
                chain_name: profile.chain_name.clone(),
                reward_amount: reward,
                currency: stake.clone(),
                fiat_value: self
                    .price_feed
                    .calculate_fiat_price(reward, stake, &self.display_fiat),
                state: self.states.get(&profile.chain_id).await,
            });
        }

        sort_view_tokens(&mut tokens);
        tokens
    }

    /// 可领取奖励的法币总值；展示法币不可用时为空
    pub async fn total_claimable_value(&self) -> Option<Decimal> {
        if !self.price_feed.supports_fiat(&self.display_fiat) {
            return None;
        }

        Some(
            self.claimable_chains()
                .await
                .iter()
                .filter_map(|token| token.fiat_value)
                .sum(),
        )
    }

    /// 是否有任何链处于 loading
    pub async fn is_claim_all_loading(&self) -> bool {
        self.states.any_loading().await
    }

    pub async fn is_claim_all_disabled(&self) -> bool {
        self.claimable_chains().await.is_empty()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    /// 改变展开状态；状态变化且没有进行中的领取时清除所有错误
    pub async fn set_expanded(&self, expanded: bool) {
        let previous = self.expanded.swap(expanded, Ordering::SeqCst);
        if previous != expanded && !self.states.any_loading().await {
            let cleared = self.states.acknowledge_all_failed().await;
            if cleared > 0 {
                tracing::debug!(cleared, expanded, "Cleared claim failures on expansion change");
            }
        }
    }

    pub async fn toggle_expanded(&self) -> bool {
        let expanded = !self.is_expanded();
        self.set_expanded(expanded).await;
        expanded
    }

    /// 全部领取：展开列表，并为每条可领取链独立启动领取任务（不等待完成）
    pub async fn claim_all(&self) -> ClaimAllReport {
        let tokens = self.claimable_chains().await;
        let mut report = ClaimAllReport::default();

        if !tokens.is_empty() {
            self.set_expanded(true).await;
            report.expanded = true;
        }

        if !self.executor.signer().supports_batch_signing() {
            tracing::info!("Signer cannot batch sign, claim all only expands the list");
            report.expand_only = true;
            return report;
        }

        for token in tokens {
            let Some(address) = self.address_of(&token.chain_id) else {
                report.missing_account.push(token.chain_id);
                continue;
            };

            let validators = self
                .rewards
                .top_validators(
                    &token.chain_id,
                    address,
                    &token.currency,
                    self.max_validators_per_tx,
                )
                .await;
            if validators.is_empty() {
                report.nothing_to_claim.push(token.chain_id);
                continue;
            }

            match self.states.begin(&token.chain_id, true).await {
                BeginOutcome::Started(attempt_id) => {
                    let fee_currency = self
                        .registry
                        .resolve_fee_currency(&token.chain_id)
                        .cloned();
                    self.executor.spawn(ClaimRequest {
                        chain_id: token.chain_id.clone(),
                        address: address.to_string(),
                        validators,
                        stake_currency: token.currency,
                        fee_currency,
                        mode: ClaimMode::Batch,
                        attempt_id,
                    });
                    report.started.push(token.chain_id);
                }
                BeginOutcome::AlreadyLoading | BeginOutcome::AwaitingAcknowledgement => {
                    report.already_loading.push(token.chain_id);
                }
            }
        }

        tracing::info!(
            started = report.started.len(),
            already_loading = report.already_loading.len(),
            "Claim all dispatched"
        );
        report
    }

    /// 单链领取；失败状态下调用视为确认错误
    pub async fn claim_one(&self, chain_id: &str) -> Result<ClaimDispatch, OrchestratorError> {
        let profile = self.profile(chain_id)?;
        let address = self.account(chain_id)?;

        let Some(stake_currency) = profile.stake_currency.as_ref() else {
            return Ok(ClaimDispatch::NothingToClaim);
        };

        let validators = self
            .rewards
            .top_validators(chain_id, address, stake_currency, self.max_validators_per_tx)
            .await;

        if validators.is_empty() {
            return Ok(if self.states.acknowledge(chain_id).await {
                ClaimDispatch::Acknowledged
            } else {
                ClaimDispatch::NothingToClaim
            });
        }

        match self.states.begin(chain_id, false).await {
            BeginOutcome::Started(attempt_id) => {
                self.executor.spawn(ClaimRequest {
                    chain_id: chain_id.to_string(),
                    address: address.to_string(),
                    validators,
                    stake_currency: stake_currency.clone(),
                    fee_currency: profile.stake_fee_currency().cloned(),
                    mode: ClaimMode::Single,
                    attempt_id,
                });
                Ok(ClaimDispatch::Started(attempt_id))
            }
            BeginOutcome::AlreadyLoading => Ok(ClaimDispatch::AlreadyLoading),
            BeginOutcome::AwaitingAcknowledgement => {
                self.states.acknowledge(chain_id).await;
                Ok(ClaimDispatch::Acknowledged)
            }
        }
    }

    /// 确认错误（Failed -> Idle）；返回是否发生转换
    pub async fn dismiss(&self, chain_id: &str) -> Result<bool, OrchestratorError> {
        self.profile(chain_id)?;
        Ok(self.states.acknowledge(chain_id).await)
    }

    /// 质押概览（待领取奖励 + 通胀率）
    pub async fn staking_summary(
        &self,
        chain_id: &str,
    ) -> Result<Option<StakingSummary>, OrchestratorError> {
        let profile = self.profile(chain_id)?;
        let address = self.account(chain_id)?;
        Ok(self.rewards.staking_summary(profile, address).await)
    }
}
