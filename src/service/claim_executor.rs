//! 单链领取执行器
//!
//! 流水线（链内严格顺序）：
//! 手续费币种 -> 模拟 -> 手续费档位 -> 余额检查 -> 收益检查 -> 签名广播 -> 结算延迟
//!
//! 每次执行对应一个已经进入 Loading 的尝试（由 `ClaimStateStore::begin` 产生），
//! 结果只写回该尝试；任何失败都落在本链状态上，不影响其他链。

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::ClaimConfig,
    domain::{
        chain_config::{Currency, FeeCurrency},
        claim_state::ClaimStateStore,
        withdraw_tx::build_withdraw_messages,
    },
    error::ClaimError,
    service::{
        balance_guard::BalanceGuard,
        gas_estimator::FeeEstimator,
        reward_query::RewardQuery,
        signer::{BroadcastOutcome, ClaimSigner, SignerError},
    },
};

/// 领取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimMode {
    /// 批量领取：模拟失败即失败
    Batch,
    /// 单链领取：模拟失败时回退到静态 gas
    Single,
}

/// 一次领取尝试的输入
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub chain_id: String,
    pub address: String,
    pub validators: Vec<String>,
    pub stake_currency: Currency,
    pub fee_currency: Option<FeeCurrency>,
    pub mode: ClaimMode,
    pub attempt_id: Uuid,
}

pub struct ClaimExecutor {
    states: ClaimStateStore,
    rewards: Arc<RewardQuery>,
    fee_estimator: Arc<FeeEstimator>,
    balance_guard: Arc<BalanceGuard>,
    signer: Arc<dyn ClaimSigner>,
    settle_delay: Duration,
    broadcast_timeout: Duration,
    default_gas_per_validator: u64,
    memo: String,
}

impl ClaimExecutor {
    pub fn new(
        states: ClaimStateStore,
        rewards: Arc<RewardQuery>,
        fee_estimator: Arc<FeeEstimator>,
        balance_guard: Arc<BalanceGuard>,
        signer: Arc<dyn ClaimSigner>,
        config: &ClaimConfig,
    ) -> Self {
        Self {
            states,
            rewards,
            fee_estimator,
            balance_guard,
            signer,
            settle_delay: config.settle_delay(),
            broadcast_timeout: config.broadcast_timeout(),
            default_gas_per_validator: config.default_gas_per_validator,
            memo: config.memo.clone(),
        }
    }

    pub fn signer(&self) -> &Arc<dyn ClaimSigner> {
        &self.signer
    }

    /// 在独立任务中执行，调用方无需等待
    pub fn spawn(self: &Arc<Self>, request: ClaimRequest) -> JoinHandle<()> {
        let executor = Arc::clone(self);
        tokio::spawn(async move { executor.execute(request).await })
    }

    /// 执行流水线并把终态写回状态表
    pub async fn execute(&self, request: ClaimRequest) {
        let span = tracing::info_span!(
            "claim",
            chain_id = %request.chain_id,
            attempt_id = %request.attempt_id,
            mode = ?request.mode,
            validators = request.validators.len(),
        );

        async {
            match self.run(&request).await {
                Ok(tx_hash) => {
                    tracing::info!(%tx_hash, "Claim broadcast accepted");
                    self.refresh_rewards_in_background(&request);

                    // 等奖励重新查询反映出来再结束 loading，避免列表闪一下
                    tokio::time::sleep(self.settle_delay).await;
                    self.states
                        .succeed(&request.chain_id, request.attempt_id)
                        .await;
                }
                Err(err) => {
                    if err.is_cancellation() {
                        tracing::info!("Claim cancelled by user");
                    } else {
                        tracing::warn!(code = err.code().as_str(), error = %err, "Claim failed");
                    }
                    self.states
                        .fail(&request.chain_id, request.attempt_id, err)
                        .await;
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &ClaimRequest) -> Result<String, ClaimError> {
        let chain_id = request.chain_id.as_str();

        // 目前只支持用质押币支付手续费
        let fee_currency = request
            .fee_currency
            .as_ref()
            .ok_or(ClaimError::NoFeeCurrency)?;

        let messages = build_withdraw_messages(&request.address, &request.validators);

        let estimate = match self
            .fee_estimator
            .estimate(self.signer.as_ref(), chain_id, &messages, &self.memo)
            .await
        {
            Ok(estimate) => estimate,
            Err(err) if request.mode == ClaimMode::Single => {
                let fallback = FeeEstimator::fallback_estimate(
                    self.default_gas_per_validator,
                    messages.len(),
                );
                tracing::warn!(error = %err, gas = fallback.gas_limit, "Simulation failed, using static gas");
                fallback
            }
            Err(err) => return Err(err),
        };

        let fee = self
            .fee_estimator
            .derive_fee(chain_id, estimate, fee_currency)
            .await?;
        tracing::debug!(tier = %fee.tier, fee = %fee.amount, gas = fee.gas_limit, "Fee decided");

        self.balance_guard
            .check_sufficient_for_fee(chain_id, &request.address, &fee)
            .await?;

        let reward = self
            .rewards
            .stakable_reward(chain_id, &request.address, &request.stake_currency)
            .await;
        if let Err(err) = BalanceGuard::check_reward_exceeds_fee(reward, &fee) {
            tracing::info!(
                fee = %fee.amount,
                reward = %reward,
                denom = %fee.fee_currency.coin_minimal_denom,
                "Skip claim rewards, fee is not smaller than stakable reward"
            );
            return Err(err);
        }

        // 签名广播在独立任务中运行，超时只放弃等待，不丢弃请求
        let mut broadcast = {
            let signer = Arc::clone(&self.signer);
            let chain_id = chain_id.to_string();
            let std_fee = fee.to_std_fee();
            let memo = self.memo.clone();
            tokio::spawn(async move {
                signer
                    .sign_and_broadcast(&chain_id, &messages, &std_fee, &memo)
                    .await
            })
        };

        let outcome = match tokio::time::timeout(self.broadcast_timeout, &mut broadcast).await {
            Ok(joined) => joined
                .map_err(|e| ClaimError::TransportError(format!("broadcast task failed: {}", e)))?
                .map_err(|e| e.into_broadcast_error())?,
            Err(_) => {
                Self::log_late_broadcast(broadcast, request);
                return Err(ClaimError::Timeout(self.broadcast_timeout));
            }
        };

        match outcome {
            BroadcastOutcome::Accepted { tx_hash } => Ok(tx_hash),
            BroadcastOutcome::Rejected { code, raw_log } => {
                Err(ClaimError::BroadcastRejected { code, raw_log })
            }
            BroadcastOutcome::Declined => Err(ClaimError::SignerRejected),
        }
    }

    /// 超时后继续观察签名广播结果，只记录日志；状态已由尝试 ID 保护
    fn log_late_broadcast(
        broadcast: JoinHandle<Result<BroadcastOutcome, SignerError>>,
        request: &ClaimRequest,
    ) {
        let chain_id = request.chain_id.clone();
        let attempt_id = request.attempt_id;

        tokio::spawn(async move {
            match broadcast.await {
                Ok(Ok(BroadcastOutcome::Accepted { tx_hash })) => tracing::warn!(
                    %chain_id,
                    %attempt_id,
                    %tx_hash,
                    "Broadcast accepted after timeout, claim may have gone through"
                ),
                Ok(Ok(outcome)) => tracing::warn!(
                    %chain_id,
                    %attempt_id,
                    ?outcome,
                    "Late broadcast result after timeout"
                ),
                Ok(Err(err)) => tracing::warn!(
                    %chain_id,
                    %attempt_id,
                    error = %err,
                    "Late broadcast error after timeout"
                ),
                Err(err) => tracing::warn!(%chain_id, %attempt_id, error = %err, "Broadcast task failed"),
            }
        });
    }

    fn refresh_rewards_in_background(&self, request: &ClaimRequest) {
        let rewards = Arc::clone(&self.rewards);
        let chain_id = request.chain_id.clone();
        let address = request.address.clone();

        tokio::spawn(async move {
            // 失败时保留旧结果，下一次刷新再更新
            let _ = rewards.fetch_pending_rewards(&chain_id, &address).await;
        });
    }
}
