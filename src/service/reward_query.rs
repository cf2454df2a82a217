//! 待领取奖励查询服务
//!
//! 成功结果按 (链标识符, 地址) 缓存，新结果整体替换旧结果；
//! 查询失败不清空缓存，界面继续展示上一次成功的数据。

use std::{collections::HashMap, sync::Arc};

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    domain::{
        chain_config::{ChainProfile, Currency},
        reward::PendingRewards,
    },
    error::ClaimError,
    service::query_client::QueryClient,
    utils::chain_normalizer::normalize_chain_identifier,
};

/// 单链质押概览（展示用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakingSummary {
    pub chain_id: String,
    /// 质押币种待领取总额（最小单位）
    pub pending_reward: Decimal,
    pub currency: Currency,
    /// 通胀率查询失败时为空
    pub inflation_rate: Option<Decimal>,
}

pub struct RewardQuery {
    client: Arc<dyn QueryClient>,
    cache: Arc<RwLock<HashMap<String, PendingRewards>>>,
}

impl RewardQuery {
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn cache_key(chain_id: &str, address: &str) -> String {
        format!("{}/{}", normalize_chain_identifier(chain_id), address)
    }

    /// 拉取待领取奖励；空结果不是错误
    pub async fn fetch_pending_rewards(
        &self,
        chain_id: &str,
        address: &str,
    ) -> Result<PendingRewards, ClaimError> {
        let records = self
            .client
            .get_pending_rewards(chain_id, address)
            .await
            .map_err(|e| {
                tracing::warn!(chain_id, error = %e, "Failed to fetch pending rewards");
                ClaimError::QueryFailed {
                    chain_id: chain_id.to_string(),
                    cause: e.to_string(),
                }
            })?;

        let rewards = PendingRewards::new(records);
        self.cache
            .write()
            .await
            .insert(Self::cache_key(chain_id, address), rewards.clone());

        tracing::debug!(
            chain_id,
            records = rewards.records().len(),
            "Pending rewards refreshed"
        );
        Ok(rewards)
    }

    /// 最近一次成功查询的结果
    pub async fn latest(&self, chain_id: &str, address: &str) -> Option<PendingRewards> {
        self.cache
            .read()
            .await
            .get(&Self::cache_key(chain_id, address))
            .cloned()
    }

    /// 质押币种待领取总额；尚无成功结果时为 0
    pub async fn stakable_reward(&self, chain_id: &str, address: &str, stake: &Currency) -> Decimal {
        self.latest(chain_id, address)
            .await
            .map(|rewards| rewards.stakable_reward(stake))
            .unwrap_or(Decimal::ZERO)
    }

    /// 基于最近一次成功结果，按待领取金额降序取前 n 个验证人
    pub async fn top_validators(
        &self,
        chain_id: &str,
        address: &str,
        stake: &Currency,
        n: usize,
    ) -> Vec<String> {
        self.latest(chain_id, address)
            .await
            .map(|rewards| rewards.top_validators_by_pending_reward(stake, n))
            .unwrap_or_default()
    }

    /// 质押概览：待领取奖励 + 通胀率
    pub async fn staking_summary(
        &self,
        profile: &ChainProfile,
        address: &str,
    ) -> Option<StakingSummary> {
        let stake = profile.stake_currency.as_ref()?;
        let pending_reward = self.stakable_reward(&profile.chain_id, address, stake).await;

        let inflation_rate = match self.client.get_inflation_rate(&profile.chain_id).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                tracing::debug!(chain_id = %profile.chain_id, error = %e, "Inflation rate unavailable");
                None
            }
        };

        Some(StakingSummary {
            chain_id: profile.chain_id.clone(),
            pending_reward,
            currency: stake.clone(),
            inflation_rate,
        })
    }
}
