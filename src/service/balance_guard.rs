//! 签名前的余额/收益校验
//!
//! 两项检查都是严格不等式：手续费必须小于余额，也必须小于可领取奖励。

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{domain::fee::FeeDecision, error::ClaimError, service::query_client::QueryClient};

pub struct BalanceGuard {
    client: Arc<dyn QueryClient>,
}

impl BalanceGuard {
    pub fn new(client: Arc<dyn QueryClient>) -> Self {
        Self { client }
    }

    /// 拉取最新余额并检查是否足够支付手续费，返回余额
    pub async fn check_sufficient_for_fee(
        &self,
        chain_id: &str,
        address: &str,
        fee: &FeeDecision,
    ) -> Result<Decimal, ClaimError> {
        let denom = &fee.fee_currency.coin_minimal_denom;

        let balance = self
            .client
            .get_balance(chain_id, address, denom)
            .await
            .map_err(|e| ClaimError::QueryFailed {
                chain_id: chain_id.to_string(),
                cause: e.to_string(),
            })?
            .ok_or_else(|| ClaimError::BalanceUnavailable {
                denom: denom.clone(),
            })?;

        Self::ensure_fee_covered(balance, fee)?;
        Ok(balance)
    }

    pub fn ensure_fee_covered(balance: Decimal, fee: &FeeDecision) -> Result<(), ClaimError> {
        if fee.amount < balance {
            Ok(())
        } else {
            Err(ClaimError::InsufficientFee {
                balance,
                fee: fee.amount,
            })
        }
    }

    /// 可领取奖励必须严格大于手续费，否则领取得不偿失
    pub fn check_reward_exceeds_fee(reward: Decimal, fee: &FeeDecision) -> Result<(), ClaimError> {
        if fee.amount < reward {
            Ok(())
        } else {
            Err(ClaimError::RewardTooSmall {
                reward,
                fee: fee.amount,
            })
        }
    }
}
