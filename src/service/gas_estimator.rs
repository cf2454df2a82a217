// 手续费预估服务
// 模拟得到 gas 用量 -> 乘安全系数截断 -> average 档计费 -> 法币价值过高时改用 low 档

use std::{sync::Arc, time::Duration};

use rust_decimal::{prelude::ToPrimitive, Decimal};

use crate::{
    config::ClaimConfig,
    domain::{
        chain_config::FeeCurrency,
        fee::{FeeDecision, FeeTier, GasEstimate},
        withdraw_tx::WithdrawRewardMsg,
    },
    error::ClaimError,
    service::{price_service::PriceFeed, signer::ClaimSigner},
};

pub struct FeeEstimator {
    price_feed: Arc<dyn PriceFeed>,
    gas_adjustment: Decimal,
    low_tier_threshold: Decimal,
    reference_fiat: String,
    price_wait_timeout: Duration,
}

impl FeeEstimator {
    pub fn new(price_feed: Arc<dyn PriceFeed>, config: &ClaimConfig) -> Self {
        Self {
            price_feed,
            gas_adjustment: config.gas_adjustment,
            low_tier_threshold: config.low_tier_threshold,
            reference_fiat: config.reference_fiat.clone(),
            price_wait_timeout: config.price_wait_timeout(),
        }
    }

    /// 模拟用量乘安全系数后截断（不向上取整）
    pub fn adjusted_gas(&self, gas_used: u64) -> u64 {
        (Decimal::from(gas_used) * self.gas_adjustment)
            .trunc()
            .to_u64()
            .unwrap_or(u64::MAX)
    }

    /// 模拟交易得到 gas 上限
    pub async fn estimate(
        &self,
        signer: &dyn ClaimSigner,
        chain_id: &str,
        messages: &[WithdrawRewardMsg],
        memo: &str,
    ) -> Result<GasEstimate, ClaimError> {
        let simulated = signer
            .simulate(chain_id, messages, memo)
            .await
            .map_err(|e| e.into_simulation_error())?;

        let gas_limit = self.adjusted_gas(simulated.gas_used);
        tracing::debug!(chain_id, gas_used = simulated.gas_used, gas = gas_limit, "Simulated claim tx");

        Ok(GasEstimate {
            gas_limit,
            simulated: true,
        })
    }

    /// 模拟失败时的静态估算
    pub fn fallback_estimate(gas_per_validator: u64, validator_count: usize) -> GasEstimate {
        GasEstimate {
            gas_limit: gas_per_validator.saturating_mul(validator_count as u64),
            simulated: false,
        }
    }

    /// ceil(单价 × gas)，手续费只向上取整
    pub fn fee_amount(gas_price: Decimal, gas_limit: u64) -> Decimal {
        (gas_price * Decimal::from(gas_limit)).ceil()
    }

    /// 计算手续费并选择档位
    ///
    /// 静态估算不做法币判断，直接使用 average 档。
    /// 模拟估算需要价格：从未收到价格时挂起等待，超时返回 `PriceUnavailable`。
    pub async fn derive_fee(
        &self,
        chain_id: &str,
        estimate: GasEstimate,
        fee_currency: &FeeCurrency,
    ) -> Result<FeeDecision, ClaimError> {
        let decision = |tier: FeeTier| FeeDecision {
            fee_currency: fee_currency.currency.clone(),
            gas_limit: estimate.gas_limit,
            amount: Self::fee_amount(fee_currency.gas_price(tier), estimate.gas_limit),
            tier,
        };

        let average = decision(FeeTier::Average);
        if !estimate.simulated {
            return Ok(average);
        }

        tokio::time::timeout(
            self.price_wait_timeout,
            self.price_feed.wait_for_first_response(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(chain_id, timeout = ?self.price_wait_timeout, "No price response before deadline");
            ClaimError::PriceUnavailable
        })?;

        let average_price = self.price_feed.calculate_fiat_price(
            average.amount,
            &fee_currency.currency,
            &self.reference_fiat,
        );

        match average_price {
            Some(price) if price >= self.low_tier_threshold => {
                let low = decision(FeeTier::Low);
                tracing::info!(
                    chain_id,
                    average_fee = %average.amount,
                    fee = %low.amount,
                    fiat_value = %price,
                    "Choose low gas price because average fee price >= {} {}",
                    self.low_tier_threshold,
                    self.reference_fiat
                );
                Ok(low)
            }
            _ => Ok(average),
        }
    }
}
