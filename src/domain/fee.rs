//! 手续费相关值对象

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::Currency;
use crate::domain::withdraw_tx::{Coin, StdFee};

/// Gas 价格档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeTier {
    Low,
    Average,
    High,
}

impl FeeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeTier::Low => "low",
            FeeTier::Average => "average",
            FeeTier::High => "high",
        }
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gas 估算结果（已乘安全系数并截断）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    /// 最终使用的 gas 上限
    pub gas_limit: u64,
    /// 是否来自模拟（false 表示静态兜底值）
    pub simulated: bool,
}

/// 单次领取的手续费决策，每次尝试重新计算
#[derive(Debug, Clone, PartialEq)]
pub struct FeeDecision {
    pub fee_currency: Currency,
    pub gas_limit: u64,
    /// 最小单位，整数且向上取整
    pub amount: Decimal,
    pub tier: FeeTier,
}

impl FeeDecision {
    pub fn to_std_fee(&self) -> StdFee {
        StdFee {
            gas: self.gas_limit,
            amount: vec![Coin {
                denom: self.fee_currency.coin_minimal_denom.clone(),
                amount: self.amount,
            }],
        }
    }
}
