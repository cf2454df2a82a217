// 奖励提取交易的消息结构（交给外部签名器）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub gas: u64,
    pub amount: Vec<Coin>,
}

/// MsgWithdrawDelegatorReward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRewardMsg {
    pub delegator_address: String,
    pub validator_address: String,
}

/// 每个验证人一条提取消息
pub fn build_withdraw_messages(
    delegator_address: &str,
    validator_addresses: &[String],
) -> Vec<WithdrawRewardMsg> {
    validator_addresses
        .iter()
        .map(|validator| WithdrawRewardMsg {
            delegator_address: delegator_address.to_string(),
            validator_address: validator.clone(),
        })
        .collect()
}
