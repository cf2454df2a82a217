//! 待领取质押奖励
//!
//! 每次查询都产生新的记录集合，整体替换上一次结果，不做局部修改。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::Currency;

/// 单个验证人的待领取奖励
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub chain_id: String,
    pub validator_address: String,
    /// 最小单位金额（可能带小数，链上 DecCoin）
    pub amount: Decimal,
    pub currency: Currency,
}

/// 一次成功查询的结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PendingRewards {
    records: Vec<RewardRecord>,
}

impl PendingRewards {
    pub fn new(records: Vec<RewardRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[RewardRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 指定质押币种的待领取总额（只计正数记录）
    pub fn stakable_reward(&self, stake_currency: &Currency) -> Decimal {
        self.records
            .iter()
            .filter(|r| r.currency.coin_minimal_denom == stake_currency.coin_minimal_denom)
            .filter(|r| r.amount > Decimal::ZERO)
            .map(|r| r.amount)
            .sum()
    }

    /// 按质押币种待领取金额降序返回前 n 个验证人地址，金额相同按地址排序
    ///
    /// 限制单笔交易的消息数量，避免 gas 失控。
    pub fn top_validators_by_pending_reward(
        &self,
        stake_currency: &Currency,
        n: usize,
    ) -> Vec<String> {
        let mut per_validator: Vec<(&str, Decimal)> = Vec::new();
        for record in self
            .records
            .iter()
            .filter(|r| r.currency.coin_minimal_denom == stake_currency.coin_minimal_denom)
            .filter(|r| r.amount > Decimal::ZERO)
        {
            match per_validator
                .iter_mut()
                .find(|(addr, _)| *addr == record.validator_address)
            {
                Some((_, total)) => *total += record.amount,
                None => per_validator.push((record.validator_address.as_str(), record.amount)),
            }
        }

        per_validator.sort_by(|(addr_a, amount_a), (addr_b, amount_b)| {
            amount_b.cmp(amount_a).then_with(|| addr_a.cmp(addr_b))
        });

        per_validator
            .into_iter()
            .take(n)
            .map(|(addr, _)| addr.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(validator: &str, amount: i64, denom: &str) -> RewardRecord {
        RewardRecord {
            chain_id: "cosmoshub-4".to_string(),
            validator_address: validator.to_string(),
            amount: Decimal::from(amount),
            currency: Currency::new(&denom[1..].to_uppercase(), denom, 6),
        }
    }

    #[test]
    fn test_stakable_reward_sums_positive_stake_denom_only() {
        let rewards = PendingRewards::new(vec![
            record("valA", 100, "uatom"),
            record("valB", 250, "uatom"),
            record("valB", 999, "uosmo"),
            record("valC", -5, "uatom"),
        ]);

        let atom = Currency::new("ATOM", "uatom", 6);
        assert_eq!(rewards.stakable_reward(&atom), Decimal::from(350));
    }

    #[test]
    fn test_top_validators_descending_with_address_tiebreak() {
        let rewards = PendingRewards::new(vec![
            record("valC", 10, "uatom"),
            record("valA", 50, "uatom"),
            record("valB", 50, "uatom"),
            record("valD", 0, "uatom"),
            record("valE", 70, "uatom"),
        ]);

        let atom = Currency::new("ATOM", "uatom", 6);
        assert_eq!(
            rewards.top_validators_by_pending_reward(&atom, 8),
            vec!["valE", "valA", "valB", "valC"]
        );
        assert_eq!(
            rewards.top_validators_by_pending_reward(&atom, 2),
            vec!["valE", "valA"]
        );
    }

    #[test]
    fn test_top_validators_ranks_by_stake_denom_only() {
        let rewards = PendingRewards::new(vec![
            record("valA", 30, "uatom"),
            record("valB", 20, "uatom"),
            record("valB", 500, "uosmo"),
            record("valC", 900, "uosmo"),
        ]);

        let atom = Currency::new("ATOM", "uatom", 6);
        assert_eq!(
            rewards.top_validators_by_pending_reward(&atom, 8),
            vec!["valA".to_string(), "valB".to_string()]
        );
    }

    #[test]
    fn test_empty_result_is_not_error() {
        let rewards = PendingRewards::default();
        assert!(rewards.is_empty());
        let atom = Currency::new("ATOM", "uatom", 6);
        assert!(rewards.top_validators_by_pending_reward(&atom, 8).is_empty());
    }
}
