//! 链上查询能力（外部实现：LCD/gRPC 客户端、索引服务等）

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::reward::RewardRecord;

#[async_trait]
pub trait QueryClient: Send + Sync {
    /// 查询地址在各验证人处的待领取奖励
    async fn get_pending_rewards(&self, chain_id: &str, address: &str)
        -> Result<Vec<RewardRecord>>;

    /// 查询指定币种余额（最小单位）
    ///
    /// 账户没有该币种的余额条目时返回 `Ok(None)`，与查询失败区分。
    async fn get_balance(&self, chain_id: &str, address: &str, denom: &str)
        -> Result<Option<Decimal>>;

    /// 链的年化通胀率（仅用于展示）
    async fn get_inflation_rate(&self, chain_id: &str) -> Result<Decimal>;
}
