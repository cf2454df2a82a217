use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::domain::chain_config::Currency;

/// 法币价格能力
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// 最小单位金额按当前缓存价格折算为法币；无价格时返回 None
    fn calculate_fiat_price(&self, amount: Decimal, currency: &Currency, fiat: &str)
        -> Option<Decimal>;

    /// 是否支持该法币
    fn supports_fiat(&self, fiat: &str) -> bool;

    /// 挂起直到至少收到一次价格快照（已收到则立即返回）
    async fn wait_for_first_response(&self);
}

/// 一次价格快照：coingecko id -> 法币代码 -> 单价
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub prices: HashMap<String, HashMap<String, Decimal>>,
    pub received_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(prices: HashMap<String, HashMap<String, Decimal>>) -> Self {
        Self {
            prices,
            received_at: Utc::now(),
        }
    }

    pub fn price_of(&self, coingecko_id: &str, fiat: &str) -> Option<Decimal> {
        self.prices
            .get(coingecko_id)
            .and_then(|by_fiat| by_fiat.get(&fiat.to_lowercase()))
            .copied()
    }
}

/// 价格快照缓存，由外部轮询任务通过 `publish_snapshot` 喂数据
pub struct CachedPriceFeed {
    supported_fiats: HashSet<String>,
    snapshot: watch::Sender<Option<Arc<PriceSnapshot>>>,
}

impl CachedPriceFeed {
    pub fn new<I, S>(supported_fiats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (snapshot, _) = watch::channel(None);
        Self {
            supported_fiats: supported_fiats
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .collect(),
            snapshot,
        }
    }

    /// 发布新快照，整体替换旧快照并唤醒等待者
    pub fn publish_snapshot(&self, snapshot: PriceSnapshot) {
        tracing::debug!(
            coins = snapshot.prices.len(),
            received_at = %snapshot.received_at,
            "Price snapshot published"
        );
        self.snapshot.send_replace(Some(Arc::new(snapshot)));
    }

    /// 是否已收到过价格
    pub fn has_response(&self) -> bool {
        self.snapshot.borrow().is_some()
    }

    pub fn current(&self) -> Option<Arc<PriceSnapshot>> {
        self.snapshot.borrow().clone()
    }
}

#[async_trait]
impl PriceFeed for CachedPriceFeed {
    fn calculate_fiat_price(
        &self,
        amount: Decimal,
        currency: &Currency,
        fiat: &str,
    ) -> Option<Decimal> {
        if !self.supports_fiat(fiat) {
            return None;
        }
        let coingecko_id = currency.coingecko_id.as_deref()?;
        let unit_price = self.current()?.price_of(coingecko_id, fiat)?;

        currency.to_display_amount(amount)?.checked_mul(unit_price)
    }

    fn supports_fiat(&self, fiat: &str) -> bool {
        self.supported_fiats.contains(&fiat.to_lowercase())
    }

    async fn wait_for_first_response(&self) {
        let mut rx = self.snapshot.subscribe();
        let received = rx.wait_for(|snapshot| snapshot.is_some()).await.is_ok();
        if !received {
            tracing::warn!("Price feed closed before first response");
        }
    }
}
