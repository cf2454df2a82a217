//! 多链配置模块
//!
//! 定义每条链的质押币种、手续费币种及 gas 价格档位。
//! 加载后不可变，注册顺序即展示顺序。

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::fee::FeeTier;

/// 未配置 gas 价格档位时的默认单价
pub const DEFAULT_GAS_PRICE: Decimal = Decimal::from_parts(25, 0, 0, false, 3);

/// 币种允许的最大小数位
pub const MAX_COIN_DECIMALS: u32 = 18;

/// 币种描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// 展示符号 (ATOM, OSMO...)
    pub coin_denom: String,
    /// 链上最小单位 (uatom, uosmo...)
    pub coin_minimal_denom: String,
    /// 最小单位到展示单位的小数位数
    pub coin_decimals: u32,
    /// 价格源中的币种 ID
    #[serde(default)]
    pub coingecko_id: Option<String>,
}

impl Currency {
    pub fn new(coin_denom: &str, coin_minimal_denom: &str, coin_decimals: u32) -> Self {
        Self {
            coin_denom: coin_denom.to_string(),
            coin_minimal_denom: coin_minimal_denom.to_string(),
            coin_decimals,
            coingecko_id: None,
        }
    }

    pub fn with_coingecko_id(mut self, id: &str) -> Self {
        self.coingecko_id = Some(id.to_string());
        self
    }

    /// 最小单位金额转换为展示单位；小数位超出 Decimal 精度或溢出时为空
    pub fn to_display_amount(&self, minimal_amount: Decimal) -> Option<Decimal> {
        let unit = Decimal::try_new(1, self.coin_decimals).ok()?;
        minimal_amount.checked_mul(unit)
    }
}

/// gas 价格档位表（每单位 gas 的最小单位价格）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPriceStep {
    pub low: Decimal,
    pub average: Decimal,
    pub high: Decimal,
}

/// 手续费币种
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCurrency {
    #[serde(flatten)]
    pub currency: Currency,
    #[serde(default)]
    pub gas_price_step: Option<GasPriceStep>,
}

impl FeeCurrency {
    /// 取指定档位的 gas 单价，未配置时回落到 DEFAULT_GAS_PRICE
    pub fn gas_price(&self, tier: FeeTier) -> Decimal {
        match (&self.gas_price_step, tier) {
            (Some(step), FeeTier::Low) => step.low,
            (Some(step), FeeTier::Average) => step.average,
            (Some(step), FeeTier::High) => step.high,
            (None, _) => DEFAULT_GAS_PRICE,
        }
    }
}

/// 链配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// 链 ID（全局唯一，例如 cosmoshub-4）
    pub chain_id: String,
    /// 链名称
    pub chain_name: String,
    /// 质押币种
    #[serde(default)]
    pub stake_currency: Option<Currency>,
    /// 可用手续费币种（有序）
    #[serde(default)]
    pub fee_currencies: Vec<FeeCurrency>,
}

impl ChainProfile {
    /// 与质押币种同一最小单位的手续费币种
    ///
    /// 目前只支持用质押币支付手续费（用户质押后一般持有该币）。
    pub fn stake_fee_currency(&self) -> Option<&FeeCurrency> {
        let stake = self.stake_currency.as_ref()?;
        self.fee_currencies
            .iter()
            .find(|fee| fee.currency.coin_minimal_denom == stake.coin_minimal_denom)
    }
}

#[derive(Debug, Deserialize)]
struct ChainFile {
    #[serde(default)]
    chains: Vec<ChainProfile>,
}

/// 链配置注册表
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: Vec<ChainProfile>,
    index: HashMap<String, usize>,
}

impl ChainRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = ChainProfile>) -> Self {
        let mut registry = Self::new();
        for profile in profiles {
            registry.register(profile);
        }
        registry
    }

    /// 从 TOML 文本加载（`[[chains]]` 表，保持文件顺序）
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ChainFile =
            toml::from_str(content).context("Failed to parse chain profiles as TOML")?;
        let registry = Self::from_profiles(file.chains);

        registry
            .validate_configs()
            .map_err(|errors| anyhow::anyhow!("Invalid chain profiles: {}", errors.join("; ")))?;

        Ok(registry)
    }

    /// 从文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read chain file: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// 注册链配置；重复注册替换原配置并保留原位置
    pub fn register(&mut self, profile: ChainProfile) {
        match self.index.get(&profile.chain_id) {
            Some(&pos) => self.chains[pos] = profile,
            None => {
                self.index.insert(profile.chain_id.clone(), self.chains.len());
                self.chains.push(profile);
            }
        }
    }

    /// 按配置顺序列出所有链
    pub fn list_chains(&self) -> &[ChainProfile] {
        &self.chains
    }

    pub fn get(&self, chain_id: &str) -> Option<&ChainProfile> {
        self.index.get(chain_id).map(|&pos| &self.chains[pos])
    }

    pub fn contains(&self, chain_id: &str) -> bool {
        self.index.contains_key(chain_id)
    }

    /// 解析链的手续费币种（必须与质押币种一致）
    pub fn resolve_fee_currency(&self, chain_id: &str) -> Option<&FeeCurrency> {
        self.get(chain_id)?.stake_fee_currency()
    }

    /// 验证链配置完整性
    pub fn validate_configs(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for chain in &self.chains {
            if chain.chain_id.trim().is_empty() {
                errors.push(format!("Chain {} has empty chain_id", chain.chain_name));
            }

            if let Some(stake) = &chain.stake_currency {
                if stake.coin_minimal_denom.is_empty() {
                    errors.push(format!(
                        "Chain {} has empty stake currency denom",
                        chain.chain_id
                    ));
                }
                if stake.coin_decimals > MAX_COIN_DECIMALS {
                    errors.push(format!(
                        "Chain {} stake currency {} has too many decimals: {}",
                        chain.chain_id, stake.coin_minimal_denom, stake.coin_decimals
                    ));
                }
            }

            for fee in &chain.fee_currencies {
                if fee.currency.coin_decimals > MAX_COIN_DECIMALS {
                    errors.push(format!(
                        "Chain {} fee currency {} has too many decimals: {}",
                        chain.chain_id, fee.currency.coin_minimal_denom, fee.currency.coin_decimals
                    ));
                }

                if let Some(step) = &fee.gas_price_step {
                    if step.low.is_sign_negative()
                        || step.average.is_sign_negative()
                        || step.high.is_sign_negative()
                    {
                        errors.push(format!(
                            "Chain {} fee currency {} has negative gas price",
                            chain.chain_id, fee.currency.coin_minimal_denom
                        ));
                    }
                    if step.low > step.average || step.average > step.high {
                        errors.push(format!(
                            "Chain {} fee currency {} gas price steps are not ordered (low <= average <= high)",
                            chain.chain_id, fee.currency.coin_minimal_denom
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
