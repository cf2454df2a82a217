//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::{path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::chain_config::ChainRegistry;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub claim: ClaimConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

/// 领取流程配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimConfig {
    /// 模拟 gas 的安全系数
    pub gas_adjustment: Decimal,
    /// average 档手续费折算法币后达到该值即改用 low 档
    pub low_tier_threshold: Decimal,
    /// 档位判断使用的法币
    pub reference_fiat: String,
    /// 列表排序与总额展示使用的法币
    pub display_fiat: String,
    pub settle_delay_ms: u64,
    pub price_wait_timeout_secs: u64,
    pub broadcast_timeout_secs: u64,
    /// 单笔交易最多包含的验证人数量
    pub max_validators_per_tx: usize,
    /// 模拟失败时每个验证人的静态 gas
    pub default_gas_per_validator: u64,
    #[serde(default)]
    pub memo: String,
    /// 链配置文件（TOML，`[[chains]]`）
    #[serde(default)]
    pub chains_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
        }
    }
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(v.trim()).ok())
        .unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            gas_adjustment: env_decimal("CLAIM_GAS_ADJUSTMENT", Decimal::new(15, 1)),
            low_tier_threshold: env_decimal("CLAIM_LOW_TIER_THRESHOLD", Decimal::new(2, 1)),
            reference_fiat: std::env::var("CLAIM_REFERENCE_FIAT").unwrap_or_else(|_| "usd".into()),
            display_fiat: std::env::var("CLAIM_DISPLAY_FIAT").unwrap_or_else(|_| "usd".into()),
            settle_delay_ms: env_parse("CLAIM_SETTLE_DELAY_MS", 1000),
            price_wait_timeout_secs: env_parse("CLAIM_PRICE_WAIT_TIMEOUT_SECS", 10),
            broadcast_timeout_secs: env_parse("CLAIM_BROADCAST_TIMEOUT_SECS", 120),
            max_validators_per_tx: env_parse("CLAIM_MAX_VALIDATORS_PER_TX", 8),
            default_gas_per_validator: env_parse("CLAIM_DEFAULT_GAS_PER_VALIDATOR", 140_000),
            memo: std::env::var("CLAIM_MEMO").unwrap_or_default(),
            chains_file: std::env::var("CLAIM_CHAINS_FILE").ok(),
        }
    }
}

impl ClaimConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn price_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.price_wait_timeout_secs)
    }

    pub fn broadcast_timeout(&self) -> Duration {
        Duration::from_secs(self.broadcast_timeout_secs)
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 .env）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            logging: LoggingConfig::default(),
            claim: ClaimConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 加载链配置；未配置文件时返回空注册表
    pub fn load_chain_registry(&self) -> Result<ChainRegistry> {
        match &self.claim.chains_file {
            Some(path) => ChainRegistry::from_file(path),
            None => Ok(ChainRegistry::new()),
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        let claim = &self.claim;
        if claim.gas_adjustment < Decimal::ONE {
            anyhow::bail!("CLAIM_GAS_ADJUSTMENT must be at least 1");
        }
        if claim.low_tier_threshold <= Decimal::ZERO {
            anyhow::bail!("CLAIM_LOW_TIER_THRESHOLD must be positive");
        }
        if claim.max_validators_per_tx == 0 {
            anyhow::bail!("CLAIM_MAX_VALIDATORS_PER_TX must be greater than 0");
        }
        if claim.default_gas_per_validator == 0 {
            anyhow::bail!("CLAIM_DEFAULT_GAS_PER_VALIDATOR must be greater than 0");
        }
        if claim.price_wait_timeout_secs == 0 || claim.broadcast_timeout_secs == 0 {
            anyhow::bail!("Claim timeouts must be greater than 0");
        }
        if claim.reference_fiat.trim().is_empty() || claim.display_fiat.trim().is_empty() {
            anyhow::bail!("Fiat currency codes must not be empty");
        }

        Ok(())
    }
}
