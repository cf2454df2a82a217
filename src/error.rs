//! 错误定义
//!
//! 单链失败统一落在 `ClaimError`，存放在该链的 ClaimState 上，不向调用方抛出；
//! 只有调用约定被违反（未知链等）才以 `OrchestratorError` 同步返回。

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

/// 稳定错误码（供前端/日志使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClaimErrorCode {
    QueryFailed,
    SimulationFailed,
    PriceUnavailable,
    NoFeeCurrency,
    BalanceUnavailable,
    InsufficientFee,
    RewardTooSmall,
    SignerRejected,
    BroadcastRejected,
    Timeout,
    TransportError,
    UnsupportedSdkVersion,
}

impl ClaimErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimErrorCode::QueryFailed => "query_failed",
            ClaimErrorCode::SimulationFailed => "simulation_failed",
            ClaimErrorCode::PriceUnavailable => "price_unavailable",
            ClaimErrorCode::NoFeeCurrency => "no_fee_currency",
            ClaimErrorCode::BalanceUnavailable => "balance_unavailable",
            ClaimErrorCode::InsufficientFee => "insufficient_fee",
            ClaimErrorCode::RewardTooSmall => "reward_too_small",
            ClaimErrorCode::SignerRejected => "signer_rejected",
            ClaimErrorCode::BroadcastRejected => "broadcast_rejected",
            ClaimErrorCode::Timeout => "timeout",
            ClaimErrorCode::TransportError => "transport_error",
            ClaimErrorCode::UnsupportedSdkVersion => "unsupported_sdk_version",
        }
    }
}

/// 单链领取失败原因
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClaimError {
    #[error("reward query failed on {chain_id}: {cause}")]
    QueryFailed { chain_id: String, cause: String },

    #[error("transaction simulation failed: {0}")]
    SimulationFailed(String),

    #[error("no price response received before deadline")]
    PriceUnavailable,

    #[error("no fee currency matches the stake currency")]
    NoFeeCurrency,

    #[error("no balance entry for fee currency {denom}")]
    BalanceUnavailable { denom: String },

    #[error("balance {balance} cannot cover fee {fee}")]
    InsufficientFee { balance: Decimal, fee: Decimal },

    #[error("claimable reward {reward} does not exceed fee {fee}")]
    RewardTooSmall { reward: Decimal, fee: Decimal },

    #[error("signing request rejected by user")]
    SignerRejected,

    #[error("broadcast rejected with code {code}: {raw_log}")]
    BroadcastRejected { code: u32, raw_log: String },

    #[error("no broadcast result within {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("chain runs an outdated cosmos-sdk version")]
    UnsupportedSdkVersion,
}

impl ClaimError {
    pub fn code(&self) -> ClaimErrorCode {
        match self {
            ClaimError::QueryFailed { .. } => ClaimErrorCode::QueryFailed,
            ClaimError::SimulationFailed(_) => ClaimErrorCode::SimulationFailed,
            ClaimError::PriceUnavailable => ClaimErrorCode::PriceUnavailable,
            ClaimError::NoFeeCurrency => ClaimErrorCode::NoFeeCurrency,
            ClaimError::BalanceUnavailable { .. } => ClaimErrorCode::BalanceUnavailable,
            ClaimError::InsufficientFee { .. } => ClaimErrorCode::InsufficientFee,
            ClaimError::RewardTooSmall { .. } => ClaimErrorCode::RewardTooSmall,
            ClaimError::SignerRejected => ClaimErrorCode::SignerRejected,
            ClaimError::BroadcastRejected { .. } => ClaimErrorCode::BroadcastRejected,
            ClaimError::Timeout(_) => ClaimErrorCode::Timeout,
            ClaimError::TransportError(_) => ClaimErrorCode::TransportError,
            ClaimError::UnsupportedSdkVersion => ClaimErrorCode::UnsupportedSdkVersion,
        }
    }

    /// 用户取消签名，不应弹出告警
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClaimError::SignerRejected)
    }

    /// 在列表项旁内联展示的提示文案
    pub fn user_message(&self) -> String {
        match self {
            ClaimError::QueryFailed { .. } => "Failed to load staking rewards".to_string(),
            ClaimError::SimulationFailed(_) => "Failed to estimate gas for this claim".to_string(),
            ClaimError::PriceUnavailable => "Price data is not available yet".to_string(),
            ClaimError::NoFeeCurrency => "Can't pay for fee by stake currency".to_string(),
            ClaimError::BalanceUnavailable { .. } => {
                "Can't find balance for fee currency".to_string()
            }
            ClaimError::InsufficientFee { .. } => "Not enough balance to pay fee".to_string(),
            ClaimError::RewardTooSmall { .. } => {
                "Your claimable reward is smaller than the required fee.".to_string()
            }
            ClaimError::SignerRejected => "Request rejected".to_string(),
            // 链上拒绝时原样展示 raw log
            ClaimError::BroadcastRejected { raw_log, .. } => raw_log.clone(),
            ClaimError::Timeout(_) => "Timed out waiting for the transaction result".to_string(),
            ClaimError::TransportError(msg) => msg.clone(),
            ClaimError::UnsupportedSdkVersion => {
                "Not supported: outdated version of cosmos-sdk".to_string()
            }
        }
    }
}

/// 调用约定错误（同步返回给调用方）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("no account address for chain: {0}")]
    AccountMissing(String),
}
