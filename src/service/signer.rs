//! 签名/广播能力
//!
//! 外部签名器（浏览器扩展后台、移动端 keyring、硬件钱包桥）以请求/响应形式暴露。
//! 用户拒绝签名和链上拒绝都是正常结果，不是传输错误。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    domain::withdraw_tx::{StdFee, WithdrawRewardMsg},
    error::ClaimError,
};

/// 旧版 cosmos-sdk 节点对模拟/广播请求的典型报错
const OUTDATED_SDK_MARKER: &str = "invalid empty tx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub gas_used: u64,
}

/// 签名+广播的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BroadcastOutcome {
    /// 用户拒绝签名
    Declined,
    /// 链返回非零结果码
    Rejected { code: u32, raw_log: String },
    /// 上链成功
    Accepted { tx_hash: String },
}

/// 节点返回的原始广播结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
    #[serde(rename = "txhash")]
    pub tx_hash: String,
}

impl From<BroadcastResponse> for BroadcastOutcome {
    fn from(resp: BroadcastResponse) -> Self {
        if resp.code == 0 {
            BroadcastOutcome::Accepted {
                tx_hash: resp.tx_hash,
            }
        } else {
            BroadcastOutcome::Rejected {
                code: resp.code,
                raw_log: resp.raw_log,
            }
        }
    }
}

/// 签名器传输层错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Transport(String),
}

impl SignerError {
    /// 节点运行的 cosmos-sdk 版本过旧
    pub fn is_outdated_sdk(&self) -> bool {
        matches!(
            self,
            SignerError::Http { status: 400, message } if message.contains(OUTDATED_SDK_MARKER)
        )
    }

    /// 模拟阶段的错误映射
    pub fn into_simulation_error(self) -> ClaimError {
        if self.is_outdated_sdk() {
            ClaimError::UnsupportedSdkVersion
        } else {
            ClaimError::SimulationFailed(self.to_string())
        }
    }

    /// 签名/广播阶段的错误映射
    pub fn into_broadcast_error(self) -> ClaimError {
        if self.is_outdated_sdk() {
            ClaimError::UnsupportedSdkVersion
        } else {
            ClaimError::TransportError(self.to_string())
        }
    }
}

#[async_trait]
pub trait ClaimSigner: Send + Sync {
    /// 能否一次性批量签多笔独立交易（硬件钱包通常不能）
    fn supports_batch_signing(&self) -> bool;

    /// 模拟执行，返回消耗的 gas
    async fn simulate(
        &self,
        chain_id: &str,
        messages: &[WithdrawRewardMsg],
        memo: &str,
    ) -> Result<SimulateResponse, SignerError>;

    /// 签名并广播，直到拿到终态结果才返回
    async fn sign_and_broadcast(
        &self,
        chain_id: &str,
        messages: &[WithdrawRewardMsg],
        fee: &StdFee,
        memo: &str,
    ) -> Result<BroadcastOutcome, SignerError>;
}
