//! IronClaim - 多链质押奖励领取编排
//!
//! 非托管模式：签名、链上查询、价格获取都由外部能力提供，本库只负责编排与状态

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;
pub mod utils;

// 重新导出常用类型
pub use error::{ClaimError, ClaimErrorCode, OrchestratorError};

pub mod prelude {
    pub use crate::{
        config::{ClaimConfig, Config, LoggingConfig},
        domain::{
            ChainProfile, ChainRegistry, ClaimPhase, ClaimState, Currency, FeeCurrency, FeeDecision,
            FeeTier, GasPriceStep, RewardRecord, StdFee, WithdrawRewardMsg,
        },
        error::{ClaimError, ClaimErrorCode, OrchestratorError},
        service::{
            BroadcastOutcome, CachedPriceFeed, ClaimDispatch, ClaimOrchestrator, ClaimSigner,
            PriceFeed, PriceSnapshot, QueryClient, SignerError, SimulateResponse, ViewToken,
        },
    };
}
