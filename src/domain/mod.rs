//! Domain 模块
//!
//! 链配置、奖励记录、手续费决策和领取状态机

pub mod chain_config;
pub mod claim_state;
pub mod fee;
pub mod reward;
pub mod withdraw_tx;

// 重新导出常用类型
pub use chain_config::{ChainProfile, ChainRegistry, Currency, FeeCurrency, GasPriceStep};
pub use claim_state::{BeginOutcome, ClaimPhase, ClaimState, ClaimStateStore, PhaseTransition};
pub use fee::{FeeDecision, FeeTier, GasEstimate};
pub use reward::{PendingRewards, RewardRecord};
pub use withdraw_tx::{build_withdraw_messages, Coin, StdFee, WithdrawRewardMsg};
