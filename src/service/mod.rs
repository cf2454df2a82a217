// 业务服务层：外部能力接口 + 领取流水线

pub mod balance_guard;
pub mod claim_executor;
pub mod claim_orchestrator;
pub mod gas_estimator;
pub mod price_service;
pub mod query_client;
pub mod reward_query;
pub mod signer;

pub use balance_guard::BalanceGuard;
pub use claim_executor::{ClaimExecutor, ClaimMode, ClaimRequest};
pub use claim_orchestrator::{
    sort_view_tokens, ClaimAllReport, ClaimDispatch, ClaimOrchestrator, ViewToken,
};
pub use gas_estimator::FeeEstimator;
pub use price_service::{CachedPriceFeed, PriceFeed, PriceSnapshot};
pub use query_client::QueryClient;
pub use reward_query::{RewardQuery, StakingSummary};
pub use signer::{
    BroadcastOutcome, BroadcastResponse, ClaimSigner, SignerError, SimulateResponse,
};
