//! 单链领取状态机
//!
//! ```text
//! Idle -> Loading        领取请求
//! Loading -> Done        广播成功（结算延迟之后）
//! Loading -> Failed      任一步骤失败 / 用户拒绝签名 / 超时
//! Failed -> Idle         用户确认错误
//! Done -> Idle           新一轮领取前重置
//! ```
//!
//! 每条链恰好一个 ClaimState，只能经由 `ClaimStateStore` 修改。

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::ClaimError, utils::chain_normalizer::normalize_chain_identifier};

/// 每条链保留的状态转换记录上限
const MAX_HISTORY: usize = 32;

/// 领取阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimPhase {
    Idle,
    Loading,
    Done,
    Failed,
}

impl ClaimPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimPhase::Idle => "idle",
            ClaimPhase::Loading => "loading",
            ClaimPhase::Done => "done",
            ClaimPhase::Failed => "failed",
        }
    }

    /// 验证状态转换合法性
    pub fn can_transition_to(&self, target: &Self) -> bool {
        use ClaimPhase::*;

        matches!(
            (self, target),
            (Idle, Loading) | (Loading, Done) | (Loading, Failed) | (Failed, Idle) | (Done, Idle)
        )
    }
}

/// 状态转换记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: ClaimPhase,
    pub to: ClaimPhase,
    pub timestamp: DateTime<Utc>,
    pub attempt_id: Option<Uuid>,
    pub reason: Option<String>,
}

/// 单链领取状态
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimState {
    phase: ClaimPhase,
    failure: Option<ClaimError>,
    attempt_id: Option<Uuid>,
    history: Vec<PhaseTransition>,
}

impl Default for ClaimState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClaimState {
    pub fn new() -> Self {
        Self {
            phase: ClaimPhase::Idle,
            failure: None,
            attempt_id: None,
            history: Vec::new(),
        }
    }

    pub fn phase(&self) -> ClaimPhase {
        self.phase
    }

    /// 失败原因（只在 Failed 阶段存在）
    pub fn failure(&self) -> Option<&ClaimError> {
        self.failure.as_ref()
    }

    /// 最近一次领取尝试的 ID
    pub fn attempt_id(&self) -> Option<Uuid> {
        self.attempt_id
    }

    /// 按发生顺序排列的转换记录
    pub fn history(&self) -> &[PhaseTransition] {
        &self.history
    }

    pub fn is_loading(&self) -> bool {
        self.phase == ClaimPhase::Loading
    }

    pub fn is_failed(&self) -> bool {
        self.phase == ClaimPhase::Failed
    }

    fn transition(&mut self, to: ClaimPhase, reason: Option<String>) -> bool {
        if !self.phase.can_transition_to(&to) {
            tracing::warn!(
                from = self.phase.as_str(),
                to = to.as_str(),
                "Rejected invalid claim phase transition"
            );
            return false;
        }

        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            attempt_id: self.attempt_id,
            reason,
        });
        self.phase = to;
        true
    }

    /// 尝试开始新一轮领取
    fn begin(&mut self, rearm_failed: bool) -> BeginOutcome {
        match self.phase {
            ClaimPhase::Loading => return BeginOutcome::AlreadyLoading,
            ClaimPhase::Failed if !rearm_failed => return BeginOutcome::AwaitingAcknowledgement,
            ClaimPhase::Failed => {
                self.acknowledge(Some("re-armed by claim all"));
            }
            ClaimPhase::Done => {
                self.transition(ClaimPhase::Idle, Some("new claim requested".to_string()));
            }
            ClaimPhase::Idle => {}
        }

        let attempt_id = Uuid::new_v4();
        self.attempt_id = Some(attempt_id);
        self.transition(ClaimPhase::Loading, None);
        BeginOutcome::Started(attempt_id)
    }

    fn complete(&mut self, attempt_id: Uuid, result: Result<(), ClaimError>) -> bool {
        if self.phase != ClaimPhase::Loading || self.attempt_id != Some(attempt_id) {
            return false;
        }

        match result {
            Ok(()) => self.transition(ClaimPhase::Done, None),
            Err(err) => {
                let reason = err.code().as_str().to_string();
                self.failure = Some(err);
                self.transition(ClaimPhase::Failed, Some(reason))
            }
        }
    }

    fn acknowledge(&mut self, reason: Option<&str>) -> bool {
        if self.phase != ClaimPhase::Failed {
            return false;
        }
        self.failure = None;
        self.transition(ClaimPhase::Idle, reason.map(str::to_string))
    }
}

/// 开始领取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// 已进入 Loading，携带本次尝试 ID
    Started(Uuid),
    /// 该链已有进行中的领取
    AlreadyLoading,
    /// 该链处于 Failed，需要先确认
    AwaitingAcknowledgement,
}

/// 链标识符 -> ClaimState 映射，首次访问时创建
#[derive(Debug, Clone, Default)]
pub struct ClaimStateStore {
    states: Arc<RwLock<HashMap<String, ClaimState>>>,
}

impl ClaimStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取状态快照；不存在时创建 Idle 状态
    pub async fn get(&self, chain_id: &str) -> ClaimState {
        let key = normalize_chain_identifier(chain_id);

        if let Some(state) = self.states.read().await.get(&key) {
            return state.clone();
        }

        self.states.write().await.entry(key).or_default().clone()
    }

    /// 所有已创建状态的快照（键为标准化链标识符）
    pub async fn snapshot(&self) -> HashMap<String, ClaimState> {
        self.states.read().await.clone()
    }

    /// 检查并置位：同一把写锁内完成，保证同链不会并发进入 Loading
    pub async fn begin(&self, chain_id: &str, rearm_failed: bool) -> BeginOutcome {
        let key = normalize_chain_identifier(chain_id);
        let mut states = self.states.write().await;
        let outcome = states.entry(key).or_default().begin(rearm_failed);

        if let BeginOutcome::Started(attempt_id) = outcome {
            tracing::debug!(chain_id, %attempt_id, "Claim phase idle -> loading");
        }
        outcome
    }

    /// Loading -> Done；尝试 ID 不匹配时忽略
    pub async fn succeed(&self, chain_id: &str, attempt_id: Uuid) -> bool {
        self.complete(chain_id, attempt_id, Ok(())).await
    }

    /// Loading -> Failed；尝试 ID 不匹配时忽略
    pub async fn fail(&self, chain_id: &str, attempt_id: Uuid, err: ClaimError) -> bool {
        self.complete(chain_id, attempt_id, Err(err)).await
    }

    async fn complete(
        &self,
        chain_id: &str,
        attempt_id: Uuid,
        result: Result<(), ClaimError>,
    ) -> bool {
        let key = normalize_chain_identifier(chain_id);
        let mut states = self.states.write().await;
        let Some(state) = states.get_mut(&key) else {
            return false;
        };

        let to = if result.is_ok() { "done" } else { "failed" };
        let applied = state.complete(attempt_id, result);
        if applied {
            tracing::debug!(chain_id, %attempt_id, to, "Claim phase loading -> {}", to);
        } else {
            tracing::warn!(chain_id, %attempt_id, "Ignored completion of stale claim attempt");
        }
        applied
    }

    /// Failed -> Idle（用户确认错误）；返回是否发生转换
    pub async fn acknowledge(&self, chain_id: &str) -> bool {
        let key = normalize_chain_identifier(chain_id);
        let mut states = self.states.write().await;
        states
            .get_mut(&key)
            .map(|state| state.acknowledge(Some("acknowledged")))
            .unwrap_or(false)
    }

    /// 确认所有失败状态，返回被确认的链数量
    pub async fn acknowledge_all_failed(&self) -> usize {
        let mut states = self.states.write().await;
        states
            .values_mut()
            .map(|state| state.acknowledge(Some("acknowledged")))
            .filter(|acknowledged| *acknowledged)
            .count()
    }

    /// 是否存在进行中的领取
    pub async fn any_loading(&self) -> bool {
        self.states.read().await.values().any(ClaimState::is_loading)
    }
}
