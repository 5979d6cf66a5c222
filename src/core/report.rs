//! 轮次报告：每轮哪些角色行动、哪些工作项成功 / 失败、发布了多少消息

use serde::Serialize;

use crate::core::RecoveryAction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum WorkStatus {
    Succeeded,
    Failed { error: String, retryable: bool },
}

/// 单个工作项的结果
#[derive(Clone, Debug, Serialize)]
pub struct WorkOutcome {
    pub role: String,
    pub item: String,
    pub status: WorkStatus,
}

impl WorkOutcome {
    pub fn succeeded(role: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            item: item.into(),
            status: WorkStatus::Succeeded,
        }
    }

    pub fn failed(
        role: impl Into<String>,
        item: impl Into<String>,
        error: impl Into<String>,
        recovery: &RecoveryAction,
    ) -> Self {
        Self {
            role: role.into(),
            item: item.into(),
            status: WorkStatus::Failed {
                error: error.into(),
                retryable: *recovery == RecoveryAction::RetryNextRound,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkStatus::Succeeded
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RoundReport {
    /// 从 1 开始的全局轮次号
    pub round: u64,
    /// 本轮行动的角色（插入顺序）
    pub acted: Vec<String>,
    pub outcomes: Vec<WorkOutcome>,
    /// 屏障处发布的消息数（含失败标记）
    pub published: usize,
}

impl RoundReport {
    pub fn failures(&self) -> impl Iterator<Item = &WorkOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// 本轮没有任何角色行动
    pub fn is_quiet(&self) -> bool {
        self.acted.is_empty()
    }
}
