//! 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 ActionError 决定下一轮重试还是放弃该工作项。

use thiserror::Error;

use crate::llm::LlmError;

/// 单次 Action 调用的失败
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    /// 推理服务返回的文本缺少必填段落或段落无法按声明形状解析
    #[error("Malformed response from {action}: section '{section}' {reason}")]
    MalformedResponse {
        action: String,
        section: String,
        reason: String,
    },

    #[error("Reasoning service unavailable: {0}")]
    ServiceUnavailable(#[from] LlmError),

    #[error("Action {action} timed out after {secs}s")]
    Timeout { action: String, secs: u64 },

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

impl ActionError {
    /// 服务不可用 / 超时属于瞬时错误，可在后续轮次重试
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ActionError::ServiceUnavailable(_) | ActionError::Timeout { .. }
        )
    }
}

/// 角色 act() 的失败：主产出步骤失败，工作项保留待重试
#[derive(Error, Debug, Clone)]
pub enum RoleError {
    #[error("{role} failed on work item '{item}': {source}")]
    WorkItemFailed {
        role: String,
        item: String,
        #[source]
        source: ActionError,
    },
}

impl RoleError {
    pub fn item(&self) -> &str {
        match self {
            RoleError::WorkItemFailed { item, .. } => item,
        }
    }

    pub fn action_error(&self) -> &ActionError {
        match self {
            RoleError::WorkItemFailed { source, .. } => source,
        }
    }
}

/// 环境（调度器 / 总线）错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Duplicate role name: {0}")]
    DuplicateRoleName(String),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 待办保留，下一轮再试
    RetryNextRound,
    /// 重试无意义（配置错误等），需要人工介入
    Abort,
}
