//! 错误恢复引擎
//!
//! 根据 ActionError 类型返回 RecoveryAction，供环境在轮次报告中标注失败工作项能否重试。

use crate::core::{ActionError, RecoveryAction};

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &ActionError) -> RecoveryAction {
        match err {
            ActionError::ServiceUnavailable(_) | ActionError::Timeout { .. } => {
                RecoveryAction::RetryNextRound
            }
            // 推理服务输出不稳定，同一工作项再问一次可能成功
            ActionError::MalformedResponse { .. } => RecoveryAction::RetryNextRound,
            ActionError::UnknownAction(_) => RecoveryAction::Abort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;

    #[test]
    fn test_recovery_transient() {
        let engine = RecoveryEngine::new();
        let err = ActionError::ServiceUnavailable(LlmError::RateLimited { retry_after_ms: 1000 });
        assert!(err.is_transient());
        assert_eq!(engine.handle(&err), RecoveryAction::RetryNextRound);

        let err = ActionError::Timeout {
            action: "WriteCode".into(),
            secs: 5,
        };
        assert_eq!(engine.handle(&err), RecoveryAction::RetryNextRound);
    }

    #[test]
    fn test_recovery_malformed() {
        let engine = RecoveryEngine::new();
        let err = ActionError::MalformedResponse {
            action: "WriteTasks".into(),
            section: "Task list".into(),
            reason: "missing".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(engine.handle(&err), RecoveryAction::RetryNextRound);
    }

    #[test]
    fn test_recovery_unknown_action() {
        let engine = RecoveryEngine::new();
        let err = ActionError::UnknownAction("WriteTests".into());
        assert_eq!(engine.handle(&err), RecoveryAction::Abort);
    }
}
