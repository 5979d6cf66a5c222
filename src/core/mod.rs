//! 核心层：错误类型、恢复策略与轮次报告

pub mod error;
pub mod recovery;
pub mod report;

pub use error::{ActionError, EnvironmentError, RecoveryAction, RoleError};
pub use recovery::RecoveryEngine;
pub use report::{RoundReport, WorkOutcome, WorkStatus};
