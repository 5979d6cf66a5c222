//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DATACO__*` 覆盖（双下划线表示嵌套，如 `DATACO__LLM__PROVIDER=openai`）。
//! 工作区根目录只在这里出现一次，之后作为值显式传给持久化协作方。

use std::path::PathBuf;

use serde::Deserialize;

use crate::roles::{ContextStrategy, TodoPolicy};
use crate::environment::DuplicatePolicy;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub company: CompanySection,
}

/// [app] 段：工作区根目录与调度轮数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 生成文件的根目录，未设置时用 ./workspace
    pub workspace_root: Option<PathBuf>,
    /// DataCompany::run 的外层步数
    pub n_round: usize,
    /// 每一步内 Environment::run(k) 的 k
    pub rounds_per_step: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            workspace_root: None,
            n_round: 1,
            rounds_per_step: 4,
        }
    }
}

impl AppSection {
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("workspace"))
    }
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai；优先级由 API Key 与 provider 共同决定
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次推理调用超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 120 }
    }
}

/// [company] 段：组织行为开关
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CompanySection {
    /// 数据工程师写完代码后是否追加一次 review
    pub use_code_review: bool,
    /// 新的相关消息到达时待办列表替换还是合并
    pub todo_policy: TodoPolicy,
    /// 行动时上下文取全部记忆还是仅订阅主题
    pub context_strategy: ContextStrategy,
    /// 角色重名时拒绝还是覆盖
    pub duplicate_policy: DuplicatePolicy,
}

/// 从 config 目录加载配置，环境变量 DATACO__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DATACO__*
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        if std::path::Path::new(&format!("{}.toml", name)).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path.filter(|p| p.exists()) {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DATACO")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.rounds_per_step, 4);
        assert_eq!(cfg.app.n_round, 1);
        assert_eq!(cfg.llm.timeouts.request, 120);
        assert_eq!(cfg.company.todo_policy, TodoPolicy::Replace);
        assert_eq!(cfg.company.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(cfg.app.workspace_root(), PathBuf::from("workspace"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[app]
workspace_root = "/tmp/ws"
rounds_per_step = 2

[company]
use_code_review = true
todo_policy = "merge"
context_strategy = "watched"
duplicate_policy = "overwrite"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.app.rounds_per_step, 2);
        assert_eq!(cfg.app.n_round, 1);
        assert_eq!(cfg.app.workspace_root(), PathBuf::from("/tmp/ws"));
        assert!(cfg.company.use_code_review);
        assert_eq!(cfg.company.todo_policy, TodoPolicy::Merge);
        assert_eq!(cfg.company.context_strategy, ContextStrategy::Watched);
        assert_eq!(cfg.company.duplicate_policy, DuplicatePolicy::Overwrite);
    }
}
