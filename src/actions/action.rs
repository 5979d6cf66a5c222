//! Action trait 与共享的推理调用封装
//!
//! Asker 对每次调用施加超时，并输出一条结构化审计日志（JSON）；超时转为 ActionError::Timeout。

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::{Captures, Regex};
use serde::Serialize;
use tokio::time::timeout;

use crate::actions::OutputSchema;
use crate::core::ActionError;
use crate::llm::{ChatMessage, LlmClient};
use crate::memory::{ActionId, InstructContent};

/// 一次调用的输入：调用方提供的历史文本 + 当前工作项
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionContext<'a> {
    /// 先前消息渲染成的文本（由角色的上下文策略决定取哪些）
    pub context: &'a str,
    /// 当前工作项，如文件名；单交付物角色为 None
    pub item: Option<&'a str>,
    /// 附加输入，如待 review 的代码
    pub extra: Option<&'a str>,
}

impl<'a> ActionContext<'a> {
    pub fn new(context: &'a str) -> Self {
        Self {
            context,
            item: None,
            extra: None,
        }
    }

    pub fn with_item(mut self, item: &'a str) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_extra(mut self, extra: &'a str) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// 成功结果：始终带原始文本，外加按 schema 解析出的字段
#[derive(Clone, Debug, Default, Serialize)]
pub struct ActionOutput {
    pub content: String,
    pub instruct_content: InstructContent,
}

impl ActionOutput {
    pub fn new(content: impl Into<String>, instruct_content: InstructContent) -> Self {
        Self {
            content: content.into(),
            instruct_content,
        }
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    /// 唯一标识，同时是产出消息的主题
    fn id(&self) -> ActionId;

    fn schema(&self) -> &OutputSchema;

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError>;
}

/// 推理服务句柄 + 单次调用超时，可在多个 Action 间共享
#[derive(Clone)]
pub struct Asker {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl Asker {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 调用一次推理服务，返回原始文本
    pub async fn ask(
        &self,
        action: &ActionId,
        system: &str,
        prompt: String,
    ) -> Result<String, ActionError> {
        let start = Instant::now();
        let messages = [ChatMessage::system(system), ChatMessage::user(prompt)];
        let result = timeout(self.timeout, self.llm.complete(&messages)).await;

        let outcome = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(_)) => "error",
            Err(_) => "timeout",
        };
        let audit = serde_json::json!({
            "event": "llm_audit",
            "action": action.as_str(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
        });
        tracing::info!(audit = %audit, "llm");

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ActionError::ServiceUnavailable(e)),
            Err(_) => Err(ActionError::Timeout {
                action: action.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    /// 调用一次并按 schema 解析
    pub async fn ask_structured(
        &self,
        action: &ActionId,
        schema: &OutputSchema,
        system: &str,
        prompt: String,
    ) -> Result<ActionOutput, ActionError> {
        let raw = self.ask(action, system, prompt).await?;
        let instruct_content = schema.parse(action, &raw)?;
        Ok(ActionOutput::new(raw, instruct_content))
    }
}

/// 单遍填充 `{name}` 占位符：替换进去的值不会再被扫描，未知占位符原样保留
pub(crate) fn render(template: &str, vars: &[(&str, &str)]) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER.get_or_init(|| Regex::new(r"\{([a-z_]+)\}").expect("static regex"));
    re.replace_all(template, |caps: &Captures| {
        vars.iter()
            .find(|(name, _)| *name == &caps[1])
            .map(|(_, value)| value.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::memory::topics;

    struct SlowLlm;

    #[async_trait]
    impl LlmClient for SlowLlm {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_recoverable_error() {
        let asker = Asker::new(Arc::new(SlowLlm), 1).with_timeout(Duration::from_millis(20));
        let err = asker
            .ask(&topics::WRITE_CODE, "sys", "prompt".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Timeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_service_error_maps_to_unavailable() {
        let llm = MockLlmClient::new().fail_on("prompt", LlmError::Network("reset".into()));
        let asker = Asker::new(Arc::new(llm), 5);
        let err = asker
            .ask(&topics::WRITE_CODE, "sys", "prompt".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ServiceUnavailable(LlmError::Network(_))));
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let out = render(
            "# Context\n{context}\n## Code: {filename}\n{unknown}",
            &[("context", "see {filename} and {code}"), ("filename", "a.py")],
        );
        assert_eq!(out, "# Context\nsee {filename} and {code}\n## Code: a.py\n{unknown}");
    }
}
