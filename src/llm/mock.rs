//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 按 prompt 中出现的关键字匹配脚本化回复；未匹配时回显固定文本。
//! 可注入一次性失败，用于验证重试与降级路径。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{ChatMessage, LlmClient, LlmError};

/// 一条脚本规则：prompt 包含 `needle` 时依次弹出 `replies`（弹空后重复最后一条）
#[derive(Debug)]
struct Rule {
    needle: String,
    replies: VecDeque<Result<String, LlmError>>,
    last: Option<Result<String, LlmError>>,
}

/// Mock 客户端：脚本化回复 + 调用计数
#[derive(Debug, Default)]
pub struct MockLlmClient {
    rules: Mutex<Vec<Rule>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// prompt 包含 needle 时返回 reply（可多次调用同一 needle 形成回复序列）
    pub fn on(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push(needle.into(), Ok(reply.into()));
        self
    }

    /// prompt 包含 needle 时返回错误
    pub fn fail_on(self, needle: impl Into<String>, err: LlmError) -> Self {
        self.push(needle.into(), Err(err));
        self
    }

    fn push(&self, needle: String, reply: Result<String, LlmError>) {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        match rules.iter_mut().find(|r| r.needle == needle) {
            Some(rule) => rule.replies.push_back(reply),
            None => rules.push(Rule {
                needle,
                replies: VecDeque::from([reply]),
                last: None,
            }),
        }
    }

    /// 累计调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rule) = rules.iter_mut().find(|r| prompt.contains(&r.needle)) {
            if let Some(reply) = rule.replies.pop_front() {
                rule.last = Some(reply.clone());
                return reply;
            }
            if let Some(last) = &rule.last {
                return last.clone();
            }
        }

        let tail: String = prompt.chars().rev().take(80).collect::<Vec<_>>().into_iter().rev().collect();
        Ok(format!("Echo from Mock: {}", tail.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_sequence_repeats_last() {
        let llm = MockLlmClient::new().on("PRD", "first").on("PRD", "second");
        let msgs = [ChatMessage::user("write the PRD")];
        assert_eq!(llm.complete(&msgs).await.unwrap(), "first");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "second");
        assert_eq!(llm.complete(&msgs).await.unwrap(), "second");
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_unmatched_prompt_echoes() {
        let llm = MockLlmClient::new();
        let out = llm.complete(&[ChatMessage::user("hello")]).await.unwrap();
        assert!(out.starts_with("Echo from Mock"));
    }

    #[tokio::test]
    async fn test_fail_on_returns_error() {
        let llm = MockLlmClient::new().fail_on("boom", LlmError::Network("down".into()));
        let err = llm.complete(&[ChatMessage::user("boom")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }
}
