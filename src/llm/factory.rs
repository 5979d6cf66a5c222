//! 根据配置与环境变量选择推理服务后端（DeepSeek / OpenAI 兼容 / Mock）

use std::sync::Arc;

use crate::config::LlmSection;
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient};

/// 选择后端：有 DeepSeek Key（或 provider=deepseek 且仅有 OpenAI Key）走 DeepSeek；
/// 有 OpenAI Key 走 OpenAI 兼容端点；否则或 `force_mock` 时用 Mock。
pub fn create_llm_from_config(llm: &LlmSection, force_mock: bool) -> Arc<dyn LlmClient> {
    if force_mock {
        tracing::info!("Using Mock LLM (forced)");
        return Arc::new(MockLlmClient::new());
    }

    let provider = llm.provider.to_lowercase();
    let has_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai = std::env::var("OPENAI_API_KEY").is_ok();

    if has_deepseek || (provider == "deepseek" && has_openai) {
        tracing::info!("Using DeepSeek LLM ({})", llm.model);
        Arc::new(create_deepseek_client(Some(&llm.model)))
    } else if has_openai {
        tracing::info!("Using OpenAI LLM ({})", llm.model);
        Arc::new(OpenAiClient::new(llm.base_url.as_deref(), &llm.model, None))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}
