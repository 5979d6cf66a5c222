//! WriteCode：数据工程师为单个文件写代码

use async_trait::async_trait;

use crate::actions::action::render;
use crate::actions::{extract_code, Action, ActionContext, ActionOutput, Asker, OutputSchema};
use crate::core::ActionError;
use crate::memory::{topics, ActionId, FieldValue, InstructContent};

const SYSTEM: &str = "You are a data engineer. Write complete, modular and readable Python code \
that conforms to PEP8. Implement only the requested file.";

const PROMPT_TEMPLATE: &str = "# Context
{context}
-----
## Code: {filename}
Write the full content of {filename} in a single ```python code block.
";

pub struct WriteCode {
    asker: Asker,
    schema: OutputSchema,
}

impl WriteCode {
    pub fn new(asker: Asker) -> Self {
        Self {
            asker,
            schema: OutputSchema::new(),
        }
    }
}

/// 代码字段名
pub const CODE: &str = "Code";

/// 代码类 Action 产出的代码：取 `Code` 字段，其他产出退回原始文本
pub fn code_of(output: &ActionOutput) -> &str {
    output.instruct_content.text(CODE).unwrap_or(&output.content)
}

/// content 保留原始回复，抽出的代码放进 `Code` 字段；空代码视为格式错误
pub(crate) fn code_output(
    action: &ActionId,
    filename: &str,
    raw: &str,
) -> Result<ActionOutput, ActionError> {
    let code = extract_code(raw);
    if code.trim().is_empty() {
        return Err(ActionError::MalformedResponse {
            action: action.to_string(),
            section: format!("Code: {}", filename),
            reason: "is empty".to_string(),
        });
    }
    let ic = InstructContent::new()
        .with("Filename", FieldValue::Text(filename.to_string()))
        .with(CODE, FieldValue::Text(code));
    Ok(ActionOutput::new(raw, ic))
}

#[async_trait]
impl Action for WriteCode {
    fn id(&self) -> ActionId {
        topics::WRITE_CODE
    }

    fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError> {
        let filename = ctx.item.unwrap_or("main.py");
        let prompt = render(PROMPT_TEMPLATE, &[("context", ctx.context), ("filename", filename)]);
        let raw = self.asker.ask(&self.id(), SYSTEM, prompt).await?;
        code_output(&self.id(), filename, &raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_extracts_fenced_code() {
        let llm = MockLlmClient::new().on("Code: main.py", "Here:\n```python\nprint('hi')\n```\n");
        let action = WriteCode::new(Asker::new(Arc::new(llm), 5));
        let out = action
            .run(ActionContext::new("ctx").with_item("main.py"))
            .await
            .unwrap();
        assert_eq!(out.content, "Here:\n```python\nprint('hi')\n```\n");
        assert_eq!(code_of(&out), "print('hi')");
        assert_eq!(out.instruct_content.text("Filename"), Some("main.py"));
    }

    #[tokio::test]
    async fn test_empty_code_is_malformed() {
        let llm = MockLlmClient::new().on("Code: main.py", "```python\n\n```");
        let action = WriteCode::new(Asker::new(Arc::new(llm), 5));
        let err = action
            .run(ActionContext::new("ctx").with_item("main.py"))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_context_braces_are_not_substituted() {
        let llm = MockLlmClient::new().on("calls {filename} twice", "```python\nx = 1\n```");
        let action = WriteCode::new(Asker::new(Arc::new(llm), 5));
        let out = action
            .run(ActionContext::new("main calls {filename} twice").with_item("etl.py"))
            .await
            .unwrap();
        assert_eq!(code_of(&out), "x = 1");
    }
}
