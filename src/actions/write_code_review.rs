//! WriteCodeReview：可选的精修步骤，审阅并重写单个文件

use async_trait::async_trait;

use crate::actions::action::render;
use crate::actions::write_code::code_output;
use crate::actions::{parse_blocks, Action, ActionContext, ActionOutput, Asker, OutputSchema};
use crate::core::ActionError;
use crate::memory::{topics, ActionId};

const SYSTEM: &str = "You are a senior data engineer doing code review. Point out issues, \
then rewrite the file with the issues fixed.";

const PROMPT_TEMPLATE: &str = "# Context
{context}

## Code: {filename}
```python
{code}
```
-----
## Code Review
List at most five concrete issues.

## Rewrite Code: {filename}
The full improved file in a single ```python code block.
";

pub struct WriteCodeReview {
    asker: Asker,
    schema: OutputSchema,
}

impl WriteCodeReview {
    pub fn new(asker: Asker) -> Self {
        Self {
            asker,
            schema: OutputSchema::new(),
        }
    }
}

#[async_trait]
impl Action for WriteCodeReview {
    fn id(&self) -> ActionId {
        topics::WRITE_CODE_REVIEW
    }

    fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError> {
        let filename = ctx.item.unwrap_or("main.py");
        let prompt = render(
            PROMPT_TEMPLATE,
            &[
                ("context", ctx.context),
                ("filename", filename),
                ("code", ctx.extra.unwrap_or_default()),
            ],
        );
        let raw = self.asker.ask(&self.id(), SYSTEM, prompt).await?;

        // 优先取 "Rewrite Code" 段，没有分段时整段当代码
        let rewrite = parse_blocks(&raw)
            .into_iter()
            .find(|(title, _)| title.starts_with("Rewrite Code"))
            .map(|(_, body)| body)
            .unwrap_or_else(|| raw.clone());
        let mut output = code_output(&self.id(), filename, &rewrite)?;
        output.content = raw;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::actions::code_of;
    use crate::llm::MockLlmClient;

    #[tokio::test]
    async fn test_takes_rewrite_section() {
        let llm = MockLlmClient::new().on(
            "code review",
            "## Code Review\n1. naming\n## Rewrite Code: main.py\n```python\nprint('better')\n```\n",
        );
        let action = WriteCodeReview::new(Asker::new(Arc::new(llm), 5));
        let out = action
            .run(
                ActionContext::new("ctx")
                    .with_item("main.py")
                    .with_extra("print('hi')"),
            )
            .await
            .unwrap();
        assert_eq!(code_of(&out), "print('better')");
        assert!(out.content.starts_with("## Code Review"));
    }
}
