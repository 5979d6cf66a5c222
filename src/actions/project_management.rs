//! WriteTasks：项目经理把设计拆成以文件为粒度的任务列表

use async_trait::async_trait;

use crate::actions::action::render;
use crate::actions::{Action, ActionContext, ActionOutput, Asker, FieldKind, OutputSchema};
use crate::core::ActionError;
use crate::memory::{topics, ActionId};

pub const PACKAGE_NAME: &str = "Python package name";
pub const TASK_LIST: &str = "Task list";
pub const REQUIRED_PACKAGES: &str = "Required Python third-party packages";

const SYSTEM: &str = "You are a project manager for a data engineering team. Break the design \
down into file-level tasks and analyze their dependencies.";

const PROMPT_TEMPLATE: &str = "# Context
{context}
-----
Use '##' to split sections, not '#'. Return every section inside a ```python code block.

## Python package name
Python str, lowercase and underscores only.

## Task list
Python list[str] of ONLY the required files, relative paths. Always include main.py.

## Required Python third-party packages
requirements.txt format.

## Full API spec
OpenAPI 3.0 for every API used by frontend and backend.

## Logic Analysis
Python list[tuple[str, str]]: filename, what it implements. Order by dependency.

## Shared Knowledge
Anything public, such as shared utilities or config variables.
";

pub struct WriteTasks {
    asker: Asker,
    schema: OutputSchema,
}

impl WriteTasks {
    pub fn new(asker: Asker) -> Self {
        Self {
            asker,
            schema: OutputSchema::new()
                .required(PACKAGE_NAME, FieldKind::Text)
                .required(TASK_LIST, FieldKind::List)
                .optional(REQUIRED_PACKAGES, FieldKind::Text)
                .optional("Full API spec", FieldKind::Text)
                .required("Logic Analysis", FieldKind::Pairs)
                .optional("Shared Knowledge", FieldKind::Text),
        }
    }
}

#[async_trait]
impl Action for WriteTasks {
    fn id(&self) -> ActionId {
        topics::WRITE_TASKS
    }

    fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError> {
        let prompt = render(PROMPT_TEMPLATE, &[("context", ctx.context)]);
        self.asker
            .ask_structured(&self.id(), &self.schema, SYSTEM, prompt)
            .await
    }
}
