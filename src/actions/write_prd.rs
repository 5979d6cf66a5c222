//! WritePRD：业务分析师把业务方需求整理成项目请求与高层待办

use async_trait::async_trait;

use crate::actions::action::render;
use crate::actions::{Action, ActionContext, ActionOutput, Asker, FieldKind, OutputSchema};
use crate::core::ActionError;
use crate::memory::{topics, ActionId};

const SYSTEM: &str = "You are a professional business analyst specialized in data-engineering solutions. \
Break the business owner's request down into chunks of work and delegate them to the right people.";

const PROMPT_TEMPLATE: &str = "# Context
## Original Requirements
{requirements}

## Role Definitions
{role_definitions}
-----
Use '##' to split sections, not '#'. Fill in the following sections:

## Project Request
Plain text. The polished, complete original business owner request.

## High-Level Project Backlog
Plain text. A high-level backlog of the chunks of work to be handed off, delegated by role.
";

pub struct WritePrd {
    asker: Asker,
    role_definitions: String,
    schema: OutputSchema,
}

impl WritePrd {
    pub fn new(asker: Asker) -> Self {
        Self {
            asker,
            role_definitions: String::new(),
            schema: OutputSchema::new()
                .required("Project Request", FieldKind::Text)
                .required("High-Level Project Backlog", FieldKind::Text),
        }
    }

    /// 已雇佣角色的职责描述，供分析师按角色分派待办
    pub fn with_role_definitions(mut self, defs: impl Into<String>) -> Self {
        self.role_definitions = defs.into();
        self
    }
}

#[async_trait]
impl Action for WritePrd {
    fn id(&self) -> ActionId {
        topics::WRITE_PRD
    }

    fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError> {
        let prompt = render(
            PROMPT_TEMPLATE,
            &[("requirements", ctx.context), ("role_definitions", self.role_definitions.as_str())],
        );
        self.asker
            .ask_structured(&self.id(), &self.schema, SYSTEM, prompt)
            .await
    }
}
