//! WriteDesign：数据架构师基于 PRD 给出系统设计

use async_trait::async_trait;

use crate::actions::action::render;
use crate::actions::{Action, ActionContext, ActionOutput, Asker, FieldKind, OutputSchema};
use crate::core::ActionError;
use crate::memory::{topics, ActionId};

const SYSTEM: &str = "You are a data architect. Design the organization's data infrastructure \
(ETL pipelines, data management, operationalization) so it is efficient, scalable and secure.";

/// 领域背景：通用数据接入框架
const SPECIALIZED_KNOWLEDGE: &str = "A Python API Data Adaptor is a generic data ingestion framework \
with a `config` package (connector yaml: ProjectName, DataSource, ConnectorType, FetchFrequency, ...) \
and a `data-connectors` package (database, blob storage, local folder) ingesting json/xml/excel/csv \
into a raw zone, converting every raw file to csv.";

const PROMPT_TEMPLATE: &str = "# Context
{context}

## Specialized Knowledge
{knowledge}
-----
Use '##' to split sections, not '#'. Fill in the following sections:

## High Level System Design
Plain text. How responsibilities were partitioned into components and why.

## Data structures and interface definitions
A mermaid classDiagram with classes, methods and relationships.

## Program call flow
A mermaid sequenceDiagram using the classes defined above.
";

pub struct WriteDesign {
    asker: Asker,
    schema: OutputSchema,
}

impl WriteDesign {
    pub fn new(asker: Asker) -> Self {
        Self {
            asker,
            schema: OutputSchema::new()
                .required("High Level System Design", FieldKind::Text)
                .required("Data structures and interface definitions", FieldKind::Text)
                .required("Program call flow", FieldKind::Text),
        }
    }
}

#[async_trait]
impl Action for WriteDesign {
    fn id(&self) -> ActionId {
        topics::WRITE_DESIGN
    }

    fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    async fn run(&self, ctx: ActionContext<'_>) -> Result<ActionOutput, ActionError> {
        let prompt = render(
            PROMPT_TEMPLATE,
            &[("context", ctx.context), ("knowledge", SPECIALIZED_KNOWLEDGE)],
        );
        self.asker
            .ask_structured(&self.id(), &self.schema, SYSTEM, prompt)
            .await
    }
}
