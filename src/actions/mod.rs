//! Action 层：命名的工作单元
//!
//! 每个 Action 用固定模板 + 上下文拼出请求，对推理服务恰好调用一次，再按声明的输出 schema 解析。
//! 持久化不属于 Action，由调用方（角色）交给 ArtifactSink。

pub mod action;
pub mod design_api;
pub mod project_management;
pub mod registry;
pub mod schema;
pub mod write_code;
pub mod write_code_review;
pub mod write_prd;

pub use action::{Action, ActionContext, ActionOutput, Asker};
pub use design_api::WriteDesign;
pub use project_management::WriteTasks;
pub use registry::ActionRegistry;
pub use schema::{extract_code, parse_blocks, FieldKind, OutputSchema, SchemaField};
pub use write_code::{code_of, WriteCode, CODE};
pub use write_code_review::WriteCodeReview;
pub use write_prd::WritePrd;
