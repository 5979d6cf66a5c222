//! 记忆层：不可变消息与只追加的消息日志（带 cause_by 索引）

pub mod message;
pub mod store;

pub use message::{topics, ActionId, FieldValue, InstructContent, Message};
pub use store::{join_contents, Memory};
