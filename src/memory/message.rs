//! 消息：角色间通信的不可变单元
//!
//! `cause_by` 是产生该消息的 Action 标识，同时充当订阅主题。
//! 字段私有、只读访问；“转发”必须构造新消息。

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action 标识 / 消息主题。与任何可执行类型解耦，只是一个字符串标签。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(Cow<'static, str>);

impl ActionId {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ActionId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// 内置主题
pub mod topics {
    use super::ActionId;

    /// 业务方提出的初始需求（种子消息）
    pub const BUSINESS_OWNER_REQUEST: ActionId = ActionId::from_static("BusinessOwnerRequest");
    /// 从文档导入的需求（数据工程师可直接据此编码）
    pub const BOSS_REQUIREMENT_FROM_DOCUMENTS: ActionId =
        ActionId::from_static("BossRequirementFromDocuments");
    pub const WRITE_PRD: ActionId = ActionId::from_static("WritePRD");
    pub const WRITE_DESIGN: ActionId = ActionId::from_static("WriteDesign");
    pub const WRITE_TASKS: ActionId = ActionId::from_static("WriteTasks");
    pub const WRITE_CODE: ActionId = ActionId::from_static("WriteCode");
    pub const WRITE_CODE_REVIEW: ActionId = ActionId::from_static("WriteCodeReview");
    /// 失败标记消息的主题：工作项失败在历史中显式可见
    pub const ROLE_FAILURE: ActionId = ActionId::from_static("RoleFailure");
}

/// 结构化字段值：纯文本 / 字符串列表 / 键值对列表
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&[(String, String)]> {
        match self {
            FieldValue::Pairs(pairs) => Some(pairs),
            _ => None,
        }
    }
}

/// Action 按输出 schema 解析出的结构化内容（保持段落顺序）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructContent {
    fields: Vec<(String, FieldValue)>,
}

impl InstructContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同名字段覆盖原值，保留原位置
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    content: String,
    role: String,
    cause_by: ActionId,
    send_to: Option<String>,
    instruct_content: Option<InstructContent>,
    failure: Option<String>,
    created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(content: impl Into<String>, role: impl Into<String>, cause_by: ActionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            role: role.into(),
            cause_by,
            send_to: None,
            instruct_content: None,
            failure: None,
            created_at: Utc::now(),
        }
    }

    /// 工作项失败标记：主题固定为 RoleFailure，content 描述失败的工作项
    pub fn failure(role: impl Into<String>, item: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut msg = Self::new(
            format!("work item '{}' failed: {}", item, reason),
            role,
            topics::ROLE_FAILURE,
        );
        msg.failure = Some(reason);
        msg
    }

    pub fn with_send_to(mut self, to: impl Into<String>) -> Self {
        self.send_to = Some(to.into());
        self
    }

    pub fn with_instruct_content(mut self, content: InstructContent) -> Self {
        self.instruct_content = Some(content);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn cause_by(&self) -> &ActionId {
        &self.cause_by
    }

    pub fn send_to(&self) -> Option<&str> {
        self.send_to.as_deref()
    }

    pub fn instruct_content(&self) -> Option<&InstructContent> {
        self.instruct_content.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.role, self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_fields() {
        let ic = InstructContent::new().with("Task list", FieldValue::List(vec!["main.py".into()]));
        let msg = Message::new("tasks", "Project Manager", topics::WRITE_TASKS)
            .with_send_to("Data Engineer")
            .with_instruct_content(ic);
        assert_eq!(msg.cause_by(), &topics::WRITE_TASKS);
        assert_eq!(msg.send_to(), Some("Data Engineer"));
        assert_eq!(
            msg.instruct_content().and_then(|c| c.list("Task list")),
            Some(&["main.py".to_string()][..])
        );
        assert!(!msg.is_failure());
    }

    #[test]
    fn test_failure_marker() {
        let msg = Message::failure("Data Engineer", "main.py", "malformed");
        assert!(msg.is_failure());
        assert_eq!(msg.cause_by(), &topics::ROLE_FAILURE);
        assert!(msg.content().contains("main.py"));
    }

    #[test]
    fn test_action_id_equality_across_ownership() {
        assert_eq!(ActionId::new("WritePRD"), topics::WRITE_PRD);
    }

    #[test]
    fn test_instruct_content_insert_overwrites_in_place() {
        let mut ic = InstructContent::new()
            .with("a", FieldValue::Text("1".into()))
            .with("b", FieldValue::Text("2".into()));
        ic.insert("a", FieldValue::Text("3".into()));
        let keys: Vec<_> = ic.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(ic.text("a"), Some("3"));
    }
}
