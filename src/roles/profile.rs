//! 角色画像：声明式描述一个角色（名字、目标、可执行的 Action、订阅的主题、待办来源）
//!
//! 不同“性格”的角色只是不同的数据；act() 只有一份实现，差异通过这里的开关表达。

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::memory::ActionId;

/// 如何从一条相关消息得到待办列表
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TodoSource {
    /// 单一交付物，待办就是这一项（如 "prd"）
    Deliverable(String),
    /// 取消息结构化内容中的列表段落（缺失时从正文解析），如 "Task list"
    TaskList { section: &'static str },
}

/// 新的相关消息到达时如何处理尚未完成的待办
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPolicy {
    /// 整体替换：新消息完全取代旧待办，未完成项丢弃
    #[default]
    Replace,
    /// 合并：保留未完成项，追加新消息中未出现过的项
    Merge,
}

/// 行动时喂给 Action 的上下文
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStrategy {
    /// 私有记忆中的全部消息
    #[default]
    Full,
    /// 仅订阅主题的消息
    Watched,
}

#[derive(Clone, Debug)]
pub struct RoleProfile {
    pub name: String,
    pub profile: String,
    pub goal: String,
    pub constraints: String,
    /// 第一个是主产出 Action；构造时必定非空
    actions: Vec<ActionId>,
    pub watch: BTreeSet<ActionId>,
    pub todo_source: TodoSource,
    /// 可选精修步骤（如代码 review），失败时降级为未精修结果
    pub review_action: Option<ActionId>,
    /// 汇总消息的下游接收者；None 表示广播
    pub send_to: Option<String>,
    pub todo_policy: TodoPolicy,
    pub context_strategy: ContextStrategy,
}

impl RoleProfile {
    pub fn new(name: impl Into<String>, profile: impl Into<String>, primary: ActionId) -> Self {
        let profile = profile.into();
        Self {
            name: name.into(),
            todo_source: TodoSource::Deliverable(primary.to_string()),
            profile,
            goal: String::new(),
            constraints: String::new(),
            actions: vec![primary],
            watch: BTreeSet::new(),
            review_action: None,
            send_to: None,
            todo_policy: TodoPolicy::default(),
            context_strategy: ContextStrategy::default(),
        }
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn constraints(mut self, constraints: impl Into<String>) -> Self {
        self.constraints = constraints.into();
        self
    }

    pub fn watch(mut self, topics: impl IntoIterator<Item = ActionId>) -> Self {
        self.watch.extend(topics);
        self
    }

    pub fn todo_source(mut self, source: TodoSource) -> Self {
        self.todo_source = source;
        self
    }

    pub fn review_with(mut self, action: ActionId) -> Self {
        if !self.actions.contains(&action) {
            self.actions.push(action.clone());
        }
        self.review_action = Some(action);
        self
    }

    pub fn send_to(mut self, to: impl Into<String>) -> Self {
        self.send_to = Some(to.into());
        self
    }

    pub fn todo_policy(mut self, policy: TodoPolicy) -> Self {
        self.todo_policy = policy;
        self
    }

    pub fn context_strategy(mut self, strategy: ContextStrategy) -> Self {
        self.context_strategy = strategy;
        self
    }

    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    pub fn primary_action(&self) -> &ActionId {
        &self.actions[0]
    }

    pub fn watches(&self, topic: &ActionId) -> bool {
        self.watch.contains(topic)
    }

    /// 一行职责描述，供 WritePRD 按角色分派待办
    pub fn definition(&self) -> String {
        format!("- {} ({}): {}", self.profile, self.name, self.goal)
    }
}
