//! 记忆：只追加的消息日志 + 按 cause_by 的二级索引
//!
//! 插入顺序即到达顺序；索引只存位置，因此每条消息恰好落在一个桶里，且桶内保持到达顺序。

use std::collections::HashMap;

use crate::memory::{ActionId, Message};

#[derive(Clone, Debug, Default)]
pub struct Memory {
    storage: Vec<Message>,
    index: HashMap<ActionId, Vec<usize>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条消息并更新索引（不去重）
    pub fn add(&mut self, message: Message) {
        let pos = self.storage.len();
        self.index
            .entry(message.cause_by().clone())
            .or_default()
            .push(pos);
        self.storage.push(message);
    }

    pub fn add_batch(&mut self, messages: impl IntoIterator<Item = Message>) {
        for m in messages {
            self.add(m);
        }
    }

    /// cause_by 等于 action 的全部消息（到达顺序）；未见过的标识返回空
    pub fn get_by_action(&self, action: &ActionId) -> Vec<&Message> {
        self.index
            .get(action)
            .map(|positions| positions.iter().map(|&i| &self.storage[i]).collect())
            .unwrap_or_default()
    }

    /// 多个标识的并集，保持到达顺序
    pub fn get_by_actions<'a, I>(&self, actions: I) -> Vec<&Message>
    where
        I: IntoIterator<Item = &'a ActionId>,
    {
        let mut positions: Vec<usize> = actions
            .into_iter()
            .filter_map(|a| self.index.get(a))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions.into_iter().map(|i| &self.storage[i]).collect()
    }

    pub fn storage(&self) -> &[Message] {
        &self.storage
    }

    pub fn last(&self) -> Option<&Message> {
        self.storage.last()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 全部消息拼成的文本（Action 默认上下文）
    pub fn contents(&self) -> String {
        join_contents(self.storage.iter())
    }
}

/// 把一组消息渲染为 "role: content" 行
pub fn join_contents<'a>(messages: impl Iterator<Item = &'a Message>) -> String {
    messages
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
