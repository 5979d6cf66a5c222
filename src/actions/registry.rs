//! Action 注册表：ActionId → Arc<dyn Action>
//!
//! 主题到 Action 的映射是静态配置数据；角色只持有 ActionId，执行时到这里查找。

use std::collections::HashMap;
use std::sync::Arc;

use crate::actions::{Action, Asker, WriteCode, WriteCodeReview, WriteDesign, WritePrd, WriteTasks};
use crate::core::ActionError;
use crate::memory::ActionId;

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 数据公司的全部内置 Action，共享同一个推理服务句柄
    pub fn standard(asker: Asker, role_definitions: &str) -> Self {
        let mut registry = Self::new();
        registry.register(WritePrd::new(asker.clone()).with_role_definitions(role_definitions));
        registry.register(WriteDesign::new(asker.clone()));
        registry.register(WriteTasks::new(asker.clone()));
        registry.register(WriteCode::new(asker.clone()));
        registry.register(WriteCodeReview::new(asker));
        registry
    }

    pub fn register(&mut self, action: impl Action + 'static) {
        self.register_arc(Arc::new(action));
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) {
        self.actions.insert(action.id(), action);
    }

    pub fn get(&self, id: &ActionId) -> Result<Arc<dyn Action>, ActionError> {
        self.actions
            .get(id)
            .cloned()
            .ok_or_else(|| ActionError::UnknownAction(id.to_string()))
    }

    pub fn contains(&self, id: &ActionId) -> bool {
        self.actions.contains_key(id)
    }

    pub fn ids(&self) -> Vec<ActionId> {
        let mut ids: Vec<_> = self.actions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::memory::topics;

    #[test]
    fn test_standard_registry() {
        let registry = ActionRegistry::standard(Asker::new(Arc::new(MockLlmClient::new()), 5), "");
        assert_eq!(registry.ids().len(), 5);
        assert!(registry.contains(&topics::WRITE_CODE_REVIEW));
        assert!(matches!(
            registry.get(&topics::BUSINESS_OWNER_REQUEST),
            Err(ActionError::UnknownAction(_))
        ));
    }
}
