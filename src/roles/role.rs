//! 角色：observe → decide → act → publish 的单步状态机
//!
//! - recv：总是追加到私有记忆；主题在订阅集合内则按 TodoSource 重算待办并置为 Runnable
//! - act：逐项执行主 Action（可选 review），落盘，汇总成一条出站消息
//! - 单个工作项失败不影响其余工作项；可重试的失败项留在待办里（至少一次语义）
//! - execute 与 commit 分开：待办只在 commit 时更新，环境在轮次屏障处 commit

use std::fmt;
use std::sync::Arc;

use crate::actions::{code_of, ActionContext, ActionOutput, ActionRegistry, FieldKind, OutputSchema};
use crate::core::{ActionError, RecoveryAction, RecoveryEngine, RoleError, WorkOutcome};
use crate::memory::{join_contents, ActionId, FieldValue, InstructContent, Memory, Message};
use crate::roles::{ContextStrategy, RoleProfile, TodoPolicy, TodoSource};
use crate::workspace::ArtifactSink;

/// 汇总消息中多个工作项之间的分隔符
pub const MSG_SEP: &str = "\n---\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleState {
    Idle,
    Runnable,
    Acting,
}

impl fmt::Display for RoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleState::Idle => write!(f, "idle"),
            RoleState::Runnable => write!(f, "runnable"),
            RoleState::Acting => write!(f, "acting"),
        }
    }
}

/// 一次 act 提交后的产出
#[derive(Debug)]
pub struct RoleOutput {
    /// 成功工作项的汇总消息；全部失败时为 None
    pub message: Option<Message>,
    /// 按待办顺序的每项结果
    pub outcomes: Vec<WorkOutcome>,
    /// 每个失败工作项一条 RoleFailure 标记
    pub failures: Vec<Message>,
}

#[derive(Debug)]
struct DoneItem {
    item: String,
    output: ActionOutput,
    path: Option<String>,
}

/// 已执行、尚未提交的一批工作项
#[derive(Debug, Default)]
pub(crate) struct PendingAct {
    results: Vec<Result<DoneItem, RoleError>>,
    /// 成功项的逐项消息，后续工作项的上下文也会用到
    produced: Vec<Message>,
}

pub struct Role {
    profile: RoleProfile,
    actions: Arc<ActionRegistry>,
    sink: Arc<dyn ArtifactSink>,
    memory: Memory,
    todos: Vec<String>,
    state: RoleState,
    recovery: RecoveryEngine,
    /// 行动期间收到的消息，行动结束后再判断相关性
    deferred: Vec<Message>,
}

impl Role {
    pub fn new(
        profile: RoleProfile,
        actions: Arc<ActionRegistry>,
        sink: Arc<dyn ArtifactSink>,
    ) -> Self {
        Self {
            profile,
            actions,
            sink,
            memory: Memory::new(),
            todos: Vec::new(),
            state: RoleState::Idle,
            recovery: RecoveryEngine::new(),
            deferred: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &RoleProfile {
        &self.profile
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn todos(&self) -> &[String] {
        &self.todos
    }

    pub fn state(&self) -> RoleState {
        self.state
    }

    pub fn is_runnable(&self) -> bool {
        self.state == RoleState::Runnable
    }

    /// 接收一条消息；返回该消息对本角色是否相关
    pub fn recv(&mut self, message: Message) -> bool {
        if self.state == RoleState::Acting {
            self.memory.add(message.clone());
            let relevant = self.profile.watches(message.cause_by());
            self.deferred.push(message);
            return relevant;
        }
        let relevant = self.observe(&message);
        self.memory.add(message);
        relevant
    }

    /// 相关性判断与待办重算（不追加记忆）
    fn observe(&mut self, message: &Message) -> bool {
        if !self.profile.watches(message.cause_by()) {
            return false;
        }
        let items = self.derive_todos(message);
        match self.profile.todo_policy {
            TodoPolicy::Replace => {
                if !self.todos.is_empty() && self.todos != items {
                    tracing::warn!(
                        role = %self.profile.name,
                        "Relevant message replaces {} pending work item(s)",
                        self.todos.len()
                    );
                }
                self.todos = items;
            }
            TodoPolicy::Merge => {
                for item in items {
                    if !self.todos.contains(&item) {
                        self.todos.push(item);
                    }
                }
            }
        }
        self.state = RoleState::Runnable;
        tracing::debug!(role = %self.profile.name, todos = ?self.todos, "runnable");
        true
    }

    fn derive_todos(&self, message: &Message) -> Vec<String> {
        match &self.profile.todo_source {
            TodoSource::Deliverable(name) => vec![name.clone()],
            TodoSource::TaskList { section } => {
                if let Some(list) = message.instruct_content().and_then(|ic| ic.list(section)) {
                    return list.to_vec();
                }
                let schema = OutputSchema::new().required(*section, FieldKind::List);
                match schema.parse(message.cause_by(), message.content()) {
                    Ok(ic) => ic.list(section).map(<[String]>::to_vec).unwrap_or_default(),
                    Err(e) => {
                        tracing::warn!(role = %self.profile.name, "No work items in message: {}", e);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn context_text(&self) -> String {
        match self.profile.context_strategy {
            ContextStrategy::Full => self.memory.contents(),
            ContextStrategy::Watched => {
                join_contents(self.memory.get_by_actions(&self.profile.watch).into_iter())
            }
        }
    }

    /// 执行一步并立即提交；未处于 Runnable 时返回 None
    pub async fn act(&mut self) -> Option<RoleOutput> {
        let pending = self.execute().await?;
        self.commit(pending)
    }

    /// 逐项执行待办，但不改动待办与记忆；状态停在 Acting，直到 commit
    ///
    /// 环境在轮次屏障处统一 commit，所以被取消的轮次里已完成的角色同样保留待办。
    pub(crate) async fn execute(&mut self) -> Option<PendingAct> {
        if self.state != RoleState::Runnable {
            return None;
        }
        self.state = RoleState::Acting;
        Some(self.run_items().await)
    }

    /// 提交一次 execute 的结果：成功项出待办，可重试的失败项留下，Abort 的失败项搁置
    pub(crate) fn commit(&mut self, pending: PendingAct) -> Option<RoleOutput> {
        if self.state != RoleState::Acting {
            return None;
        }
        let name = self.profile.name.clone();
        let mut outcomes = Vec::with_capacity(pending.results.len());
        let mut done = Vec::new();
        let mut failures = Vec::new();
        let mut retry = Vec::new();

        for result in pending.results {
            match result {
                Ok(item) => {
                    outcomes.push(WorkOutcome::succeeded(&name, &item.item));
                    done.push(item);
                }
                Err(e) => {
                    let verdict = self.recovery.handle(e.action_error());
                    outcomes.push(WorkOutcome::failed(&name, e.item(), e.to_string(), &verdict));
                    failures.push(Message::failure(&name, e.item(), e.action_error().to_string()));
                    match verdict {
                        RecoveryAction::RetryNextRound => {
                            tracing::warn!(role = %name, "Work item failed, retrying next round: {}", e);
                            retry.push(e.item().to_string());
                        }
                        RecoveryAction::Abort => {
                            tracing::error!(role = %name, "Work item parked: {}", e);
                        }
                    }
                }
            }
        }

        // 多工作项角色把每个文件的产出记入私有记忆；单交付物经总线回到自己
        if matches!(self.profile.todo_source, TodoSource::TaskList { .. }) {
            self.memory.add_batch(pending.produced);
        }
        self.todos = retry;
        self.state = if self.todos.is_empty() {
            RoleState::Idle
        } else {
            RoleState::Runnable
        };
        self.apply_deferred();

        if outcomes.is_empty() {
            return None;
        }
        let message = (!done.is_empty()).then(|| self.aggregate(done));
        Some(RoleOutput {
            message,
            outcomes,
            failures,
        })
    }

    /// 行动被取消（future 被丢弃）或结果未提交时恢复：待办原样保留，重新置为 Runnable
    pub fn recover_interrupted(&mut self) {
        if self.state == RoleState::Acting {
            tracing::warn!(role = %self.profile.name, "Act interrupted, keeping {} work item(s)", self.todos.len());
            self.state = RoleState::Runnable;
            self.apply_deferred();
        }
    }

    fn apply_deferred(&mut self) {
        for message in std::mem::take(&mut self.deferred) {
            self.observe(&message);
        }
    }

    async fn run_items(&self) -> PendingAct {
        let mut pending = PendingAct::default();
        if self.todos.is_empty() {
            tracing::info!(role = %self.profile.name, "Nothing to do");
            return pending;
        }

        let primary = self.profile.primary_action().clone();
        let base_context = self.context_text();

        for item in &self.todos {
            tracing::info!(role = %self.profile.name, action = %primary, item = %item, "Working");
            let context = if pending.produced.is_empty() {
                base_context.clone()
            } else {
                format!("{}\n{}", base_context, join_contents(pending.produced.iter()))
            };

            let output = match self.run_item(&primary, &context, item).await {
                Ok(output) => output,
                Err(source) => {
                    pending.results.push(Err(RoleError::WorkItemFailed {
                        role: self.profile.name.clone(),
                        item: item.clone(),
                        source,
                    }));
                    continue;
                }
            };

            let path = match self
                .sink
                .persist(&self.profile.profile, &primary, Some(item), &output, &self.memory)
            {
                Ok(path) => path.map(|p| p.display().to_string()),
                Err(e) => {
                    tracing::warn!(role = %self.profile.name, item = %item, "Persist failed: {}", e);
                    None
                }
            };

            pending.produced.push(
                Message::new(code_of(&output), &self.profile.profile, primary.clone())
                    .with_instruct_content(output.instruct_content.clone()),
            );
            pending.results.push(Ok(DoneItem {
                item: item.clone(),
                output,
                path,
            }));
        }
        pending
    }

    /// 主 Action + 可选 review；review 失败时保留未精修的结果
    async fn run_item(
        &self,
        primary: &ActionId,
        context: &str,
        item: &str,
    ) -> Result<ActionOutput, ActionError> {
        let action = self.actions.get(primary)?;
        let output = action.run(ActionContext::new(context).with_item(item)).await?;

        let Some(review) = &self.profile.review_action else {
            return Ok(output);
        };
        match self.refine(review, context, item, &output).await {
            Ok(refined) => Ok(refined),
            Err(e) => {
                tracing::warn!(
                    role = %self.profile.name,
                    item = %item,
                    "Review failed, keeping unrefined result: {}",
                    e
                );
                Ok(output)
            }
        }
    }

    async fn refine(
        &self,
        review: &ActionId,
        context: &str,
        item: &str,
        output: &ActionOutput,
    ) -> Result<ActionOutput, ActionError> {
        let action = self.actions.get(review)?;
        let ctx = ActionContext::new(context)
            .with_item(item)
            .with_extra(code_of(output));
        action.run(ctx).await
    }

    /// 汇总出站消息：单交付物直接转发 Action 产出；多工作项列出 "项 -> 落盘路径"
    fn aggregate(&self, mut done: Vec<DoneItem>) -> Message {
        let primary = self.profile.primary_action().clone();
        let message = match &self.profile.todo_source {
            TodoSource::Deliverable(_) if done.len() == 1 => {
                let DoneItem { output, .. } = done.remove(0);
                Message::new(output.content, &self.profile.profile, primary)
                    .with_instruct_content(output.instruct_content)
            }
            _ => {
                let content = done
                    .iter()
                    .map(|d| match &d.path {
                        Some(p) => format!("{} -> {}", d.item, p),
                        None => d.item.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(MSG_SEP);
                let pairs = done
                    .iter()
                    .map(|d| (d.item.clone(), code_of(&d.output).to_string()))
                    .collect();
                Message::new(content, &self.profile.profile, primary)
                    .with_instruct_content(InstructContent::new().with("Files", FieldValue::Pairs(pairs)))
            }
        };
        match &self.profile.send_to {
            Some(to) => message.with_send_to(to),
            None => message,
        }
    }
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.profile.name)
            .field("state", &self.state)
            .field("todos", &self.todos)
            .field("memory_len", &self.memory.len())
            .finish()
    }
}
