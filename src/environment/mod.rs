//! 环境：角色集合 + 共享消息历史，按轮驱动
//!
//! 一轮 = 对本轮开始时处于 Runnable 的角色各执行一次（并发），
//! 全部完成后再按角色插入顺序提交待办、发布本轮产出（轮次屏障）：第 N 轮的产出在第 N+1 轮之前对任何角色都不可见。
//! 轮次在屏障前被取消时，已跑完的角色同样不提交，待办保留到下一轮。

use std::collections::HashMap;

use futures_util::future::join_all;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::core::{EnvironmentError, RoundReport};
use crate::memory::{Memory, Message};
use crate::roles::Role;

/// 角色重名时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// 原位替换（保留插入顺序中的位置）
    Overwrite,
}

#[derive(Default)]
pub struct Environment {
    roles: Vec<Role>,
    index: HashMap<String, usize>,
    history: Memory,
    round: u64,
    duplicate_policy: DuplicatePolicy,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn add_role(&mut self, role: Role) -> Result<(), EnvironmentError> {
        self.add_roles([role])
    }

    /// 批量加入；Reject 策略下任一重名（含批内重名）则整批不加入
    pub fn add_roles(&mut self, roles: impl IntoIterator<Item = Role>) -> Result<(), EnvironmentError> {
        let roles: Vec<Role> = roles.into_iter().collect();
        if self.duplicate_policy == DuplicatePolicy::Reject {
            let mut seen: Vec<&str> = Vec::with_capacity(roles.len());
            for role in &roles {
                if self.index.contains_key(role.name()) || seen.contains(&role.name()) {
                    return Err(EnvironmentError::DuplicateRoleName(role.name().to_string()));
                }
                seen.push(role.name());
            }
        }

        for role in roles {
            let name = role.name().to_string();
            match self.index.get(&name) {
                Some(&i) => {
                    tracing::warn!("Role {} replaced", name);
                    self.roles[i] = role;
                }
                None => {
                    tracing::info!("Hired {} ({})", name, role.profile().profile);
                    self.index.insert(name, self.roles.len());
                    self.roles.push(role);
                }
            }
        }
        Ok(())
    }

    /// 写入共享历史并广播给所有角色；send_to 只是元数据，不参与投递过滤
    pub fn publish(&mut self, message: Message) {
        self.history.add(message.clone());
        let mut watched = false;
        for role in &mut self.roles {
            watched |= role.recv(message.clone());
        }
        if !watched && !message.is_failure() {
            tracing::warn!(
                cause_by = %message.cause_by(),
                "Routing: no role watches this topic, message kept in history only"
            );
        }
    }

    /// 执行恰好 k 轮；不会因为无事可做而提前结束
    pub async fn run(&mut self, k: usize) -> Vec<RoundReport> {
        let mut reports = Vec::with_capacity(k);
        for _ in 0..k {
            reports.push(self.run_round().await);
        }
        reports
    }

    /// 同 run，但每轮开始前及轮内检查取消；被取消的轮次不发布任何产出，角色待办原样保留
    pub async fn run_until(&mut self, k: usize, cancel: &CancellationToken) -> Vec<RoundReport> {
        let mut reports = Vec::with_capacity(k);
        for _ in 0..k {
            if cancel.is_cancelled() {
                break;
            }
            let finished = tokio::select! {
                _ = cancel.cancelled() => None,
                report = self.run_round() => Some(report),
            };
            match finished {
                Some(report) => reports.push(report),
                None => {
                    tracing::warn!(round = self.round, "Round cancelled before barrier");
                    for role in &mut self.roles {
                        role.recover_interrupted();
                    }
                    break;
                }
            }
        }
        reports
    }

    async fn run_round(&mut self) -> RoundReport {
        self.round += 1;
        let round = self.round;

        let slots: Vec<usize> = (0..self.roles.len())
            .filter(|&i| self.roles[i].is_runnable())
            .collect();
        let acted: Vec<String> = slots
            .iter()
            .map(|&i| self.roles[i].name().to_string())
            .collect();
        tracing::info!(round, "Round started, acting: {:?}", acted);

        let pending = join_all(
            self.roles
                .iter_mut()
                .filter(|r| r.is_runnable())
                .map(|role| role.execute()),
        )
        .await;

        // 屏障：全部 execute 结束后才提交待办并发布，本轮被取消时这里不会执行
        let mut report = RoundReport {
            round,
            acted,
            ..Default::default()
        };
        let mut outbox: Vec<Message> = Vec::new();
        for (i, pending) in slots.into_iter().zip(pending) {
            let Some(output) = pending.and_then(|p| self.roles[i].commit(p)) else {
                continue;
            };
            report.outcomes.extend(output.outcomes);
            outbox.extend(output.message);
            outbox.extend(output.failures);
        }

        report.published = outbox.len();
        for message in outbox {
            self.publish(message);
        }
        tracing::info!(
            round,
            published = report.published,
            failed = report.failures().count(),
            "Round finished"
        );
        report
    }

    pub fn history(&self) -> &Memory {
        &self.history
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.index.get(name).map(|&i| &self.roles[i])
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn runnable_roles(&self) -> Vec<&str> {
        self.roles
            .iter()
            .filter(|r| r.is_runnable())
            .map(Role::name)
            .collect()
    }

    /// 没有任何角色处于 Runnable
    pub fn is_idle(&self) -> bool {
        self.roles.iter().all(|r| !r.is_runnable())
    }
}
