//! 数据公司：雇佣角色、注入老板需求、按步驱动环境
//!
//! 一步 = environment.run(rounds_per_step)；run(n_round) 执行 n_round 步。

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::actions::{ActionRegistry, Asker};
use crate::config::AppConfig;
use crate::core::{EnvironmentError, RoundReport};
use crate::environment::Environment;
use crate::llm::{LlmClient, MockLlmClient};
use crate::memory::{topics, Memory, Message};
use crate::roles::{standard_profiles, Role, RoleProfile};
use crate::workspace::ArtifactSink;

/// 老板需求消息的发送方
pub const BUSINESS_OWNER: &str = "Business Owner";

pub struct DataCompany {
    environment: Environment,
    rounds_per_step: usize,
    reports: Vec<RoundReport>,
}

impl DataCompany {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            rounds_per_step: 4,
            reports: Vec::new(),
        }
    }

    pub fn with_rounds_per_step(mut self, rounds: usize) -> Self {
        self.rounds_per_step = rounds;
        self
    }

    /// 按配置组建标准四人团队
    pub fn standard(
        llm: Arc<dyn LlmClient>,
        sink: Arc<dyn ArtifactSink>,
        cfg: &AppConfig,
    ) -> Result<Self, EnvironmentError> {
        let profiles = standard_profiles(&cfg.company);
        let asker = Asker::new(llm, cfg.llm.timeouts.request);
        let registry = Arc::new(standard_registry(asker, &profiles));

        let environment = Environment::new().with_duplicate_policy(cfg.company.duplicate_policy);
        let mut company = Self::new(environment).with_rounds_per_step(cfg.app.rounds_per_step);
        company.hire(standard_roles(profiles, registry, sink))?;
        Ok(company)
    }

    pub fn hire(&mut self, roles: impl IntoIterator<Item = Role>) -> Result<(), EnvironmentError> {
        self.environment.add_roles(roles)
    }

    /// 以 "Business Owner" 身份发布项目目标
    pub fn start_project(&mut self, goal: impl Into<String>) {
        let goal = goal.into();
        tracing::info!("Project started: {}", truncate(&goal, 80));
        self.environment
            .publish(Message::new(goal, BUSINESS_OWNER, topics::BUSINESS_OWNER_REQUEST));
    }

    pub async fn run(&mut self, n_round: usize) -> &Memory {
        for step in 0..n_round {
            tracing::debug!(step, "company step");
            let reports = self.environment.run(self.rounds_per_step).await;
            self.reports.extend(reports);
        }
        self.environment.history()
    }

    /// 同 run，可被外部取消（如 Ctrl-C）
    pub async fn run_until(&mut self, n_round: usize, cancel: &CancellationToken) -> &Memory {
        for _ in 0..n_round {
            if cancel.is_cancelled() {
                break;
            }
            let reports = self.environment.run_until(self.rounds_per_step, cancel).await;
            self.reports.extend(reports);
        }
        self.environment.history()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn history(&self) -> &Memory {
        self.environment.history()
    }

    /// 至今所有轮次的报告
    pub fn reports(&self) -> &[RoundReport] {
        &self.reports
    }
}

/// 内置 Action 注册表；WritePRD 需要知道团队成员各自负责什么
pub fn standard_registry(asker: Asker, profiles: &[RoleProfile]) -> ActionRegistry {
    let definitions = profiles
        .iter()
        .map(RoleProfile::definition)
        .collect::<Vec<_>>()
        .join("\n");
    ActionRegistry::standard(asker, &definitions)
}

pub fn standard_roles(
    profiles: Vec<RoleProfile>,
    registry: Arc<ActionRegistry>,
    sink: Arc<dyn ArtifactSink>,
) -> Vec<Role> {
    profiles
        .into_iter()
        .map(|profile| Role::new(profile, Arc::clone(&registry), Arc::clone(&sink)))
        .collect()
}

/// 离线演示用的推理服务：为每个内置 Action 准备一份可解析的固定回复
pub fn offline_llm() -> MockLlmClient {
    MockLlmClient::new()
        .on(
            "You are a professional business analyst",
            "## Project Request\nBuild a daily batch pipeline for the sales data.\n\
             ## High-Level Project Backlog\n- Data Architect: design the ETL pipeline\n\
             - Data Engineer: implement ingestion and transformation\n",
        )
        .on(
            "You are a data architect",
            "## High Level System Design\nExtract from the API, load into staging, transform into marts.\n\
             ## Data structures and interface definitions\n```mermaid\nclassDiagram\n    class Pipeline\n```\n\
             ## Program call flow\n```mermaid\nsequenceDiagram\n    Main->>Pipeline: run()\n```\n",
        )
        .on(
            "You are a project manager",
            "## Required Python third-party packages\n```python\n\"pandas==2.1.0\"\n```\n\
             ## Python package name\n```python\n\"sales_etl\"\n```\n\
             ## Task list\n```python\n[\"pipeline.py\", \"main.py\"]\n```\n\
             ## Logic Analysis\n```python\n[(\"pipeline.py\", \"extract and load\"), (\"main.py\", \"entry point\")]\n```\n",
        )
        .on(
            "doing code review",
            "## Code Review\n1. Looks fine.\n## Rewrite Code\n```python\ndef run():\n    return True\n```\n",
        )
        .on(
            "You are a data engineer",
            "```python\ndef run():\n    pass\n```\n",
        )
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}
