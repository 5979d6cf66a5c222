//! 轮次调度集成测试：屏障、路由、失败重试与完整流水线

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dataco::actions::Asker;
    use dataco::company::{offline_llm, standard_registry, standard_roles, DataCompany};
    use dataco::config::AppConfig;
    use dataco::llm::MockLlmClient;
    use dataco::memory::{topics, Message};
    use dataco::roles::{
        business_analyst, data_architect, data_engineer, project_manager, RoleProfile, TodoSource,
    };
    use dataco::workspace::{ArtifactSink, FsWorkspace, NoopSink};
    use dataco::Environment;

    const PRD: &str = "## Project Request\nsales pipeline\n## High-Level Project Backlog\n- ingest\n";
    const DESIGN: &str = "## High Level System Design\nbatch\n## Data structures and interface definitions\nPipeline\n## Program call flow\nmain -> run\n";
    const TASKS: &str = "## Python package name\n\"etl\"\n## Task list\n```python\n[\"main.py\"]\n```\n## Logic Analysis\n```python\n[(\"main.py\", \"entry\")]\n```\n";

    fn team(llm: MockLlmClient, profiles: Vec<RoleProfile>, sink: Arc<dyn ArtifactSink>) -> Environment {
        let registry = Arc::new(standard_registry(Asker::new(Arc::new(llm), 5), &profiles));
        let mut env = Environment::new();
        env.add_roles(standard_roles(profiles, registry, sink)).unwrap();
        env
    }

    fn seed() -> Message {
        Message::new("Build a sales pipeline", "Business Owner", topics::BUSINESS_OWNER_REQUEST)
    }

    #[tokio::test]
    async fn test_two_stage_chain_yields_three_messages() {
        let llm = MockLlmClient::new()
            .on("professional business analyst", PRD)
            .on("You are a data architect", DESIGN);
        let mut env = team(llm, vec![business_analyst(), data_architect()], Arc::new(NoopSink));
        env.publish(seed());

        env.run(2).await;

        let history = env.history();
        assert_eq!(history.len(), 3);
        let topics_seen: Vec<_> = history.storage().iter().map(|m| m.cause_by().clone()).collect();
        assert_eq!(
            topics_seen,
            vec![topics::BUSINESS_OWNER_REQUEST, topics::WRITE_PRD, topics::WRITE_DESIGN]
        );
        assert!(env.runnable_roles().is_empty());
    }

    #[tokio::test]
    async fn test_output_invisible_until_next_round() {
        let llm = MockLlmClient::new()
            .on("professional business analyst", PRD)
            .on("You are a data architect", DESIGN);
        let mut env = team(llm, vec![business_analyst(), data_architect()], Arc::new(NoopSink));
        env.publish(seed());

        let report = env.run(1).await.remove(0);
        assert_eq!(report.acted, vec!["Bob".to_string()]);
        // Michael 在屏障之后才收到 PRD，尚未产出设计
        assert!(env.history().get_by_action(&topics::WRITE_DESIGN).is_empty());
        assert_eq!(env.runnable_roles(), vec!["Michael"]);
    }

    #[tokio::test]
    async fn test_disjoint_watch_sets_stay_idle() {
        let mut env = team(
            MockLlmClient::new(),
            vec![business_analyst(), data_architect()],
            Arc::new(NoopSink),
        );
        env.publish(Message::new("print(1)", "Data Engineer", topics::WRITE_CODE));

        let report = env.run(1).await.remove(0);
        assert!(report.is_quiet());
        assert_eq!(env.history().len(), 1);
    }

    #[tokio::test]
    async fn test_two_watchers_each_act_once() {
        let llm = MockLlmClient::new().on("You are a data architect", DESIGN);
        let second = RoleProfile::new("Mia", "Data Architect", topics::WRITE_DESIGN)
            .watch([topics::WRITE_PRD])
            .todo_source(TodoSource::Deliverable("system_design".into()));
        let mut env = team(llm, vec![data_architect(), second], Arc::new(NoopSink));
        env.publish(Message::new(PRD, "Business Analyst", topics::WRITE_PRD));

        let reports = env.run(2).await;
        assert_eq!(reports[0].acted, vec!["Michael".to_string(), "Mia".to_string()]);
        assert!(reports[1].is_quiet());
        assert_eq!(env.history().get_by_action(&topics::WRITE_DESIGN).len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_retried_next_round() {
        let llm = MockLlmClient::new()
            .on("You are a project manager", "## Python package name\n\"etl\"\n")
            .on("You are a project manager", TASKS)
            .on("You are a data engineer", "```python\nprint('ok')\n```");
        let mut env = team(
            llm,
            vec![project_manager(), data_engineer(false)],
            Arc::new(NoopSink),
        );
        env.publish(Message::new(DESIGN, "Data Architect", topics::WRITE_DESIGN));

        let report = env.run(1).await.remove(0);
        assert_eq!(report.failures().count(), 1);
        let markers = env.history().get_by_action(&topics::ROLE_FAILURE);
        assert_eq!(markers.len(), 1);
        assert!(markers[0].failure_reason().unwrap().contains("Task list"));
        assert_eq!(env.role("Eve").unwrap().todos(), &["tasks".to_string()]);

        let report = env.run(1).await.remove(0);
        assert_eq!(report.acted, vec!["Eve".to_string()]);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(env.role("Alex").unwrap().todos(), &["main.py".to_string()]);

        env.run(1).await;
        assert_eq!(env.history().get_by_action(&topics::WRITE_CODE).len(), 1);
        assert!(env.runnable_roles().is_empty());
    }

    #[tokio::test]
    async fn test_offline_company_writes_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.company.use_code_review = true;

        let mut company = DataCompany::standard(
            Arc::new(offline_llm()),
            Arc::new(FsWorkspace::new(dir.path())),
            &cfg,
        )
        .unwrap();
        company.start_project("Build a sales data pipeline");

        let history = company.run(1).await;
        assert_eq!(history.len(), 5);

        let code = history.last().unwrap();
        assert_eq!(code.cause_by(), &topics::WRITE_CODE);
        assert_eq!(code.send_to(), Some("QaEngineer"));
        assert_eq!(company.reports().len(), 4);
        assert!(company.environment().is_idle());

        let pkg = dir.path().join("sales_etl");
        for doc in ["prd.md", "system_design.md", "implementation_plan.md"] {
            assert!(pkg.join("docs").join(doc).exists(), "missing {}", doc);
        }
        assert!(pkg.join("requirements.txt").exists());
        let main = std::fs::read_to_string(pkg.join("sales_etl").join("main.py")).unwrap();
        // review 后的版本覆盖了初稿
        assert!(main.contains("return True"));
        assert!(pkg.join("sales_etl").join("pipeline.py").exists());
    }
}
