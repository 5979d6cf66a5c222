//! dataco - 多智能体数据公司
//!
//! 入口：解析命令行、加载配置、初始化日志，组建团队并按轮运行；结束后打印轮次报告并导出 history.json。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use dataco::company::{offline_llm, DataCompany};
use dataco::config::load_config;
use dataco::core::WorkStatus;
use dataco::llm::{create_llm_from_config, LlmClient};
use dataco::observability;
use dataco::workspace::FsWorkspace;

#[derive(Parser)]
#[command(name = "dataco", about = "Multi-agent data company: PRD -> design -> tasks -> code")]
struct Args {
    /// 从文件读取项目目标
    #[arg(long, conflicts_with = "goal")]
    idea: Option<PathBuf>,

    /// 直接给出项目目标
    #[arg(long)]
    goal: Option<String>,

    /// 外层步数（覆盖 app.n_round）
    #[arg(long)]
    rounds: Option<usize>,

    /// 额外的 TOML 配置文件
    #[arg(long, env = "DATACO_CONFIG")]
    config: Option<PathBuf>,

    /// 写完代码后追加一次 review
    #[arg(long)]
    code_review: bool,

    /// 不调用推理服务，使用内置的离线回复
    #[arg(long)]
    mock: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    observability::init(args.verbose);

    let mut cfg = load_config(args.config.clone()).context("Failed to load config")?;
    if args.code_review {
        cfg.company.use_code_review = true;
    }
    let n_round = args.rounds.unwrap_or(cfg.app.n_round);

    let goal = match (&args.idea, &args.goal) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read idea file {}", path.display()))?,
        (None, Some(goal)) => goal.clone(),
        (None, None) => bail!("Either --idea <file> or --goal <text> is required"),
    };
    if goal.trim().is_empty() {
        bail!("Project goal is empty");
    }

    let root = cfg.app.workspace_root();
    std::fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create workspace {}", root.display()))?;

    let llm: Arc<dyn LlmClient> = if args.mock {
        Arc::new(offline_llm())
    } else {
        create_llm_from_config(&cfg.llm, false)
    };
    let sink = Arc::new(FsWorkspace::new(&root));

    let mut company = DataCompany::standard(llm, sink, &cfg).context("Failed to hire team")?;
    company.start_project(goal.trim());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, stopping after the current round");
            trigger.cancel();
        }
    });

    company.run_until(n_round, &cancel).await;

    for report in company.reports() {
        if report.is_quiet() {
            continue;
        }
        println!("Round {}: {}", report.round, report.acted.join(", "));
        for outcome in &report.outcomes {
            match &outcome.status {
                WorkStatus::Succeeded => println!("  [ok]   {} {}", outcome.role, outcome.item),
                WorkStatus::Failed { error, retryable } => println!(
                    "  [fail] {} {}: {}{}",
                    outcome.role,
                    outcome.item,
                    error,
                    if *retryable { " (will retry)" } else { "" }
                ),
            }
        }
    }

    let history_path = root.join("history.json");
    let json = serde_json::to_string_pretty(company.history().storage())
        .context("Failed to serialize history")?;
    std::fs::write(&history_path, json)
        .with_context(|| format!("Failed to write {}", history_path.display()))?;
    println!(
        "{} message(s) in history, written to {}",
        company.history().len(),
        history_path.display()
    );

    Ok(())
}
