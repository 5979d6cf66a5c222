//! 工作区持久化：把角色产出的结构化内容落盘
//!
//! 核心只把 ActionOutput 交给 ArtifactSink；根目录来自配置，构造时显式传入。

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::actions::project_management::{PACKAGE_NAME, REQUIRED_PACKAGES};
use crate::actions::{code_of, ActionOutput};
use crate::memory::{join_contents, topics, ActionId, Memory};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    #[error("Missing package name in task output")]
    MissingPackageName,
}

/// 产出落盘接口：返回写入的主路径（不处理的 Action 返回 None）
pub trait ArtifactSink: Send + Sync {
    fn persist(
        &self,
        role: &str,
        action: &ActionId,
        item: Option<&str>,
        output: &ActionOutput,
        memory: &Memory,
    ) -> Result<Option<PathBuf>, WorkspaceError>;
}

/// 不落盘（测试 / 仅看历史时使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ArtifactSink for NoopSink {
    fn persist(
        &self,
        _role: &str,
        _action: &ActionId,
        _item: Option<&str>,
        _output: &ActionOutput,
        _memory: &Memory,
    ) -> Result<Option<PathBuf>, WorkspaceError> {
        Ok(None)
    }
}

/// 文件系统工作区：`<root>/<package>/docs/*`、`<root>/<package>/<package>/<file>`
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 任务拆解完成：重建包目录并写入 PRD、系统设计、实现计划与依赖清单
    fn save_plan(&self, output: &ActionOutput, memory: &Memory) -> Result<PathBuf, WorkspaceError> {
        let package = output
            .instruct_content
            .text(PACKAGE_NAME)
            .ok_or(WorkspaceError::MissingPackageName)?;
        let workspace = self.root.join(safe_relative(package)?);
        recreate_dir(&workspace)?;

        let docs = workspace.join("docs");
        std::fs::create_dir_all(&docs)?;
        std::fs::create_dir_all(workspace.join("resources"))?;

        let prd = join_contents(memory.get_by_action(&topics::WRITE_PRD).into_iter());
        write_text(&docs.join("prd.md"), &prd)?;
        if let Some(design) = memory.get_by_action(&topics::WRITE_DESIGN).last() {
            write_text(&docs.join("system_design.md"), design.content())?;
        }
        write_text(&docs.join("implementation_plan.md"), &output.content)?;

        if let Some(reqs) = output.instruct_content.text(REQUIRED_PACKAGES) {
            write_text(&workspace.join("requirements.txt"), reqs.trim_matches(|c| c == '"' || c == '\n'))?;
        }
        Ok(workspace)
    }

    /// 代码文件：包名取最近一次任务拆解，缺失时落到 `<root>/src`
    fn save_code(&self, filename: &str, code: &str, memory: &Memory) -> Result<PathBuf, WorkspaceError> {
        let dir = match latest_package(memory) {
            Some(pkg) => {
                let pkg = safe_relative(&pkg)?;
                self.root.join(&pkg).join(&pkg)
            }
            None => self.root.join("src"),
        };
        let cleaned: String = filename.chars().filter(|c| *c != '"' && *c != '\n').collect();
        let path = dir.join(safe_relative(cleaned.trim())?);
        write_text(&path, code)?;
        Ok(path)
    }
}

impl ArtifactSink for FsWorkspace {
    fn persist(
        &self,
        role: &str,
        action: &ActionId,
        item: Option<&str>,
        output: &ActionOutput,
        memory: &Memory,
    ) -> Result<Option<PathBuf>, WorkspaceError> {
        let written = if *action == topics::WRITE_TASKS {
            Some(self.save_plan(output, memory)?)
        } else if *action == topics::WRITE_CODE || *action == topics::WRITE_CODE_REVIEW {
            Some(self.save_code(item.unwrap_or("main.py"), code_of(output), memory)?)
        } else {
            None
        };
        if let Some(path) = &written {
            tracing::info!(role, action = %action, "Saved artifact to {}", path.display());
        }
        Ok(written)
    }
}

fn latest_package(memory: &Memory) -> Option<String> {
    memory
        .get_by_actions(&[topics::WRITE_TASKS, topics::WRITE_DESIGN])
        .into_iter()
        .rev()
        .find_map(|m| m.instruct_content()?.text(PACKAGE_NAME))
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
}

/// 只接受不含 `..`、非绝对路径的相对路径
fn safe_relative(path: &str) -> Result<PathBuf, WorkspaceError> {
    let p = Path::new(path);
    if path.is_empty()
        || p.components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(WorkspaceError::PathEscape(path.to_string()));
    }
    Ok(p.to_path_buf())
}

fn recreate_dir(dir: &Path) -> Result<(), WorkspaceError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn write_text(path: &Path, content: &str) -> Result<(), WorkspaceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FieldValue, InstructContent, Message};

    fn tasks_output(pkg: &str) -> ActionOutput {
        ActionOutput::new(
            "## Task list\n...",
            InstructContent::new()
                .with(PACKAGE_NAME, FieldValue::Text(pkg.into()))
                .with("Task list", FieldValue::List(vec!["main.py".into()]))
                .with(REQUIRED_PACKAGES, FieldValue::Text("\"pandas==2.0\"".into())),
        )
    }

    #[test]
    fn test_save_plan_writes_docs() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        let mut memory = Memory::new();
        memory.add(Message::new("the prd", "Business Analyst", topics::WRITE_PRD));
        memory.add(Message::new("the design", "Data Architect", topics::WRITE_DESIGN));

        let out = tasks_output("etl");
        let path = ws
            .persist("Project Manager", &topics::WRITE_TASKS, None, &out, &memory)
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("etl"));
        let design = std::fs::read_to_string(path.join("docs/system_design.md")).unwrap();
        assert_eq!(design, "the design");
        assert!(std::fs::read_to_string(path.join("docs/prd.md")).unwrap().contains("the prd"));
        assert_eq!(std::fs::read_to_string(path.join("requirements.txt")).unwrap(), "pandas==2.0");
    }

    #[test]
    fn test_save_code_uses_latest_package() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        let mut memory = Memory::new();
        let out = tasks_output("etl");
        memory.add(
            Message::new(out.content.clone(), "Project Manager", topics::WRITE_TASKS)
                .with_instruct_content(out.instruct_content.clone()),
        );

        let code = ActionOutput::new("print(1)", InstructContent::new());
        let path = ws
            .persist("Data Engineer", &topics::WRITE_CODE, Some("\"pkg/main.py\""), &code, &memory)
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("etl/etl/pkg/main.py"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print(1)");
    }

    #[test]
    fn test_save_code_without_package_goes_to_src() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        let code = ActionOutput::new("x = 1", InstructContent::new());
        let path = ws
            .persist("Data Engineer", &topics::WRITE_CODE, Some("a.py"), &code, &Memory::new())
            .unwrap()
            .unwrap();
        assert_eq!(path, dir.path().join("src/a.py"));
    }

    #[test]
    fn test_save_code_writes_extracted_code_not_raw_reply() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        let code = ActionOutput::new(
            "Sure:\n```python\nx = 1\n```",
            InstructContent::new().with(crate::actions::CODE, FieldValue::Text("x = 1".into())),
        );
        let path = ws
            .persist("Data Engineer", &topics::WRITE_CODE, Some("a.py"), &code, &Memory::new())
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x = 1");
    }

    #[test]
    fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ws = FsWorkspace::new(dir.path());
        let code = ActionOutput::new("x", InstructContent::new());
        for bad in ["../evil.py", "/etc/passwd"] {
            let err = ws
                .persist("Data Engineer", &topics::WRITE_CODE, Some(bad), &code, &Memory::new())
                .unwrap_err();
            assert!(matches!(err, WorkspaceError::PathEscape(_)));
        }
    }

    #[test]
    fn test_other_actions_not_persisted() {
        let ws = FsWorkspace::new("/nonexistent");
        let out = ActionOutput::default();
        let written = ws
            .persist("Business Analyst", &topics::WRITE_PRD, None, &out, &Memory::new())
            .unwrap();
        assert!(written.is_none());
    }
}
