//! 数据公司的四个标准角色：业务分析师 → 数据架构师 → 项目经理 → 数据工程师

use crate::actions::project_management::TASK_LIST;
use crate::config::CompanySection;
use crate::memory::topics;
use crate::roles::{RoleProfile, TodoSource};

pub fn business_analyst() -> RoleProfile {
    RoleProfile::new("Bob", "Business Analyst", topics::WRITE_PRD)
        .goal("Analyze business operations and identify opportunities for improvement to enhance efficiency, productivity, and profitability.")
        .watch([topics::BUSINESS_OWNER_REQUEST])
        .todo_source(TodoSource::Deliverable("prd".into()))
}

pub fn data_architect() -> RoleProfile {
    RoleProfile::new("Michael", "Data Architect", topics::WRITE_DESIGN)
        .goal("Design the ETL batch data pipeline, data management capabilities and operationalization aspects (devops, issue management, logging and monitoring).")
        .constraints("Prefer well-known open source tools; respect budget, technology capabilities and regulatory requirements.")
        .watch([topics::WRITE_PRD])
        .todo_source(TodoSource::Deliverable("system_design".into()))
}

pub fn project_manager() -> RoleProfile {
    RoleProfile::new("Eve", "Project Manager", topics::WRITE_TASKS)
        .goal("Break the design down into file-level tasks and analyze their dependencies.")
        .watch([topics::WRITE_DESIGN])
        .todo_source(TodoSource::Deliverable("tasks".into()))
}

pub fn data_engineer(use_code_review: bool) -> RoleProfile {
    let profile = RoleProfile::new("Alex", "Data Engineer", topics::WRITE_CODE)
        .goal("Onboard and curate the data, implement the transformation logic and write all code relating to the designed solution.")
        .constraints("The code should conform to PEP8 and be modular and maintainable.")
        .watch([topics::BOSS_REQUIREMENT_FROM_DOCUMENTS, topics::WRITE_TASKS])
        .todo_source(TodoSource::TaskList { section: TASK_LIST })
        .send_to("QaEngineer");
    if use_code_review {
        profile.review_with(topics::WRITE_CODE_REVIEW)
    } else {
        profile
    }
}

/// 按公司配置生成标准阵容（待办策略、上下文策略统一下发）
pub fn standard_profiles(cfg: &CompanySection) -> Vec<RoleProfile> {
    [
        business_analyst(),
        data_architect(),
        project_manager(),
        data_engineer(cfg.use_code_review),
    ]
    .into_iter()
    .map(|p| p.todo_policy(cfg.todo_policy).context_strategy(cfg.context_strategy))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_wiring() {
        let profiles = standard_profiles(&CompanySection::default());
        // 每个角色订阅上一个角色的产出主题
        for pair in profiles.windows(2) {
            assert!(pair[1].watches(pair[0].primary_action()));
        }
        assert!(profiles[0].watches(&topics::BUSINESS_OWNER_REQUEST));
        assert!(profiles[3].review_action.is_none());
    }

    #[test]
    fn test_code_review_flag() {
        let engineer = data_engineer(true);
        assert_eq!(engineer.review_action, Some(topics::WRITE_CODE_REVIEW));
        assert_eq!(engineer.actions().len(), 2);
        assert_eq!(engineer.primary_action(), &topics::WRITE_CODE);
    }
}
