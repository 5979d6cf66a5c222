//! dataco - 多智能体数据公司
//!
//! 模块划分：
//! - **actions**: Action trait、提示模板与响应分段解析（WritePRD / WriteDesign / WriteTasks / WriteCode / WriteCodeReview）
//! - **company**: DataCompany 启动边界：雇佣、注入需求、按步运行
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、恢复策略、轮次报告
//! - **environment**: 调度器 / 消息总线（轮次屏障）
//! - **llm**: 推理服务抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 消息、主题与按主题索引的记忆
//! - **roles**: 角色画像与角色状态机
//! - **workspace**: 文档与代码落盘

pub mod actions;
pub mod company;
pub mod config;
pub mod core;
pub mod environment;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod roles;
pub mod workspace;

pub use company::DataCompany;
pub use environment::{DuplicatePolicy, Environment};
