//! # Writing Assessment
//!
//! 一个雅思写作测试客户端：计时写作、提交评分、汇总分数、批注展示
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 纯数据：题目、草稿、评分结果、批注、会话步骤
//! - `models/loaders` - TOML 题库加载
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `score_aggregator` - 分数取整与加权汇总
//! - `AnnotationOverlayEngine` - 把批注区间切分成可渲染的文本片段
//! - `DraftTimer` - 计时与自动保存
//! - `DraftWriter` - 写草稿文件能力
//! - `clients/` - `SubmissionClient`（评分服务 HTTP）、`TomlTopicBank`（题库）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次测试"的完整流程
//! - `TestSession` - 会话上下文（携带数据的阶段枚举）
//! - `TestSessionController` - 状态机（开始 → Task 1 → Task 2 → 结果）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 应用入口，管理配置和客户端
//! - `orchestrator/session_runner` - 用准备好的作文驱动一次测试
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{GradingBackend, SubmissionClient, TomlTopicBank, TopicProvider};
pub use config::Config;
pub use error::{AppError, AppResult, SessionError, SubmissionError};
pub use models::{PlacementResult, Step, TaskKind, TaskPrompt};
pub use orchestrator::App;
pub use services::AnnotationOverlayEngine;
pub use workflow::{TestSession, TestSessionController};
