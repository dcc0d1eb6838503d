//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理应用生命周期（初始化、运行）
//! - 持有评分客户端和题库
//! - 打印最终结果
//!
//! ### `session_runner` - 单次测试驱动器
//! - 用准备好的作文驱动 `TestSessionController`
//! - 在错误状态下按用户重试的方式重新发起
//!
//! ## 层次关系
//!
//! ```text
//! app (配置 / 题库 / 客户端)
//!     ↓
//! session_runner (驱动一次测试)
//!     ↓
//! workflow::TestSessionController (状态机)
//!     ↓
//! services / clients (计时、汇总、批注、HTTP)
//! ```

pub mod app;
pub mod session_runner;

pub use app::App;
pub use session_runner::{render_segments, run_session, Essays};
