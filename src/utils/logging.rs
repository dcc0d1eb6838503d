/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::models::{format_elapsed, PlacementResult, SessionKind, TaskKind};

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "writing_assessment=debug,info"
    } else {
        "info"
    };
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `kind`: 测试类型
/// - `base_url`: 评分服务地址
pub fn log_startup(kind: SessionKind, base_url: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 写作测试 ({})", kind.as_str());
    info!("🌐 评分服务: {}", base_url);
    info!("{}", "=".repeat(60));
}

/// 记录单项任务提交信息
pub fn log_task_submitted(task: TaskKind, words: usize, elapsed_seconds: u64) {
    info!("\n{}", "─".repeat(60));
    info!(
        "📤 提交 {}: {} 词, 用时 {}",
        task,
        words,
        format_elapsed(elapsed_seconds)
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终结果
pub fn print_result(result: &PlacementResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 测试结果 - 会话 {}", result.session_id);
    info!(
        "完成时间: {}",
        result.completed_at.format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for task in [TaskKind::Task1, TaskKind::Task2] {
        match result.assessment(task) {
            Some(assessment) => {
                info!("✅ {}: {:.1}", task, assessment.overall_score());
                for (name, score) in assessment.criteria() {
                    info!("   {}: {:.1}", name, score);
                }
            }
            None => info!("⚠️ {}: 无评分", task),
        }
    }
    match result.overall_band_score {
        Some(score) => info!("🎯 总分: {:.1} ({})", score, result.band_label()),
        None => info!("🎯 总分: 无"),
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
