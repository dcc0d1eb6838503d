//! 单次测试驱动器 - 编排层
//!
//! ## 职责
//!
//! 用两篇准备好的作文驱动一个 `TestSessionController` 走完整个流程，
//! 相当于一位"自动化考生"：
//!
//! 1. **开始会话**：失败时按用户重试的方式重新发起
//! 2. **提交 Task 1 / Task 2**：可重试的失败最多重试 `MAX_ATTEMPTS` 次
//! 3. **输出结果**：返回 `PlacementResult`，由上层打印

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::models::{PlacementResult, Step, TaskKind, TextSegment};
use crate::workflow::{FailureCause, TestSessionController};

/// 每个步骤最多尝试次数（含第一次）
pub const MAX_ATTEMPTS: usize = 3;

/// 两项任务的作文
#[derive(Debug, Clone)]
pub struct Essays {
    pub task1: String,
    pub task2: String,
}

impl Essays {
    pub fn text(&self, task: TaskKind) -> &str {
        match task {
            TaskKind::Task1 => &self.task1,
            TaskKind::Task2 => &self.task2,
        }
    }
}

/// 运行一次完整测试
///
/// # 参数
/// - `controller`: 处于 Intro 的会话控制器
/// - `essays`: 两篇作文
///
/// # 返回
/// 返回最终结果；重试耗尽或本地检查失败时返回错误
pub async fn run_session(
    controller: &mut TestSessionController,
    essays: &Essays,
) -> Result<PlacementResult> {
    let mut step = controller.start().await?;
    step = retry_until_settled(controller, step, Step::Task1Editing).await?;

    for task in [TaskKind::Task1, TaskKind::Task2] {
        if controller.current_task() != Some(task) {
            bail!("{} 未就绪，当前步骤 {}", task, controller.current_step());
        }
        controller.update_draft(essays.text(task))?;
        step = controller.submit(essays.text(task)).await?;

        let expected = match task {
            TaskKind::Task1 => Step::Task2Editing,
            TaskKind::Task2 => Step::Result,
        };
        step = retry_until_settled(controller, step, expected).await?;
    }

    match controller.result() {
        Some(result) if step == Step::Result => Ok(result.clone()),
        _ => bail!("测试未完成，当前步骤 {}", step),
    }
}

/// 处于错误状态时重试，直到到达期望步骤或次数用完
async fn retry_until_settled(
    controller: &mut TestSessionController,
    mut step: Step,
    expected: Step,
) -> Result<Step> {
    let mut attempt = 1;
    while step == Step::Error {
        let message = controller.error_message().unwrap_or_default();
        let retryable = controller
            .failure()
            .map(|failure| match failure.cause() {
                FailureCause::Submission(e) => e.is_retryable(),
                FailureCause::Topic(_) | FailureCause::Interrupted(_) => true,
            })
            .unwrap_or(false);

        if !retryable || attempt >= MAX_ATTEMPTS {
            bail!("{}", message);
        }
        attempt += 1;
        warn!("⚠️ {} (第 {}/{} 次尝试)", message, attempt, MAX_ATTEMPTS);
        step = controller.retry().await?;
    }

    if step != expected {
        bail!("期望步骤 {}，实际 {}", expected, step);
    }
    info!("✓ 到达步骤 {}", step);
    Ok(step)
}

/// 把分段渲染成带标记的纯文本：`[片段]{类别}`
pub fn render_segments(segments: &[TextSegment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| match segment.annotation {
            Some(annotation) => format!("[{}]{{{}}}", segment.text, annotation.category),
            None => segment.text.to_string(),
        })
        .collect()
}
