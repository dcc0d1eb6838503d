//! 分数汇总 - 业务能力层
//!
//! 纯函数，不依赖任何会话状态。
//!
//! ## 取整规则
//! `round_to_half` 四舍五入到最近的 0.5，恰好落在中间时向上取（round-half-up），
//! 例如 6.25 → 6.5，6.75 → 7.0。
//!
//! ## 总分策略
//! 两项任务的总分统一使用 1:2 加权（Task 2 权重是 Task 1 的两倍）。

/// 最低分
pub const MIN_BAND: f64 = 0.0;
/// 最高分
pub const MAX_BAND: f64 = 9.0;

/// 裁剪到 [0, 9]，NaN 视为 0
pub fn clamp_band(score: f64) -> f64 {
    if score.is_nan() {
        MIN_BAND
    } else {
        score.clamp(MIN_BAND, MAX_BAND)
    }
}

/// 取整到最近的 0.5（中间值向上）
pub fn round_to_half(x: f64) -> f64 {
    (x * 2.0 + 0.5).floor() / 2.0
}

/// 单项任务总分：四项评分的算术平均，再取整到 0.5
pub fn criterion_average(scores: [f64; 4]) -> f64 {
    let sum: f64 = scores.iter().copied().map(clamp_band).sum();
    clamp_band(round_to_half(sum / scores.len() as f64))
}

/// 两项任务的综合分数：`round_to_half((task1 + 2 * task2) / 3)`
pub fn overall_band_score(task1_score: f64, task2_score: f64) -> f64 {
    let task1 = clamp_band(task1_score);
    let task2 = clamp_band(task2_score);
    clamp_band(round_to_half((task1 + 2.0 * task2) / 3.0))
}

/// 分数对应的等级描述
pub fn band_label(score: f64) -> &'static str {
    match clamp_band(score).floor() as u8 {
        9 => "Expert user",
        8 => "Very good user",
        7 => "Good user",
        6 => "Competent user",
        5 => "Modest user",
        4 => "Limited user",
        3 => "Extremely limited user",
        2 => "Intermittent user",
        1 => "Non user",
        _ => "Did not attempt the test",
    }
}
