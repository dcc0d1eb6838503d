//! 评分结果
//!
//! 由评分后端的响应一次性构造，之后不可修改；重新提交会得到新的结果。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::models::{Annotation, SessionId, TaskKind};
use crate::services::score_aggregator;

/// Task 1 评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task1Assessment {
    pub id: String,
    pub essay_text: String,
    #[serde(default)]
    pub word_count: usize,
    /// 用时（秒）
    #[serde(default)]
    pub time_taken: u64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub task_achievement: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub coherence_cohesion: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub lexical_resource: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub grammatical_range: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub overall_score: f64,
    #[serde(default)]
    pub general_feedback: String,
    #[serde(default, deserialize_with = "deserialize_feedback_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_feedback_list")]
    pub weaknesses: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_annotations")]
    pub annotations: Vec<Annotation>,
    pub created_at: DateTime<Utc>,
}

/// Task 2 评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task2Assessment {
    pub id: String,
    pub essay_text: String,
    #[serde(default)]
    pub word_count: usize,
    /// 用时（秒）
    #[serde(default)]
    pub time_taken: u64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub task_response: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub coherence_cohesion: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub lexical_resource: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub grammatical_range: f64,
    #[serde(default, deserialize_with = "deserialize_band")]
    pub overall_score: f64,
    #[serde(default)]
    pub general_feedback: String,
    #[serde(default, deserialize_with = "deserialize_feedback_list")]
    pub strengths: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_feedback_list")]
    pub weaknesses: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_annotations")]
    pub annotations: Vec<Annotation>,
    pub created_at: DateTime<Utc>,
}

impl Task1Assessment {
    /// 四项评分，按评分标准顺序
    pub fn criteria(&self) -> [(&'static str, f64); 4] {
        [
            (TaskKind::Task1.first_criterion(), self.task_achievement),
            ("Coherence and Cohesion", self.coherence_cohesion),
            ("Lexical Resource", self.lexical_resource),
            ("Grammatical Range and Accuracy", self.grammatical_range),
        ]
    }

    /// 用四项评分重新计算的总分
    pub fn recomputed_overall(&self) -> f64 {
        score_aggregator::criterion_average(self.criteria().map(|(_, score)| score))
    }
}

impl Task2Assessment {
    /// 四项评分，按评分标准顺序
    pub fn criteria(&self) -> [(&'static str, f64); 4] {
        [
            (TaskKind::Task2.first_criterion(), self.task_response),
            ("Coherence and Cohesion", self.coherence_cohesion),
            ("Lexical Resource", self.lexical_resource),
            ("Grammatical Range and Accuracy", self.grammatical_range),
        ]
    }

    /// 用四项评分重新计算的总分
    pub fn recomputed_overall(&self) -> f64 {
        score_aggregator::criterion_average(self.criteria().map(|(_, score)| score))
    }
}

/// 任一任务的评分结果
#[derive(Debug, Clone, PartialEq)]
pub enum TaskAssessment {
    Task1(Task1Assessment),
    Task2(Task2Assessment),
}

impl TaskAssessment {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskAssessment::Task1(_) => TaskKind::Task1,
            TaskAssessment::Task2(_) => TaskKind::Task2,
        }
    }

    pub fn overall_score(&self) -> f64 {
        match self {
            TaskAssessment::Task1(a) => a.overall_score,
            TaskAssessment::Task2(a) => a.overall_score,
        }
    }

    pub fn essay_text(&self) -> &str {
        match self {
            TaskAssessment::Task1(a) => &a.essay_text,
            TaskAssessment::Task2(a) => &a.essay_text,
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        match self {
            TaskAssessment::Task1(a) => &a.annotations,
            TaskAssessment::Task2(a) => &a.annotations,
        }
    }

    pub fn criteria(&self) -> [(&'static str, f64); 4] {
        match self {
            TaskAssessment::Task1(a) => a.criteria(),
            TaskAssessment::Task2(a) => a.criteria(),
        }
    }
}

/// 两项任务的汇总结果
///
/// 因"已提交"冲突而跳过评分的任务在这里为 `None`。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResult {
    pub session_id: SessionId,
    pub task1: Option<Task1Assessment>,
    pub task2: Option<Task2Assessment>,
    /// 两项都缺失时为 `None`
    pub overall_band_score: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl PlacementResult {
    /// 组合两项任务结果，总分按 1:2 加权
    pub fn combine(
        session_id: SessionId,
        task1: Option<Task1Assessment>,
        task2: Option<Task2Assessment>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let overall_band_score = match (&task1, &task2) {
            (Some(t1), Some(t2)) => Some(score_aggregator::overall_band_score(
                t1.overall_score,
                t2.overall_score,
            )),
            (Some(t1), None) => Some(single_task_band(t1.overall_score)),
            (None, Some(t2)) => Some(single_task_band(t2.overall_score)),
            (None, None) => None,
        };
        Self {
            session_id,
            task1,
            task2,
            overall_band_score,
            completed_at,
        }
    }

    /// 按任务取评分结果
    pub fn assessment(&self, task: TaskKind) -> Option<TaskAssessment> {
        match task {
            TaskKind::Task1 => self.task1.clone().map(TaskAssessment::Task1),
            TaskKind::Task2 => self.task2.clone().map(TaskAssessment::Task2),
        }
    }

    /// 总分对应的等级描述
    pub fn band_label(&self) -> &'static str {
        score_aggregator::band_label(self.overall_band_score.unwrap_or(0.0))
    }
}

/// 只有一项任务有分数时，总分取该项，同样落在 0.5 的格点上
fn single_task_band(score: f64) -> f64 {
    score_aggregator::round_to_half(score_aggregator::clamp_band(score))
}

// ========== 反序列化辅助函数 ==========

/// 分数：缺失或 null 记为 0，超出范围裁剪到 [0, 9]
fn deserialize_band<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(score_aggregator::clamp_band(value.unwrap_or(0.0)))
}

/// 批注：null 视为空列表；无法解析的单条批注被丢弃，不影响分数
fn deserialize_annotations<'de, D>(deserializer: D) -> Result<Vec<Annotation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = raw.len();
    let annotations: Vec<Annotation> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Annotation>(value) {
            Ok(annotation) => Some(annotation),
            Err(e) => {
                warn!("⚠️ 忽略无法解析的批注: {}", e);
                None
            }
        })
        .collect();
    if annotations.len() < total {
        warn!("⚠️ 批注 {}/{} 条可用", annotations.len(), total);
    }
    Ok(annotations)
}

/// 反馈字段既可能是字符串，也可能是字符串数组
fn deserialize_feedback_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{SeqAccess, Visitor};
    use std::fmt;

    struct FeedbackVisitor;

    impl<'de> Visitor<'de> for FeedbackVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, a list of strings, or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value
                .lines()
                .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut items = Vec::new();
            while let Some(item) = seq.next_element::<String>()? {
                if !item.trim().is_empty() {
                    items.push(item);
                }
            }
            Ok(items)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(FeedbackVisitor)
}
