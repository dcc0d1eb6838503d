use serde::{Deserialize, Serialize};

/// 写作任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// 图表描述（≥150 词）
    Task1,
    /// 议论文（≥250 词）
    Task2,
}

impl TaskKind {
    /// 最低字数要求
    pub fn min_words(self) -> usize {
        match self {
            TaskKind::Task1 => 150,
            TaskKind::Task2 => 250,
        }
    }

    /// 建议用时（分钟）
    pub fn recommended_minutes(self) -> u64 {
        match self {
            TaskKind::Task1 => 20,
            TaskKind::Task2 => 40,
        }
    }

    /// 第一项评分标准的名称
    pub fn first_criterion(self) -> &'static str {
        match self {
            TaskKind::Task1 => "Task Achievement",
            TaskKind::Task2 => "Task Response",
        }
    }

    /// 在总分中的权重
    pub fn weight(self) -> f64 {
        match self {
            TaskKind::Task1 => 1.0,
            TaskKind::Task2 => 2.0,
        }
    }

    /// 后端路径片段
    pub fn path_segment(self) -> &'static str {
        match self {
            TaskKind::Task1 => "task1",
            TaskKind::Task2 => "task2",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Task1 => write!(f, "Task 1"),
            TaskKind::Task2 => write!(f, "Task 2"),
        }
    }
}

/// 题目的任务相关信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PromptDetails {
    Task1 {
        /// Academic / General Training
        task_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chart_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_ref: Option<String>,
    },
    Task2 {
        /// opinion / discussion / problem-solution ...
        question_type: String,
    },
}

/// 题目（只读）
///
/// 由外部题库提供，核心流程只读取，不修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPrompt {
    pub id: String,
    pub prompt: String,
    pub details: PromptDetails,
}

impl TaskPrompt {
    pub fn task1(
        id: impl Into<String>,
        prompt: impl Into<String>,
        task_type: impl Into<String>,
        chart_type: Option<String>,
        image_ref: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            details: PromptDetails::Task1 {
                task_type: task_type.into(),
                chart_type,
                image_ref,
            },
        }
    }

    pub fn task2(
        id: impl Into<String>,
        prompt: impl Into<String>,
        question_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            details: PromptDetails::Task2 {
                question_type: question_type.into(),
            },
        }
    }

    /// 题目对应的任务类型
    pub fn kind(&self) -> TaskKind {
        match self.details {
            PromptDetails::Task1 { .. } => TaskKind::Task1,
            PromptDetails::Task2 { .. } => TaskKind::Task2,
        }
    }

    pub fn image_ref(&self) -> Option<&str> {
        match &self.details {
            PromptDetails::Task1 { image_ref, .. } => image_ref.as_deref(),
            PromptDetails::Task2 { .. } => None,
        }
    }
}

impl std::fmt::Display for TaskPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview = if self.prompt.chars().count() > 60 {
            self.prompt.chars().take(60).collect::<String>() + "..."
        } else {
            self.prompt.clone()
        };
        write!(f, "[{} #{}] {}", self.kind(), self.id, preview)
    }
}
