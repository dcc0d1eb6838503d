//! 作文草稿

use serde::{Deserialize, Serialize};

use crate::models::TaskKind;

/// 统计词数
///
/// 以空白分隔，至少包含一个字母或数字的片段才算一个词，
/// 单独的标点（如 " - "）不计入。
pub fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(char::is_alphanumeric))
        .count()
}

/// 将秒数格式化为 `mm:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// 作文草稿
///
/// 每次编辑都会产生新的草稿（`with_content`），旧值不会被原地修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayDraft {
    content: String,
    elapsed_seconds: u64,
}

impl EssayDraft {
    pub fn new(content: impl Into<String>, elapsed_seconds: u64) -> Self {
        Self {
            content: content.into(),
            elapsed_seconds,
        }
    }

    /// 用新内容替换草稿
    #[must_use]
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            elapsed_seconds: self.elapsed_seconds,
        }
    }

    /// 更新用时
    #[must_use]
    pub fn with_elapsed(&self, elapsed_seconds: u64) -> Self {
        Self {
            content: self.content.clone(),
            elapsed_seconds,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn word_count(&self) -> usize {
        count_words(&self.content)
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// 是否达到最低字数
    pub fn meets_minimum(&self, minimum: usize) -> bool {
        self.word_count() >= minimum
    }

    /// 是否超过建议用时
    pub fn is_over_time(&self, task: TaskKind) -> bool {
        self.elapsed_seconds > task.recommended_minutes() * 60
    }
}
