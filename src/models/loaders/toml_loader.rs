use crate::models::task::TaskPrompt;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 题库文件中的 Task 1 题目
#[derive(Debug, Clone, Deserialize)]
pub struct Task1TopicRecord {
    pub id: String,
    pub prompt: String,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    pub chart_type: Option<String>,
    pub image_ref: Option<String>,
}

/// 题库文件中的 Task 2 题目
#[derive(Debug, Clone, Deserialize)]
pub struct Task2TopicRecord {
    pub id: String,
    pub prompt: String,
    pub question_type: String,
}

fn default_task_type() -> String {
    "Academic".to_string()
}

/// 题库 TOML 文件
///
/// ```toml
/// [[task1]]
/// id = "t1-001"
/// prompt = "The chart below shows..."
/// chart_type = "bar"
///
/// [[task2]]
/// id = "t2-001"
/// prompt = "Some people believe..."
/// question_type = "opinion"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicBankFile {
    #[serde(default)]
    pub task1: Vec<Task1TopicRecord>,
    #[serde(default)]
    pub task2: Vec<Task2TopicRecord>,
}

impl TopicBankFile {
    /// 解析 TOML 文本
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("无法解析题库TOML")
    }

    /// 转换为题目列表 (Task 1, Task 2)
    pub fn into_prompts(self) -> (Vec<TaskPrompt>, Vec<TaskPrompt>) {
        let task1 = self
            .task1
            .into_iter()
            .map(|r| TaskPrompt::task1(r.id, r.prompt, r.task_type, r.chart_type, r.image_ref))
            .collect();
        let task2 = self
            .task2
            .into_iter()
            .map(|r| TaskPrompt::task2(r.id, r.prompt, r.question_type))
            .collect();
        (task1, task2)
    }
}

/// 从 TOML 文件加载题库
pub async fn load_topic_bank(toml_file_path: &Path) -> Result<TopicBankFile> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取题库文件: {}", toml_file_path.display()))?;

    let bank = TopicBankFile::parse(&content)
        .with_context(|| format!("无法解析题库文件: {}", toml_file_path.display()))?;

    tracing::info!(
        "成功加载题库: Task 1 {} 题, Task 2 {} 题",
        bank.task1.len(),
        bank.task2.len()
    );

    Ok(bank)
}

/// 读取作文文本文件
pub async fn load_essay(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取作文文件: {}", path.display()))?;
    Ok(text.trim_end().to_string())
}
