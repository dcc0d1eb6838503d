/// 题目来源
///
/// 会话控制器通过 `TopicProvider` 获取随机题目；
/// 默认实现 `TomlTopicBank` 从本地 TOML 题库中随机抽取。
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::TopicError;
use crate::models::{load_topic_bank, TaskKind, TaskPrompt, TopicBankFile};

/// 题目提供者
pub trait TopicProvider: Send + Sync {
    /// 随机获取一道指定任务的题目
    fn random_topic(&self, task: TaskKind) -> BoxFuture<'_, Result<TaskPrompt, TopicError>>;
}

/// 本地 TOML 题库
pub struct TomlTopicBank {
    task1: Vec<TaskPrompt>,
    task2: Vec<TaskPrompt>,
    rng: Mutex<StdRng>,
}

impl TomlTopicBank {
    /// 从题目列表创建
    pub fn new(task1: Vec<TaskPrompt>, task2: Vec<TaskPrompt>) -> Self {
        Self {
            task1,
            task2,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// 使用固定种子，抽题顺序可复现
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// 从已解析的题库文件创建
    pub fn from_bank(bank: TopicBankFile) -> Self {
        let (task1, task2) = bank.into_prompts();
        Self::new(task1, task2)
    }

    /// 从 TOML 文件加载
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bank = load_topic_bank(path).await?;
        Ok(Self::from_bank(bank))
    }

    pub fn len(&self, task: TaskKind) -> usize {
        self.prompts(task).len()
    }

    pub fn is_empty(&self) -> bool {
        self.task1.is_empty() && self.task2.is_empty()
    }

    fn prompts(&self, task: TaskKind) -> &[TaskPrompt] {
        match task {
            TaskKind::Task1 => &self.task1,
            TaskKind::Task2 => &self.task2,
        }
    }

    /// 同步抽题
    pub fn pick(&self, task: TaskKind) -> Result<TaskPrompt, TopicError> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let prompt = self
            .prompts(task)
            .choose(&mut *rng)
            .cloned()
            .ok_or(TopicError::Empty(task))?;
        debug!("抽取 {} 题目: {}", task, prompt.id);
        Ok(prompt)
    }
}

impl TopicProvider for TomlTopicBank {
    fn random_topic(&self, task: TaskKind) -> BoxFuture<'_, Result<TaskPrompt, TopicError>> {
        future::ready(self.pick(task)).boxed()
    }
}
