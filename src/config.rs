use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{SessionKind, TaskKind};
use crate::services::TimerSettings;

/// 程序配置文件
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 评分服务配置 ---
    pub grading_api_base_url: String,
    pub grading_api_token: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 测试类型
    pub session_kind: SessionKind,
    // --- 字数要求 ---
    pub task1_min_words: usize,
    pub task2_min_words: usize,
    // --- 计时器 ---
    /// 自动保存间隔（秒）
    pub autosave_interval_secs: u64,
    /// 计时间隔（毫秒）
    pub tick_interval_millis: u64,
    // --- 文件 ---
    /// 题库文件路径
    pub topic_bank_path: String,
    /// 草稿保存目录
    pub draft_folder: String,
    /// 作文文本目录（task1.txt / task2.txt）
    pub essay_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grading_api_base_url: "http://localhost:8080/api".to_string(),
            grading_api_token: String::new(),
            request_timeout_secs: 30,
            session_kind: SessionKind::Placement,
            task1_min_words: TaskKind::Task1.min_words(),
            task2_min_words: TaskKind::Task2.min_words(),
            autosave_interval_secs: 30,
            tick_interval_millis: 1000,
            topic_bank_path: "topics.toml".to_string(),
            draft_folder: "drafts".to_string(),
            essay_folder: "essays".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量读取，未设置的项使用默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 按变量名查找配置值
    ///
    /// 已设置但无法解析的值会报错，而不是静默回退到默认值。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let session_kind = match lookup("SESSION_KIND") {
            Some(value) => SessionKind::parse(&value).ok_or(ConfigError::EnvVarParseFailed {
                var_name: "SESSION_KIND".to_string(),
                value,
                expected_type: "Placement | Progress".to_string(),
            })?,
            None => default.session_kind,
        };

        Ok(Self {
            grading_api_base_url: lookup("GRADING_API_BASE_URL").unwrap_or(default.grading_api_base_url),
            grading_api_token: lookup("GRADING_API_TOKEN").unwrap_or(default.grading_api_token),
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", default.request_timeout_secs)?,
            session_kind,
            task1_min_words: parse_var(&lookup, "TASK1_MIN_WORDS", default.task1_min_words)?,
            task2_min_words: parse_var(&lookup, "TASK2_MIN_WORDS", default.task2_min_words)?,
            autosave_interval_secs: parse_var(&lookup, "AUTOSAVE_INTERVAL_SECS", default.autosave_interval_secs)?,
            tick_interval_millis: parse_var(&lookup, "TICK_INTERVAL_MILLIS", default.tick_interval_millis)?,
            topic_bank_path: lookup("TOPIC_BANK_PATH").unwrap_or(default.topic_bank_path),
            draft_folder: lookup("DRAFT_FOLDER").unwrap_or(default.draft_folder),
            essay_folder: lookup("ESSAY_FOLDER").unwrap_or(default.essay_folder),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", default.verbose_logging)?,
        })
    }

    /// 从 TOML 文件读取，缺失的项使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
            field: "config_file",
            reason: format!("{}: {}", path.display(), e),
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grading_api_base_url.trim().is_empty() {
            return Err(invalid("grading_api_base_url", "不能为空"));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "必须大于 0"));
        }
        if self.autosave_interval_secs == 0 {
            return Err(invalid("autosave_interval_secs", "必须大于 0"));
        }
        if self.tick_interval_millis == 0 {
            return Err(invalid("tick_interval_millis", "必须大于 0"));
        }
        Ok(())
    }

    /// 任务的最低字数
    pub fn min_words(&self, task: TaskKind) -> usize {
        match task {
            TaskKind::Task1 => self.task1_min_words,
            TaskKind::Task2 => self.task2_min_words,
        }
    }

    /// 计时器参数
    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            tick: Duration::from_millis(self.tick_interval_millis),
            autosave: Duration::from_secs(self.autosave_interval_secs),
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: name.to_string(),
            value,
            expected_type: std::any::type_name::<T>().to_string(),
        }),
        None => Ok(default),
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
