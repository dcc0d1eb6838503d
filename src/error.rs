use thiserror::Error;

use crate::models::TaskKind;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 评分后端调用错误
    #[error("评分服务错误: {0}")]
    Submission(#[from] SubmissionError),
    /// 题目获取错误
    #[error("题目错误: {0}")]
    Topic(#[from] TopicError),
    /// 会话流程错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 评分后端错误
///
/// `Conflict` 不是真正的失败：该任务已被评分，流程应继续前进。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// 网络请求失败（可重试）
    #[error("网络请求失败 ({endpoint}): {message}")]
    Network { endpoint: String, message: String },
    /// 请求被后端拒绝（缺少前置条件、数据不合法等）
    #[error("{message}")]
    Validation { message: String },
    /// 该任务已经提交过
    #[error("already submitted ({task})")]
    Conflict { task: TaskKind },
    /// 后端返回了无法解析的内容
    #[error("无法解析后端响应 ({endpoint}): {message}")]
    UnexpectedResponse { endpoint: String, message: String },
}

impl SubmissionError {
    /// 后端未给出原因时使用的提示
    pub const GENERIC_VALIDATION_MESSAGE: &'static str =
        "The request could not be processed. Please check your submission and try again.";

    /// 是否为"已提交"冲突
    pub fn is_conflict(&self) -> bool {
        matches!(self, SubmissionError::Conflict { .. })
    }

    /// 是否可以由用户直接重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubmissionError::Network { .. } | SubmissionError::UnexpectedResponse { .. }
        )
    }

    /// 面向用户展示的消息
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Network { .. } => {
                "Network error. Your draft is safe, please try again.".to_string()
            }
            SubmissionError::Validation { message } if message.trim().is_empty() => {
                Self::GENERIC_VALIDATION_MESSAGE.to_string()
            }
            SubmissionError::Validation { message } => message.clone(),
            SubmissionError::Conflict { task } => format!("{} was already submitted.", task),
            SubmissionError::UnexpectedResponse { .. } => {
                "The grading service returned an unexpected response. Please try again."
                    .to_string()
            }
        }
    }
}

/// 题目获取错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// 题库中没有该类型的题目
    #[error("题库中没有 {0} 题目")]
    Empty(TaskKind),
    /// 题库加载失败
    #[error("题库加载失败: {0}")]
    LoadFailed(String),
}

/// 会话流程错误
///
/// 这些错误都在本地产生，不会到达评分后端。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 字数不足
    #[error("{task} 需要至少 {minimum} 词，当前 {actual} 词")]
    WordCountTooLow {
        task: TaskKind,
        actual: usize,
        minimum: usize,
    },
    /// 当前步骤不允许该操作
    #[error("步骤 {step} 不允许操作 {action}")]
    InvalidTransition { step: String, action: &'static str },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    Invalid { field: &'static str, reason: String },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

impl SubmissionError {
    /// 创建网络错误
    pub fn network(endpoint: impl Into<String>, source: impl std::fmt::Display) -> Self {
        SubmissionError::Network {
            endpoint: endpoint.into(),
            message: source.to_string(),
        }
    }

    /// 创建校验错误，空消息时使用通用提示
    pub fn validation(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| Self::GENERIC_VALIDATION_MESSAGE.to_string());
        SubmissionError::Validation { message }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
