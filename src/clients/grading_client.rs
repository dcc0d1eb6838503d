/// 评分服务 API 客户端
///
/// 封装所有与评分后端相关的调用逻辑：开始会话、提交 Task 1 / Task 2。
/// 调用不会自动重试，重试由用户重新发起同一操作。
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::SubmissionError;
use crate::models::{
    EssayDraft, PromptDetails, SessionId, SessionKind, Task1Assessment, Task2Assessment,
    TaskKind, TaskPrompt,
};

/// Task 1 提交内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task1Submission {
    pub task_type: String,
    pub prompt: String,
    pub image_ref: Option<String>,
    pub essay_text: String,
    pub time_taken_seconds: u64,
}

/// Task 2 提交内容
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task2Submission {
    pub prompt: String,
    pub question_type: String,
    pub essay_text: String,
    pub time_taken_seconds: u64,
}

impl Task1Submission {
    /// 由题目和草稿组装提交内容
    pub fn from_draft(topic: &TaskPrompt, draft: &EssayDraft) -> Self {
        let task_type = match &topic.details {
            PromptDetails::Task1 { task_type, .. } => task_type.clone(),
            PromptDetails::Task2 { .. } => String::new(),
        };
        Self {
            task_type,
            prompt: topic.prompt.clone(),
            image_ref: topic.image_ref().map(str::to_string),
            essay_text: draft.content().to_string(),
            time_taken_seconds: draft.elapsed_seconds(),
        }
    }
}

impl Task2Submission {
    /// 由题目和草稿组装提交内容
    pub fn from_draft(topic: &TaskPrompt, draft: &EssayDraft) -> Self {
        let question_type = match &topic.details {
            PromptDetails::Task2 { question_type } => question_type.clone(),
            PromptDetails::Task1 { .. } => String::new(),
        };
        Self {
            prompt: topic.prompt.clone(),
            question_type,
            essay_text: draft.content().to_string(),
            time_taken_seconds: draft.elapsed_seconds(),
        }
    }
}

/// 评分后端
///
/// 会话控制器只依赖这个接口，测试中可以替换为内存实现。
pub trait GradingBackend: Send + Sync {
    /// 在服务端创建会话
    fn start_session(&self, kind: SessionKind) -> BoxFuture<'_, Result<SessionId, SubmissionError>>;

    /// 提交 Task 1 并等待评分
    fn submit_task1<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task1Submission,
    ) -> BoxFuture<'a, Result<Task1Assessment, SubmissionError>>;

    /// 提交 Task 2 并等待评分
    fn submit_task2<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task2Submission,
    ) -> BoxFuture<'a, Result<Task2Assessment, SubmissionError>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest<'a> {
    session_kind: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionResponse {
    session_id: String,
}

/// 评分服务 HTTP 客户端
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SubmissionClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Result<Self, SubmissionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SubmissionError::network(&config.grading_api_base_url, e))?;

        Ok(Self {
            http,
            base_url: config.grading_api_base_url.trim_end_matches('/').to_string(),
            token: Some(config.grading_api_token.clone()).filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/writing-tests/{}", self.base_url, path)
    }

    /// 发送 POST 请求并解析 JSON 响应
    ///
    /// 非 2xx 状态码交给 `classify_failure` 分类
    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        task: Option<TaskKind>,
    ) -> Result<R, SubmissionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!("📤 POST {}", url);

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SubmissionError::network(&url, e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SubmissionError::network(&url, e))?;
        debug!("📥 {} {} ({} 字节)", status.as_u16(), url, text.len());

        if !status.is_success() {
            let error = classify_failure(&url, status.as_u16(), &text, task);
            warn!("⚠️ 请求失败: {}", error);
            return Err(error);
        }

        serde_json::from_str(&text).map_err(|e| SubmissionError::UnexpectedResponse {
            endpoint: url,
            message: e.to_string(),
        })
    }
}

impl GradingBackend for SubmissionClient {
    fn start_session(&self, kind: SessionKind) -> BoxFuture<'_, Result<SessionId, SubmissionError>> {
        async move {
            let body = StartSessionRequest {
                session_kind: kind.as_str(),
            };
            let response: StartSessionResponse = self.post_json("sessions", &body, None).await?;
            Ok(SessionId::new(response.session_id))
        }
        .boxed()
    }

    fn submit_task1<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task1Submission,
    ) -> BoxFuture<'a, Result<Task1Assessment, SubmissionError>> {
        async move {
            let path = format!("sessions/{}/{}", session_id, TaskKind::Task1.path_segment());
            self.post_json(&path, &submission, Some(TaskKind::Task1))
                .await
        }
        .boxed()
    }

    fn submit_task2<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task2Submission,
    ) -> BoxFuture<'a, Result<Task2Assessment, SubmissionError>> {
        async move {
            let path = format!("sessions/{}/{}", session_id, TaskKind::Task2.path_segment());
            self.post_json(&path, &submission, Some(TaskKind::Task2))
                .await
        }
        .boxed()
    }
}

// ========== 响应分类 ==========

/// 把失败的响应归类为错误类型
///
/// - 提交接口返回 409，或消息中含 "already submitted" → `Conflict`
/// - 408 / 429 / 5xx → `Network`
/// - 其余 4xx → `Validation`，优先使用后端给出的消息
/// - 其他状态码 → `UnexpectedResponse`
pub fn classify_failure(
    endpoint: &str,
    status: u16,
    body: &str,
    task: Option<TaskKind>,
) -> SubmissionError {
    let message = extract_message(body);

    if let Some(task) = task {
        let says_submitted = message
            .as_deref()
            .map(|m| m.to_lowercase().contains("already submitted"))
            .unwrap_or(false);
        if status == 409 || says_submitted {
            return SubmissionError::Conflict { task };
        }
    }

    match status {
        408 | 429 | 500..=599 => SubmissionError::Network {
            endpoint: endpoint.to_string(),
            message: message.unwrap_or_else(|| format!("HTTP {}", status)),
        },
        400..=499 => SubmissionError::validation(message),
        _ => SubmissionError::UnexpectedResponse {
            endpoint: endpoint.to_string(),
            message: format!("HTTP {}", status),
        },
    }
}

/// 从错误响应中提取可读消息
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail", "title"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
