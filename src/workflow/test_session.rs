//! 测试会话上下文
//!
//! 会话的全部状态保存在一个携带数据的阶段枚举中：
//! 编辑 / 提交中的阶段一定持有会话 ID、题目和计时器，
//! 非法组合（例如没有会话 ID 的提交中状态）无法表示。

use std::fmt::Display;
use std::sync::Arc;

use crate::error::{SubmissionError, TopicError};
use crate::models::{
    EssayDraft, PlacementResult, SessionId, Step, Task1Assessment, TaskKind, TaskPrompt,
};
use crate::services::{DraftStore, DraftTimer, TimerSettings};

/// 正在编辑的任务
///
/// 持有计时器；被丢弃时计时器随之取消。
#[derive(Debug)]
pub(crate) struct Editor {
    pub(crate) session_id: SessionId,
    pub(crate) topic: TaskPrompt,
    pub(crate) draft: EssayDraft,
    pub(crate) timer: DraftTimer,
}

impl Editor {
    pub(crate) fn open(
        session_id: SessionId,
        topic: TaskPrompt,
        settings: TimerSettings,
        store: Arc<dyn DraftStore>,
    ) -> Self {
        let timer = DraftTimer::start(session_id.clone(), topic.kind(), 0, settings, store);
        Self {
            session_id,
            topic,
            draft: EssayDraft::default(),
            timer,
        }
    }

    pub(crate) fn task(&self) -> TaskKind {
        self.topic.kind()
    }

    /// 用新内容替换草稿，并同步给自动保存
    pub(crate) fn set_content(&mut self, text: &str) {
        self.draft = self.draft.with_content(text);
        self.timer.update_draft(text);
    }

    /// 带当前用时的草稿快照
    pub(crate) fn snapshot(&self) -> EssayDraft {
        self.draft.with_elapsed(self.timer.elapsed_seconds())
    }

    /// 结束编辑：取消计时器，返回题目和最终草稿
    pub(crate) fn finish(mut self) -> (TaskPrompt, EssayDraft) {
        self.timer.cancel();
        let draft = self.snapshot();
        (self.topic, draft)
    }
}

/// Task 1 结束后带入 Task 2 的信息
///
/// `assessment` 为 `None` 表示 Task 1 因"已提交"被跳过评分。
#[derive(Debug, Clone)]
pub struct Task1Outcome {
    pub topic: TaskPrompt,
    pub assessment: Option<Task1Assessment>,
}

/// 失败原因
#[derive(Debug, Clone, PartialEq)]
pub enum FailureCause {
    Submission(SubmissionError),
    Topic(TopicError),
    /// 网络调用进行中时调用方放弃了等待
    Interrupted(Step),
}

impl FailureCause {
    /// 面向用户的提示
    pub fn user_message(&self) -> String {
        match self {
            FailureCause::Submission(e) => e.user_message(),
            FailureCause::Topic(_) => "Could not load a writing topic. Please try again.".to_string(),
            FailureCause::Interrupted(_) => {
                "The request was interrupted. Please try again.".to_string()
            }
        }
    }
}

impl Display for FailureCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCause::Submission(e) => write!(f, "{}", e),
            FailureCause::Topic(e) => write!(f, "{}", e),
            FailureCause::Interrupted(step) => write!(f, "{} 中的请求被中断", step),
        }
    }
}

/// 错误状态：失败原因 + 重试时回到的阶段
#[derive(Debug)]
pub struct Failure {
    cause: FailureCause,
    resume: Box<Phase>,
}

impl Failure {
    pub(crate) fn new(cause: FailureCause, resume: Phase) -> Self {
        Self {
            cause,
            resume: Box::new(resume),
        }
    }

    pub fn cause(&self) -> &FailureCause {
        &self.cause
    }

    pub fn message(&self) -> String {
        self.cause.user_message()
    }

    /// 重试时回到的步骤
    pub fn resume_step(&self) -> Step {
        self.resume.step()
    }

    pub(crate) fn into_resume(self) -> Phase {
        *self.resume
    }
}

/// 会话阶段（携带数据）
#[derive(Debug)]
pub(crate) enum Phase {
    Intro,
    /// `session_id` 在开始会话请求返回后才有值
    Task1Loading {
        session_id: Option<SessionId>,
    },
    Task1Editing(Editor),
    Task1Submitting(Editor),
    Task2Loading {
        session_id: SessionId,
        task1: Task1Outcome,
    },
    Task2Editing {
        task1: Task1Outcome,
        editor: Editor,
    },
    Task2Submitting {
        task1: Task1Outcome,
        editor: Editor,
    },
    Processing {
        session_id: SessionId,
    },
    Result(PlacementResult),
    Error(Failure),
}

impl Phase {
    pub(crate) fn step(&self) -> Step {
        match self {
            Phase::Intro => Step::Intro,
            Phase::Task1Loading { .. } => Step::Task1Loading,
            Phase::Task1Editing(_) => Step::Task1Editing,
            Phase::Task1Submitting(_) => Step::Task1Submitting,
            Phase::Task2Loading { .. } => Step::Task2Loading,
            Phase::Task2Editing { .. } => Step::Task2Editing,
            Phase::Task2Submitting { .. } => Step::Task2Submitting,
            Phase::Processing { .. } => Step::Processing,
            Phase::Result(_) => Step::Result,
            Phase::Error(_) => Step::Error,
        }
    }

    fn session_id(&self) -> Option<&SessionId> {
        match self {
            Phase::Intro => None,
            Phase::Task1Loading { session_id } => session_id.as_ref(),
            Phase::Task1Editing(editor) | Phase::Task1Submitting(editor) => {
                Some(&editor.session_id)
            }
            Phase::Task2Loading { session_id, .. } | Phase::Processing { session_id } => {
                Some(session_id)
            }
            Phase::Task2Editing { editor, .. } | Phase::Task2Submitting { editor, .. } => {
                Some(&editor.session_id)
            }
            Phase::Result(result) => Some(&result.session_id),
            Phase::Error(failure) => failure.resume.session_id(),
        }
    }

    /// 当前编辑器（错误状态下返回待恢复的编辑器）
    pub(crate) fn editor(&self) -> Option<&Editor> {
        match self {
            Phase::Task1Editing(editor) | Phase::Task1Submitting(editor) => Some(editor),
            Phase::Task2Editing { editor, .. } | Phase::Task2Submitting { editor, .. } => {
                Some(editor)
            }
            Phase::Error(failure) => failure.resume.editor(),
            _ => None,
        }
    }

    pub(crate) fn editor_mut(&mut self) -> Option<&mut Editor> {
        match self {
            Phase::Task1Editing(editor) | Phase::Task1Submitting(editor) => Some(editor),
            Phase::Task2Editing { editor, .. } | Phase::Task2Submitting { editor, .. } => {
                Some(editor)
            }
            Phase::Error(failure) => failure.resume.editor_mut(),
            _ => None,
        }
    }

    fn task1_outcome(&self) -> Option<&Task1Outcome> {
        match self {
            Phase::Task2Loading { task1, .. }
            | Phase::Task2Editing { task1, .. }
            | Phase::Task2Submitting { task1, .. } => Some(task1),
            Phase::Error(failure) => failure.resume.task1_outcome(),
            _ => None,
        }
    }
}

/// 测试会话
///
/// 只由 `TestSessionController` 持有和修改。
#[derive(Debug)]
pub struct TestSession {
    phase: Phase,
}

impl TestSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Intro,
        }
    }

    pub fn step(&self) -> Step {
        self.phase.step()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.phase.session_id()
    }

    pub fn task1_topic(&self) -> Option<&TaskPrompt> {
        match self.phase.editor() {
            Some(editor) if editor.task() == TaskKind::Task1 => Some(&editor.topic),
            _ => self.phase.task1_outcome().map(|outcome| &outcome.topic),
        }
    }

    pub fn task2_topic(&self) -> Option<&TaskPrompt> {
        self.phase
            .editor()
            .filter(|editor| editor.task() == TaskKind::Task2)
            .map(|editor| &editor.topic)
    }

    /// Task 1 评分结果（被跳过时为 `None`）
    pub fn task1_result(&self) -> Option<&Task1Assessment> {
        match &self.phase {
            Phase::Result(result) => result.task1.as_ref(),
            phase => phase
                .task1_outcome()
                .and_then(|outcome| outcome.assessment.as_ref()),
        }
    }

    pub fn final_result(&self) -> Option<&PlacementResult> {
        match &self.phase {
            Phase::Result(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.phase {
            Phase::Error(failure) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn phase(&self) -> &Phase {
        &self.phase
    }

    pub(crate) fn phase_mut(&mut self) -> &mut Phase {
        &mut self.phase
    }

    /// 取出当前阶段，原位置暂时留下 `Intro`
    pub(crate) fn take_phase(&mut self) -> Phase {
        std::mem::replace(&mut self.phase, Phase::Intro)
    }

    pub(crate) fn replace_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.session_id() {
            Some(id) => write!(f, "[会话 {} | {}]", id, self.step()),
            None => write!(f, "[会话 - | {}]", self.step()),
        }
    }
}
