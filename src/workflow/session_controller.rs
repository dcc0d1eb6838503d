//! 测试会话控制器 - 流程层
//!
//! 核心职责：定义"一次写作测试"的完整流程
//!
//! 流程顺序：
//! 1. 开始会话 → 获取 Task 1 题目 → 编辑
//! 2. 提交 Task 1 → 获取 Task 2 题目 → 编辑
//! 3. 提交 Task 2 → 汇总分数 → 结果
//!
//! 网络调用只发生在 Loading / Submitting 步骤。所有操作都需要 `&mut self`，
//! 同一会话不可能同时存在两个进行中的提交。
//!
//! 调用方在网络调用返回前丢弃 future（超时、界面卸载）时，
//! 会话转入 `Error`，重试会回到调用前的步骤，草稿保留。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{GradingBackend, Task1Submission, Task2Submission, TopicProvider};
use crate::config::Config;
use crate::error::SessionError;
use crate::models::{
    count_words, Annotation, EssayDraft, PlacementResult, SessionId, SessionKind, Step,
    TaskKind, TaskPrompt, TextSegment,
};
use crate::services::{AnnotationOverlayEngine, DraftStore, TimerSettings};
use crate::utils::logging::{log_task_submitted, truncate_text};
use crate::utils::Clock;
use crate::workflow::test_session::{
    Editor, Failure, FailureCause, Phase, Task1Outcome, TestSession,
};

/// 步骤变化通知
pub type StepListener = Arc<dyn Fn(Step) + Send + Sync>;

/// 控制器参数
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub session_kind: SessionKind,
    pub task1_min_words: usize,
    pub task2_min_words: usize,
    pub timer: TimerSettings,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_kind: config.session_kind,
            task1_min_words: config.min_words(TaskKind::Task1),
            task2_min_words: config.min_words(TaskKind::Task2),
            timer: config.timer_settings(),
        }
    }

    pub fn min_words(&self, task: TaskKind) -> usize {
        match task {
            TaskKind::Task1 => self.task1_min_words,
            TaskKind::Task2 => self.task2_min_words,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 测试会话控制器
///
/// - 唯一持有并修改 `TestSession`
/// - 决定何时开始会话、何时取题、何时提交
/// - 把所有后端失败转换成 `Error` 步骤，不向外抛出
/// - 只有本地前置条件（字数、步骤不匹配）以 `SessionError` 返回
pub struct TestSessionController {
    session: TestSession,
    backend: Arc<dyn GradingBackend>,
    topics: Arc<dyn TopicProvider>,
    drafts: Arc<dyn DraftStore>,
    settings: ControllerSettings,
    clock: Clock,
    listener: Option<StepListener>,
    /// 最近一次通知的步骤
    last_step: Step,
}

impl TestSessionController {
    /// 创建新的控制器
    pub fn new(
        settings: ControllerSettings,
        backend: Arc<dyn GradingBackend>,
        topics: Arc<dyn TopicProvider>,
        drafts: Arc<dyn DraftStore>,
    ) -> Self {
        Self {
            session: TestSession::new(),
            backend,
            topics,
            drafts,
            settings,
            clock: Clock::default(),
            listener: None,
            last_step: Step::Intro,
        }
    }

    /// 使用指定时钟（结果的完成时间）
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// 每次步骤变化时调用
    pub fn with_step_listener(mut self, listener: StepListener) -> Self {
        self.listener = Some(listener);
        self
    }

    // ========== 查询 ==========

    pub fn session(&self) -> &TestSession {
        &self.session
    }

    pub fn current_step(&self) -> Step {
        self.session.step()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.session_id()
    }

    /// 正在编辑（或错误后待恢复）的任务
    pub fn current_task(&self) -> Option<TaskKind> {
        self.session.phase().editor().map(Editor::task)
    }

    pub fn current_topic(&self) -> Option<&TaskPrompt> {
        self.session.phase().editor().map(|editor| &editor.topic)
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.session
            .phase()
            .editor()
            .map(|editor| editor.timer.elapsed_seconds())
            .unwrap_or(0)
    }

    pub fn word_count(&self) -> usize {
        self.session
            .phase()
            .editor()
            .map(|editor| editor.draft.word_count())
            .unwrap_or(0)
    }

    /// 当前草稿（含用时）
    pub fn draft(&self) -> Option<EssayDraft> {
        self.session.phase().editor().map(Editor::snapshot)
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.session.failure()
    }

    pub fn error_message(&self) -> Option<String> {
        self.session.failure().map(Failure::message)
    }

    pub fn result(&self) -> Option<&PlacementResult> {
        self.session.final_result()
    }

    /// 结果中某项任务的批注分段
    ///
    /// 没有结果或该任务被跳过时返回空列表。
    pub fn segments<'a>(
        &'a self,
        task: TaskKind,
        engine: &AnnotationOverlayEngine,
    ) -> Vec<TextSegment<'a>> {
        let Some(result) = self.session.final_result() else {
            return Vec::new();
        };
        let source: Option<(&'a str, &'a [Annotation])> = match task {
            TaskKind::Task1 => result
                .task1
                .as_ref()
                .map(|a| (a.essay_text.as_str(), a.annotations.as_slice())),
            TaskKind::Task2 => result
                .task2
                .as_ref()
                .map(|a| (a.essay_text.as_str(), a.annotations.as_slice())),
        };
        source
            .map(|(text, annotations)| engine.segments(text, annotations))
            .unwrap_or_default()
    }

    // ========== 草稿 ==========

    /// 更新草稿内容，返回新的词数
    pub fn update_draft(&mut self, text: &str) -> Result<usize, SessionError> {
        let step = self.current_step();
        let editor = self
            .session
            .phase_mut()
            .editor_mut()
            .filter(|_| !step.is_busy())
            .ok_or(SessionError::InvalidTransition {
                step: step.to_string(),
                action: "update_draft",
            })?;
        editor.set_content(text);
        Ok(editor.draft.word_count())
    }

    /// 立即保存草稿
    ///
    /// 草稿为空时不保存，返回 `false`。
    pub fn save_draft(&mut self, text: &str) -> Result<bool, SessionError> {
        self.update_draft(text)?;
        let saved = self
            .session
            .phase()
            .editor()
            .map(|editor| editor.timer.save_now(text))
            .unwrap_or(false);
        if saved {
            debug!("{} 💾 草稿已保存", self.session);
        }
        Ok(saved)
    }

    // ========== 流程 ==========

    /// 开始会话：Intro → Task1Loading → Task1Editing
    ///
    /// 错误状态下如果待恢复的步骤是 Intro，会从头重新开始。
    pub async fn start(&mut self) -> Result<Step, SessionError> {
        match self.current_step() {
            Step::Intro => {}
            Step::Error if self.resume_step() == Some(Step::Intro) => {}
            step => return Err(invalid(step, "start")),
        }

        self.set_phase(Phase::Task1Loading { session_id: None });

        let backend = Arc::clone(&self.backend);
        let kind = self.settings.session_kind;
        let in_flight = InFlight::new(self);
        let started = backend.start_session(kind).await;
        in_flight.disarm();

        let session_id = match started {
            Ok(id) => id,
            Err(e) => return Ok(self.fail(FailureCause::Submission(e), Phase::Intro)),
        };
        info!(
            "[会话 {}] ✓ 会话已创建 ({})",
            session_id, self.settings.session_kind
        );

        self.set_phase(Phase::Task1Loading {
            session_id: Some(session_id.clone()),
        });

        let topics = Arc::clone(&self.topics);
        let in_flight = InFlight::new(self);
        let fetched = topics.random_topic(TaskKind::Task1).await;
        in_flight.disarm();

        match fetched {
            Ok(topic) => {
                info!("[会话 {}] 📄 Task 1 题目: {}", session_id, topic);
                let editor = self.open_editor(session_id, topic);
                self.set_phase(Phase::Task1Editing(editor));
            }
            Err(e) => {
                return Ok(self.fail(FailureCause::Topic(e), Phase::Intro));
            }
        }

        Ok(self.current_step())
    }

    /// 提交当前编辑中的任务
    pub async fn submit(&mut self, text: &str) -> Result<Step, SessionError> {
        match self.current_task() {
            Some(TaskKind::Task1) => self.submit_task1(text).await,
            Some(TaskKind::Task2) => self.submit_task2(text).await,
            None => Err(invalid(self.current_step(), "submit")),
        }
    }

    /// 提交 Task 1：Task1Editing → Task1Submitting → Task2Loading → Task2Editing
    ///
    /// "已提交"冲突不进入错误状态，直接继续获取 Task 2 题目。
    pub async fn submit_task1(&mut self, text: &str) -> Result<Step, SessionError> {
        self.prepare_submit(TaskKind::Task1, text)?;

        let mut editor = match self.session.take_phase() {
            Phase::Task1Editing(editor) => editor,
            other => return Err(self.restore_invalid(other, "submit_task1")),
        };
        editor.set_content(text);
        editor.timer.pause_ticking();

        let draft = editor.snapshot();
        let submission = Task1Submission::from_draft(&editor.topic, &draft);
        let session_id = editor.session_id.clone();
        log_task_submitted(TaskKind::Task1, draft.word_count(), draft.elapsed_seconds());
        self.set_phase(Phase::Task1Submitting(editor));

        let backend = Arc::clone(&self.backend);
        let in_flight = InFlight::new(self);
        let outcome = backend.submit_task1(&session_id, submission).await;
        in_flight.disarm();

        let editor = match self.session.take_phase() {
            Phase::Task1Submitting(editor) => editor,
            other => return Err(self.restore_invalid(other, "submit_task1")),
        };

        let assessment = match outcome {
            Ok(assessment) => {
                info!(
                    "[会话 {}] ✅ Task 1 评分完成: {:.1}",
                    session_id, assessment.overall_score
                );
                Some(assessment)
            }
            Err(e) if e.is_conflict() => {
                info!("[会话 {}] Task 1 已提交过，跳过评分", session_id);
                None
            }
            Err(e) => {
                editor.timer.resume_ticking();
                return Ok(self.fail(FailureCause::Submission(e), Phase::Task1Editing(editor)));
            }
        };

        let (topic, _) = editor.finish();
        let task1 = Task1Outcome { topic, assessment };
        Ok(self.load_task2(session_id, task1).await)
    }

    /// 提交 Task 2：Task2Editing → Task2Submitting → Processing → Result
    pub async fn submit_task2(&mut self, text: &str) -> Result<Step, SessionError> {
        self.prepare_submit(TaskKind::Task2, text)?;

        let (task1, mut editor) = match self.session.take_phase() {
            Phase::Task2Editing { task1, editor } => (task1, editor),
            other => return Err(self.restore_invalid(other, "submit_task2")),
        };
        editor.set_content(text);
        editor.timer.pause_ticking();

        let draft = editor.snapshot();
        let submission = Task2Submission::from_draft(&editor.topic, &draft);
        let session_id = editor.session_id.clone();
        log_task_submitted(TaskKind::Task2, draft.word_count(), draft.elapsed_seconds());
        self.set_phase(Phase::Task2Submitting { task1, editor });

        let backend = Arc::clone(&self.backend);
        let in_flight = InFlight::new(self);
        let outcome = backend.submit_task2(&session_id, submission).await;
        in_flight.disarm();

        let (task1, editor) = match self.session.take_phase() {
            Phase::Task2Submitting { task1, editor } => (task1, editor),
            other => return Err(self.restore_invalid(other, "submit_task2")),
        };

        let assessment = match outcome {
            Ok(assessment) => {
                info!(
                    "[会话 {}] ✅ Task 2 评分完成: {:.1}",
                    session_id, assessment.overall_score
                );
                Some(assessment)
            }
            Err(e) if e.is_conflict() => {
                info!("[会话 {}] Task 2 已提交过，跳过评分", session_id);
                None
            }
            Err(e) => {
                editor.timer.resume_ticking();
                return Ok(self.fail(
                    FailureCause::Submission(e),
                    Phase::Task2Editing { task1, editor },
                ));
            }
        };

        editor.finish();
        self.set_phase(Phase::Processing {
            session_id: session_id.clone(),
        });

        let result =
            PlacementResult::combine(session_id, task1.assessment, assessment, self.clock.now());
        match result.overall_band_score {
            Some(score) => info!(
                "[会话 {}] 🎯 总分 {:.1} ({})",
                result.session_id,
                score,
                result.band_label()
            ),
            None => warn!("[会话 {}] ⚠️ 两项任务均无评分", result.session_id),
        }
        self.set_phase(Phase::Result(result));

        Ok(self.current_step())
    }

    /// 重试失败的操作
    ///
    /// - 开始会话失败：从头重新开始
    /// - Task 2 取题失败：重新取题
    /// - 提交失败：用当前草稿重新提交
    pub async fn retry(&mut self) -> Result<Step, SessionError> {
        match (self.current_step(), self.resume_step()) {
            (Step::Error, Some(Step::Intro)) => self.start().await,
            (Step::Error, Some(Step::Task2Loading)) | (Step::Task2Loading, _) => {
                let (session_id, task1) = match self.resume_phase() {
                    Phase::Task2Loading { session_id, task1 } => (session_id, task1),
                    other => return Err(self.restore_invalid(other, "retry")),
                };
                Ok(self.load_task2(session_id, task1).await)
            }
            (Step::Error, Some(Step::Task1Editing | Step::Task2Editing)) => {
                let text = self
                    .draft()
                    .map(|draft| draft.content().to_string())
                    .unwrap_or_default();
                self.submit(&text).await
            }
            (step, _) => Err(invalid(step, "retry")),
        }
    }

    /// 关闭错误提示，回到之前的步骤
    ///
    /// 只适用于回到 Intro 或编辑状态；取题失败需要 `retry()`。
    pub fn dismiss_error(&mut self) -> Result<Step, SessionError> {
        match self.resume_step() {
            Some(Step::Intro | Step::Task1Editing | Step::Task2Editing) => {
                let phase = self.resume_phase();
                self.set_phase(phase);
                Ok(self.current_step())
            }
            _ => Err(invalid(self.current_step(), "dismiss_error")),
        }
    }

    /// 重新测试：清空会话 ID、题目、评分、草稿和计时器
    pub fn retake(&mut self) -> Step {
        if let Some(id) = self.session_id() {
            info!("[会话 {}] 🔄 重新测试", id);
        }
        self.set_phase(Phase::Intro);
        Step::Intro
    }

    // ========== 内部步骤 ==========

    /// Task2Loading → Task2Editing
    async fn load_task2(&mut self, session_id: SessionId, task1: Task1Outcome) -> Step {
        self.set_phase(Phase::Task2Loading {
            session_id: session_id.clone(),
            task1,
        });

        let topics = Arc::clone(&self.topics);
        let in_flight = InFlight::new(self);
        let fetched = topics.random_topic(TaskKind::Task2).await;
        in_flight.disarm();

        let (session_id, task1) = match self.session.take_phase() {
            Phase::Task2Loading { session_id, task1 } => (session_id, task1),
            other => {
                self.session.replace_phase(other);
                return self.current_step();
            }
        };

        match fetched {
            Ok(topic) => {
                info!("[会话 {}] 📄 Task 2 题目: {}", session_id, topic);
                let editor = self.open_editor(session_id, topic);
                self.set_phase(Phase::Task2Editing { task1, editor });
                self.current_step()
            }
            Err(e) => self.fail(
                FailureCause::Topic(e),
                Phase::Task2Loading { session_id, task1 },
            ),
        }
    }

    fn open_editor(&self, session_id: SessionId, topic: TaskPrompt) -> Editor {
        Editor::open(
            session_id,
            topic,
            self.settings.timer,
            Arc::clone(&self.drafts),
        )
    }

    /// 提交前检查：步骤和字数
    ///
    /// 错误状态下如果待恢复的是对应的编辑状态，先回到编辑状态。
    fn prepare_submit(&mut self, task: TaskKind, text: &str) -> Result<(), SessionError> {
        let (editing, action) = match task {
            TaskKind::Task1 => (Step::Task1Editing, "submit_task1"),
            TaskKind::Task2 => (Step::Task2Editing, "submit_task2"),
        };

        let step = self.current_step();
        let from_error = step == Step::Error && self.resume_step() == Some(editing);
        if step != editing && !from_error {
            return Err(invalid(step, action));
        }

        let minimum = self.settings.min_words(task);
        let actual = count_words(text);
        if actual < minimum {
            if let Some(editor) = self.session.phase_mut().editor_mut() {
                editor.set_content(text);
            }
            debug!(
                "{} {} 字数不足: {}/{} \"{}\"",
                self.session,
                task,
                actual,
                minimum,
                truncate_text(text, 40)
            );
            return Err(SessionError::WordCountTooLow {
                task,
                actual,
                minimum,
            });
        }

        if from_error {
            let phase = self.resume_phase();
            self.set_phase(phase);
        }
        Ok(())
    }

    fn resume_step(&self) -> Option<Step> {
        self.session.failure().map(Failure::resume_step)
    }

    /// 取出错误状态中待恢复的阶段；不在错误状态时取出当前阶段
    fn resume_phase(&mut self) -> Phase {
        match self.session.take_phase() {
            Phase::Error(failure) => failure.into_resume(),
            other => other,
        }
    }

    /// 设置新阶段；步骤变化时记录日志并通知
    fn set_phase(&mut self, phase: Phase) {
        let next = phase.step();
        self.session.replace_phase(phase);
        if next == self.last_step {
            return;
        }
        debug!("{} 步骤 {} → {}", self.session, self.last_step, next);
        self.last_step = next;
        if let Some(listener) = &self.listener {
            listener(next);
        }
    }

    /// 进入错误状态，返回 `Step::Error`
    fn fail(&mut self, cause: FailureCause, resume: Phase) -> Step {
        let resume_step = resume.step();
        warn!(
            "{} ⚠️ {} (重试将回到 {})",
            self.session, cause, resume_step
        );
        self.set_phase(Phase::Error(Failure::new(cause, resume)));
        Step::Error
    }

    /// 网络调用被放弃：Loading / Submitting 转入错误状态
    ///
    /// 提交中的编辑器回到编辑状态并恢复计时；开始会话被中断时从头开始。
    fn recover_interrupted(&mut self) {
        let step = self.current_step();
        let resume = match self.session.take_phase() {
            Phase::Task1Loading { .. } => Phase::Intro,
            Phase::Task1Submitting(editor) => {
                editor.timer.resume_ticking();
                Phase::Task1Editing(editor)
            }
            Phase::Task2Submitting { task1, editor } => {
                editor.timer.resume_ticking();
                Phase::Task2Editing { task1, editor }
            }
            phase @ Phase::Task2Loading { .. } => phase,
            other => {
                self.session.replace_phase(other);
                return;
            }
        };
        self.fail(FailureCause::Interrupted(step), resume);
    }

    /// 放回取出的阶段，返回步骤不匹配错误
    fn restore_invalid(&mut self, phase: Phase, action: &'static str) -> SessionError {
        let step = phase.step();
        self.session.replace_phase(phase);
        invalid(step, action)
    }
}

/// 跨越一次网络调用的守卫
///
/// 调用返回后必须 `disarm()`；未解除就被丢弃说明外层 future 被取消。
struct InFlight<'a> {
    controller: &'a mut TestSessionController,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(controller: &'a mut TestSessionController) -> Self {
        Self {
            controller,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.controller.recover_interrupted();
        }
    }
}

fn invalid(step: Step, action: &'static str) -> SessionError {
    SessionError::InvalidTransition {
        step: step.to_string(),
        action,
    }
}
