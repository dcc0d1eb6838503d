#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use writing_assessment::clients::{
    GradingBackend, Task1Submission, Task2Submission, TomlTopicBank, TopicProvider,
};
use writing_assessment::error::{SubmissionError, TopicError};
use writing_assessment::models::{
    Annotation, SessionId, SessionKind, Task1Assessment, Task2Assessment, TaskKind, TaskPrompt,
};
use writing_assessment::services::DraftStore;
use writing_assessment::utils::{fixed_clock, fixed_now};
use writing_assessment::workflow::{ControllerSettings, StepListener, TestSessionController};
use writing_assessment::Step;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ========== 评分后端 ==========

/// 内存评分后端
///
/// 按队列返回预设结果；队列为空时返回默认成功结果。
#[derive(Default)]
pub struct FakeBackend {
    pub start: Mutex<VecDeque<Result<SessionId, SubmissionError>>>,
    pub task1: Mutex<VecDeque<Result<Task1Assessment, SubmissionError>>>,
    pub task2: Mutex<VecDeque<Result<Task2Assessment, SubmissionError>>>,
    pub calls: Mutex<Vec<String>>,
    pub task1_payloads: Mutex<Vec<Task1Submission>>,
    pub task2_payloads: Mutex<Vec<Task2Submission>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_start(&self, outcome: Result<SessionId, SubmissionError>) {
        self.start.lock().unwrap().push_back(outcome);
    }

    pub fn push_task1(&self, outcome: Result<Task1Assessment, SubmissionError>) {
        self.task1.lock().unwrap().push_back(outcome);
    }

    pub fn push_task2(&self, outcome: Result<Task2Assessment, SubmissionError>) {
        self.task2.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl GradingBackend for FakeBackend {
    fn start_session(&self, kind: SessionKind) -> BoxFuture<'_, Result<SessionId, SubmissionError>> {
        self.calls.lock().unwrap().push(format!("start:{}", kind));
        let outcome = self
            .start
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SessionId::new("session-1")));
        future::ready(outcome).boxed()
    }

    fn submit_task1<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task1Submission,
    ) -> BoxFuture<'a, Result<Task1Assessment, SubmissionError>> {
        self.calls.lock().unwrap().push(format!("task1:{}", session_id));
        let essay = submission.essay_text.clone();
        self.task1_payloads.lock().unwrap().push(submission);
        let outcome = self
            .task1
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(task1_assessment(&essay, [6.0, 6.5, 7.0, 6.5], 6.5)));
        future::ready(outcome).boxed()
    }

    fn submit_task2<'a>(
        &'a self,
        session_id: &'a SessionId,
        submission: Task2Submission,
    ) -> BoxFuture<'a, Result<Task2Assessment, SubmissionError>> {
        self.calls.lock().unwrap().push(format!("task2:{}", session_id));
        let essay = submission.essay_text.clone();
        self.task2_payloads.lock().unwrap().push(submission);
        let outcome = self
            .task2
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(task2_assessment(&essay, 7.0, Vec::new())));
        future::ready(outcome).boxed()
    }
}

// ========== 题库 ==========

/// 第一次请求某任务的题目时失败，之后正常
pub struct FlakyTopics {
    inner: TomlTopicBank,
    failures: Mutex<Vec<TaskKind>>,
}

impl FlakyTopics {
    pub fn failing_once(task: TaskKind) -> Arc<Self> {
        Arc::new(Self {
            inner: sample_bank(),
            failures: Mutex::new(vec![task]),
        })
    }
}

impl TopicProvider for FlakyTopics {
    fn random_topic(&self, task: TaskKind) -> BoxFuture<'_, Result<TaskPrompt, TopicError>> {
        let mut failures = self.failures.lock().unwrap();
        if let Some(pos) = failures.iter().position(|t| *t == task) {
            failures.remove(pos);
            return future::ready(Err(TopicError::LoadFailed("topic service down".into()))).boxed();
        }
        drop(failures);
        self.inner.random_topic(task)
    }
}

pub fn sample_bank() -> TomlTopicBank {
    TomlTopicBank::new(
        vec![TaskPrompt::task1(
            "t1-001",
            "The chart below shows household spending in 2010 and 2020.",
            "Academic",
            Some("bar".into()),
            Some("charts/t1-001.png".into()),
        )],
        vec![TaskPrompt::task2(
            "t2-001",
            "Some people think university education should be free.",
            "opinion",
        )],
    )
    .with_seed(42)
}

// ========== 草稿 ==========

pub type SavedDrafts = Arc<Mutex<Vec<(String, TaskKind, String)>>>;

pub fn recording_drafts() -> (SavedDrafts, Arc<dyn DraftStore>) {
    let saved: SavedDrafts = Arc::new(Mutex::new(Vec::new()));
    let sink = saved.clone();
    let store: Arc<dyn DraftStore> = Arc::new(move |id: &SessionId, task: TaskKind, text: &str| {
        sink.lock()
            .unwrap()
            .push((id.to_string(), task, text.to_string()));
    });
    (saved, store)
}

// ========== 控制器 ==========

pub type Steps = Arc<Mutex<Vec<Step>>>;

pub fn settings() -> ControllerSettings {
    ControllerSettings {
        task1_min_words: 5,
        task2_min_words: 8,
        ..ControllerSettings::default()
    }
}

pub fn controller_with(
    backend: Arc<FakeBackend>,
    topics: Arc<dyn TopicProvider>,
    drafts: Arc<dyn DraftStore>,
) -> (TestSessionController, Steps) {
    let steps: Steps = Arc::new(Mutex::new(Vec::new()));
    let sink = steps.clone();
    let listener: StepListener = Arc::new(move |step| sink.lock().unwrap().push(step));
    let controller = TestSessionController::new(settings(), backend, topics, drafts)
        .with_clock(fixed_clock())
        .with_step_listener(listener);
    (controller, steps)
}

pub fn controller(backend: Arc<FakeBackend>) -> (TestSessionController, Steps) {
    let (_, drafts) = recording_drafts();
    controller_with(backend, Arc::new(sample_bank()), drafts)
}

// ========== 作文与评分 ==========

pub const TASK1_ESSAY: &str =
    "The bar chart compares household spending across five categories in 2010 and 2020.";
pub const TASK2_ESSAY: &str =
    "Some people believe university should be free, and I largely agree with this view because education benefits society.";

pub fn task1_assessment(essay: &str, criteria: [f64; 4], overall: f64) -> Task1Assessment {
    Task1Assessment {
        id: "a-task1".into(),
        essay_text: essay.into(),
        word_count: essay.split_whitespace().count(),
        time_taken: 600,
        task_achievement: criteria[0],
        coherence_cohesion: criteria[1],
        lexical_resource: criteria[2],
        grammatical_range: criteria[3],
        overall_score: overall,
        general_feedback: "Clear overview.".into(),
        strengths: vec!["Accurate data".into()],
        weaknesses: vec![],
        annotations: vec![],
        created_at: fixed_now(),
    }
}

pub fn task2_assessment(essay: &str, overall: f64, annotations: Vec<Annotation>) -> Task2Assessment {
    Task2Assessment {
        id: "a-task2".into(),
        essay_text: essay.into(),
        word_count: essay.split_whitespace().count(),
        time_taken: 1800,
        task_response: overall,
        coherence_cohesion: overall,
        lexical_resource: overall,
        grammatical_range: overall,
        overall_score: overall,
        general_feedback: "Well argued.".into(),
        strengths: vec![],
        weaknesses: vec!["Some repetition".into()],
        annotations,
        created_at: fixed_now(),
    }
}
