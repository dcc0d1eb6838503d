mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use tokio::time::sleep;
use tokio_test::{assert_err, assert_ok};
use writing_assessment::clients::{GradingBackend, Task1Submission, Task2Submission};
use writing_assessment::error::{SessionError, SubmissionError};
use writing_assessment::models::{
    Annotation, AnnotationType, SessionId, SessionKind, Severity, Task1Assessment,
    Task2Assessment, TaskKind,
};
use writing_assessment::orchestrator::{run_session, Essays};
use writing_assessment::services::AnnotationOverlayEngine;
use writing_assessment::utils::fixed_now;
use writing_assessment::workflow::{ControllerSettings, FailureCause, TestSessionController};
use writing_assessment::Step;

async fn submit_both(controller: &mut TestSessionController) -> Step {
    assert_ok!(controller.start().await);
    assert_ok!(controller.submit_task1(TASK1_ESSAY).await);
    assert_ok!(controller.submit_task2(TASK2_ESSAY).await)
}

#[tokio::test]
async fn full_session_reaches_result_with_weighted_overall() {
    init_tracing();
    let backend = FakeBackend::new();
    let (mut controller, steps) = controller(backend.clone());

    let step = submit_both(&mut controller).await;

    assert_eq!(step, Step::Result);
    assert_eq!(
        *steps.lock().unwrap(),
        vec![
            Step::Task1Loading,
            Step::Task1Editing,
            Step::Task1Submitting,
            Step::Task2Loading,
            Step::Task2Editing,
            Step::Task2Submitting,
            Step::Processing,
            Step::Result,
        ]
    );

    let result = controller.result().unwrap();
    assert_eq!(result.session_id.as_str(), "session-1");
    assert_eq!(result.task1.as_ref().unwrap().recomputed_overall(), 6.5);
    // (6.5 + 2 * 7.0) / 3 = 6.83 → 7.0
    assert_eq!(result.overall_band_score, Some(7.0));
    assert_eq!(result.band_label(), "Good user");
    assert_eq!(result.completed_at, fixed_now());

    assert_eq!(
        backend.calls(),
        vec!["start:Placement", "task1:session-1", "task2:session-1"]
    );
    let payload = backend.task1_payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.task_type, "Academic");
    assert_eq!(payload.image_ref.as_deref(), Some("charts/t1-001.png"));
    assert_eq!(payload.essay_text, TASK1_ESSAY);
    let payload = backend.task2_payloads.lock().unwrap()[0].clone();
    assert_eq!(payload.question_type, "opinion");
}

#[tokio::test]
async fn already_submitted_task1_skips_to_task2_without_error() {
    let backend = FakeBackend::new();
    backend.push_task1(Err(SubmissionError::Conflict {
        task: TaskKind::Task1,
    }));
    let (mut controller, steps) = controller(backend);
    assert_ok!(controller.start().await);

    let step = assert_ok!(controller.submit_task1(TASK1_ESSAY).await);

    assert_eq!(step, Step::Task2Editing);
    assert!(steps.lock().unwrap().contains(&Step::Task2Loading));
    assert!(!steps.lock().unwrap().contains(&Step::Error));
    assert!(controller.session().task1_result().is_none());
    assert_eq!(
        controller.session().task1_topic().map(|t| t.id.as_str()),
        Some("t1-001")
    );

    assert_ok!(controller.submit_task2(TASK2_ESSAY).await);
    let result = controller.result().unwrap();
    assert!(result.task1.is_none());
    assert_eq!(result.overall_band_score, Some(7.0));
}

#[tokio::test]
async fn start_validation_error_surfaces_backend_message() {
    let backend = FakeBackend::new();
    backend.push_start(Err(SubmissionError::validation(Some(
        "No active learning path".into(),
    ))));
    let (mut controller, _) = controller(backend.clone());

    let step = assert_ok!(controller.start().await);

    assert_eq!(step, Step::Error);
    assert_eq!(
        controller.error_message().as_deref(),
        Some("No active learning path")
    );
    assert!(controller.session_id().is_none());
    assert_eq!(
        controller.failure().map(|f| f.resume_step()),
        Some(Step::Intro)
    );

    // 重试从头开始
    assert_eq!(assert_ok!(controller.retry().await), Step::Task1Editing);
    assert_eq!(
        backend.calls(),
        vec!["start:Placement", "start:Placement"]
    );
}

#[tokio::test]
async fn network_failure_on_task1_keeps_draft_and_retry_resubmits() {
    let backend = FakeBackend::new();
    backend.push_task1(Err(SubmissionError::network(
        "http://grading.test/writing-tests/sessions/session-1/task1",
        "connection reset",
    )));
    let (mut controller, _) = controller(backend.clone());
    assert_ok!(controller.start().await);

    let step = assert_ok!(controller.submit_task1(TASK1_ESSAY).await);

    assert_eq!(step, Step::Error);
    assert_eq!(
        controller.failure().map(|f| f.resume_step()),
        Some(Step::Task1Editing)
    );
    assert!(matches!(
        controller.failure().map(|f| f.cause()),
        Some(FailureCause::Submission(SubmissionError::Network { .. }))
    ));
    assert_eq!(controller.current_task(), Some(TaskKind::Task1));
    assert_eq!(controller.draft().unwrap().content(), TASK1_ESSAY);

    assert_eq!(assert_ok!(controller.retry().await), Step::Task2Editing);
    let payloads = backend.task1_payloads.lock().unwrap();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[1].essay_text, TASK1_ESSAY);
}

#[tokio::test]
async fn submit_is_allowed_directly_from_the_error_state() {
    let backend = FakeBackend::new();
    backend.push_task2(Err(SubmissionError::network("task2", "timeout")));
    let (mut controller, _) = controller(backend);
    assert_ok!(controller.start().await);
    assert_ok!(controller.submit_task1(TASK1_ESSAY).await);

    assert_eq!(
        assert_ok!(controller.submit_task2(TASK2_ESSAY).await),
        Step::Error
    );
    let revised = format!("{} Revised conclusion here.", TASK2_ESSAY);
    assert_eq!(
        assert_ok!(controller.submit(&revised).await),
        Step::Result
    );
    assert_eq!(
        controller.result().unwrap().task2.as_ref().unwrap().essay_text,
        revised
    );
}

#[tokio::test]
async fn word_count_below_minimum_never_reaches_backend() {
    let backend = FakeBackend::new();
    let (mut controller, _) = controller(backend.clone());
    assert_ok!(controller.start().await);

    let err = assert_err!(controller.submit_task1("Too few words - here").await);

    assert_eq!(
        err,
        SessionError::WordCountTooLow {
            task: TaskKind::Task1,
            actual: 4,
            minimum: 5,
        }
    );
    assert_eq!(controller.current_step(), Step::Task1Editing);
    assert_eq!(controller.draft().unwrap().content(), "Too few words - here");
    assert_eq!(backend.calls(), vec!["start:Placement"]);
}

#[tokio::test]
async fn task2_topic_failure_is_retried_by_reloading() {
    let backend = FakeBackend::new();
    let (_, drafts) = recording_drafts();
    let (mut controller, _) =
        controller_with(backend, FlakyTopics::failing_once(TaskKind::Task2), drafts);
    assert_ok!(controller.start().await);

    assert_eq!(
        assert_ok!(controller.submit_task1(TASK1_ESSAY).await),
        Step::Error
    );
    assert_eq!(
        controller.failure().map(|f| f.resume_step()),
        Some(Step::Task2Loading)
    );
    assert!(controller.session().task1_result().is_some());
    assert_err!(controller.dismiss_error());

    assert_eq!(assert_ok!(controller.retry().await), Step::Task2Editing);
    assert_eq!(
        controller.current_topic().map(|t| t.id.as_str()),
        Some("t2-001")
    );
}

#[tokio::test]
async fn retake_clears_the_whole_session() {
    let backend = FakeBackend::new();
    let (mut controller, steps) = controller(backend.clone());
    submit_both(&mut controller).await;

    assert_eq!(controller.retake(), Step::Intro);

    assert_eq!(steps.lock().unwrap().last(), Some(&Step::Intro));
    assert!(controller.session_id().is_none());
    assert!(controller.result().is_none());
    assert!(controller.draft().is_none());
    assert_eq!(controller.elapsed_seconds(), 0);

    backend.push_start(Ok(SessionId::new("session-2")));
    assert_ok!(controller.start().await);
    assert_eq!(controller.session_id().map(SessionId::as_str), Some("session-2"));
}

#[tokio::test]
async fn annotated_segments_come_from_the_result() {
    let backend = FakeBackend::new();
    backend.push_task2(Ok(task2_assessment(
        TASK2_ESSAY,
        7.0,
        vec![
            Annotation::new(0, 4, AnnotationType::Error, "grammar", Severity::High, "Word form")
                .with_correction("Many"),
            Annotation::new(5, 11, AnnotationType::Highlight, "vocabulary", Severity::Low, "Good"),
        ],
    )));
    let (mut controller, _) = controller(backend);
    submit_both(&mut controller).await;

    let mut engine = AnnotationOverlayEngine::new();
    let segments = controller.segments(TaskKind::Task2, &engine);
    let rebuilt: String = segments.iter().map(|s| s.text).collect();

    assert_eq!(rebuilt, TASK2_ESSAY);
    assert_eq!(segments[0].text, "Some");
    assert!(segments[0].is_annotated());
    assert_eq!(segments[2].text, "people");

    engine.set_visible(false);
    assert_eq!(controller.segments(TaskKind::Task2, &engine).len(), 1);
    // Task 1 没有批注
    assert_eq!(controller.segments(TaskKind::Task1, &engine).len(), 1);
}

#[tokio::test]
async fn progress_sessions_are_requested_as_progress() {
    let backend = FakeBackend::new();
    let (_, drafts) = recording_drafts();
    let settings = ControllerSettings {
        session_kind: SessionKind::Progress,
        ..settings()
    };
    let mut controller =
        TestSessionController::new(settings, backend.clone(), Arc::new(sample_bank()), drafts);

    assert_ok!(controller.start().await);
    assert_eq!(backend.calls(), vec!["start:Progress"]);
}

// ========== 计时与自动保存 ==========

#[tokio::test(start_paused = true)]
async fn timer_counts_during_editing_and_autosaves_drafts() {
    let backend = FakeBackend::new();
    let (saved, drafts) = recording_drafts();
    let (mut controller, _) = controller_with(backend, Arc::new(sample_bank()), drafts);
    assert_ok!(controller.start().await);

    sleep(Duration::from_millis(5_500)).await;
    assert_eq!(controller.elapsed_seconds(), 5);

    assert_eq!(assert_ok!(controller.update_draft(TASK1_ESSAY)), 13);
    sleep(Duration::from_secs(25)).await;
    assert_eq!(
        *saved.lock().unwrap(),
        vec![("session-1".to_string(), TaskKind::Task1, TASK1_ESSAY.to_string())]
    );

    assert_ok!(controller.submit_task1(TASK1_ESSAY).await);
    assert_eq!(controller.elapsed_seconds(), 0);

    sleep(Duration::from_millis(60_500)).await;
    // Task 1 的计时器已取消，Task 2 草稿为空不会保存
    assert_eq!(saved.lock().unwrap().len(), 1);
    assert_eq!(controller.elapsed_seconds(), 60);
}

#[tokio::test]
async fn save_draft_skips_blank_text() {
    let backend = FakeBackend::new();
    let (saved, drafts) = recording_drafts();
    let (mut controller, _) = controller_with(backend, Arc::new(sample_bank()), drafts);
    assert_ok!(controller.start().await);

    assert!(!assert_ok!(controller.save_draft("   ")));
    assert!(assert_ok!(controller.save_draft("The chart")));
    assert_eq!(saved.lock().unwrap().len(), 1);
}

// ========== 进行中的提交 ==========

/// 网络调用永远不返回的后端
struct StalledBackend {
    stall_start: bool,
}

impl GradingBackend for StalledBackend {
    fn start_session(&self, _: SessionKind) -> BoxFuture<'_, Result<SessionId, SubmissionError>> {
        if self.stall_start {
            future::pending().boxed()
        } else {
            future::ready(Ok(SessionId::new("stalled"))).boxed()
        }
    }

    fn submit_task1<'a>(
        &'a self,
        _: &'a SessionId,
        _: Task1Submission,
    ) -> BoxFuture<'a, Result<Task1Assessment, SubmissionError>> {
        future::pending().boxed()
    }

    fn submit_task2<'a>(
        &'a self,
        _: &'a SessionId,
        _: Task2Submission,
    ) -> BoxFuture<'a, Result<Task2Assessment, SubmissionError>> {
        future::pending().boxed()
    }
}

fn stalled_controller(stall_start: bool) -> TestSessionController {
    let (_, drafts) = recording_drafts();
    TestSessionController::new(
        settings(),
        Arc::new(StalledBackend { stall_start }),
        Arc::new(sample_bank()),
        drafts,
    )
}

#[tokio::test]
async fn abandoned_submission_keeps_the_draft_and_can_be_retried() {
    let mut controller = stalled_controller(false);
    assert_ok!(controller.start().await);

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        controller.submit_task1(TASK1_ESSAY),
    )
    .await;
    assert!(timed_out.is_err());

    assert_eq!(controller.current_step(), Step::Error);
    assert_eq!(
        controller.failure().map(|f| f.cause().clone()),
        Some(FailureCause::Interrupted(Step::Task1Submitting))
    );
    assert_eq!(
        controller.failure().map(|f| f.resume_step()),
        Some(Step::Task1Editing)
    );
    assert_eq!(controller.word_count(), 13);

    // 重试再次被放弃，仍然回到错误状态
    let timed_out = tokio::time::timeout(Duration::from_millis(50), controller.retry()).await;
    assert!(timed_out.is_err());
    assert_eq!(controller.current_step(), Step::Error);

    assert_eq!(assert_ok!(controller.dismiss_error()), Step::Task1Editing);
    assert_eq!(
        controller.draft().map(|d| d.content().to_string()),
        Some(TASK1_ESSAY.to_string())
    );
    assert_eq!(assert_ok!(controller.update_draft("more text here")), 3);
}

#[tokio::test(start_paused = true)]
async fn abandoned_submission_resumes_the_clock() {
    let mut controller = stalled_controller(false);
    assert_ok!(controller.start().await);
    sleep(Duration::from_millis(2500)).await;

    let timed_out = tokio::time::timeout(
        Duration::from_secs(10),
        controller.submit_task1(TASK1_ESSAY),
    )
    .await;
    assert!(timed_out.is_err());
    let frozen = controller.elapsed_seconds();
    assert_eq!(frozen, 2);

    sleep(Duration::from_secs(3)).await;
    assert!(controller.elapsed_seconds() > frozen);
}

#[tokio::test]
async fn abandoned_start_returns_to_intro_on_dismiss() {
    let mut controller = stalled_controller(true);

    let timed_out = tokio::time::timeout(Duration::from_millis(50), controller.start()).await;
    assert!(timed_out.is_err());

    assert_eq!(controller.current_step(), Step::Error);
    assert_eq!(
        controller.failure().map(|f| f.resume_step()),
        Some(Step::Intro)
    );
    assert_eq!(assert_ok!(controller.dismiss_error()), Step::Intro);
    assert_eq!(controller.session_id(), None);
}

// ========== 自动化考生 ==========

#[tokio::test]
async fn runner_retries_transient_failures() {
    let backend = FakeBackend::new();
    backend.push_task1(Err(SubmissionError::network("task1", "reset")));
    backend.push_task1(Err(SubmissionError::network("task1", "reset")));
    let (mut controller, _) = controller(backend.clone());
    let essays = Essays {
        task1: TASK1_ESSAY.to_string(),
        task2: TASK2_ESSAY.to_string(),
    };

    let result = assert_ok!(run_session(&mut controller, &essays).await);

    assert_eq!(result.overall_band_score, Some(7.0));
    assert_eq!(backend.task1_payloads.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn runner_stops_on_validation_errors() {
    let backend = FakeBackend::new();
    backend.push_start(Err(SubmissionError::validation(Some(
        "No active learning path".into(),
    ))));
    let (mut controller, _) = controller(backend);
    let essays = Essays {
        task1: TASK1_ESSAY.to_string(),
        task2: TASK2_ESSAY.to_string(),
    };

    let err = assert_err!(run_session(&mut controller, &essays).await);
    assert!(err.to_string().contains("No active learning path"));
}
