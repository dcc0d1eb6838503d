//! 草稿计时器 - 业务能力层
//!
//! 编辑状态期间的两个周期任务：
//! - 计时：每秒 +1，可暂停，不会归零
//! - 自动保存：每隔固定时间把非空草稿交给外部保存回调
//!
//! 计时器是有作用域的资源：`cancel()` 或 `Drop` 之后，
//! 任何回调都不会再被触发。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::{SessionId, TaskKind};

/// 草稿保存回调
///
/// 自动保存在阻塞线程池中调用；`save_now` 在调用方线程上同步调用。
pub trait DraftStore: Send + Sync {
    fn save_draft(&self, session_id: &SessionId, task: TaskKind, text: &str);
}

impl<F> DraftStore for F
where
    F: Fn(&SessionId, TaskKind, &str) + Send + Sync,
{
    fn save_draft(&self, session_id: &SessionId, task: TaskKind, text: &str) {
        self(session_id, task, text)
    }
}

/// 计时器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub tick: Duration,
    pub autosave: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            autosave: Duration::from_secs(30),
        }
    }
}

struct TimerShared {
    elapsed: AtomicU64,
    ticking: AtomicBool,
    /// 取消标记；触发回调时持有该锁，`cancel()` 返回后不会再有回调
    cancelled: Mutex<bool>,
}

impl TimerShared {
    fn lock_cancelled(&self) -> std::sync::MutexGuard<'_, bool> {
        self.cancelled.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// 草稿计时器
///
/// 必须在 tokio 运行时内创建。
pub struct DraftTimer {
    session_id: SessionId,
    task: TaskKind,
    shared: Arc<TimerShared>,
    draft_tx: watch::Sender<String>,
    store: Arc<dyn DraftStore>,
    handles: Vec<JoinHandle<()>>,
}

impl DraftTimer {
    /// 启动计时与自动保存
    pub fn start(
        session_id: SessionId,
        task: TaskKind,
        initial_elapsed: u64,
        settings: TimerSettings,
        store: Arc<dyn DraftStore>,
    ) -> Self {
        let shared = Arc::new(TimerShared {
            elapsed: AtomicU64::new(initial_elapsed),
            ticking: AtomicBool::new(true),
            cancelled: Mutex::new(false),
        });
        let (draft_tx, draft_rx) = watch::channel(String::new());

        let tick_handle = tokio::spawn(run_ticker(shared.clone(), settings.tick));
        let autosave_handle = tokio::spawn(run_autosave(
            session_id.clone(),
            task,
            shared.clone(),
            draft_rx,
            store.clone(),
            settings.autosave,
        ));

        info!(
            "⏱️ [会话 {}] {} 计时开始 (自动保存间隔 {}s)",
            session_id,
            task,
            settings.autosave.as_secs()
        );

        Self {
            session_id,
            task,
            shared,
            draft_tx,
            store,
            handles: vec![tick_handle, autosave_handle],
        }
    }

    pub fn task(&self) -> TaskKind {
        self.task
    }

    /// 已用时间（秒）
    pub fn elapsed_seconds(&self) -> u64 {
        self.shared.elapsed.load(Ordering::SeqCst)
    }

    pub fn is_ticking(&self) -> bool {
        self.shared.ticking.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shared.lock_cancelled()
    }

    /// 暂停计时（提交中冻结显示时间），自动保存继续
    pub fn pause_ticking(&self) {
        self.shared.ticking.store(false, Ordering::SeqCst);
        debug!("{} 计时暂停于 {}s", self.task, self.elapsed_seconds());
    }

    /// 恢复计时
    pub fn resume_ticking(&self) {
        self.shared.ticking.store(true, Ordering::SeqCst);
        debug!("{} 计时恢复", self.task);
    }

    /// 更新自动保存看到的草稿内容
    pub fn update_draft(&self, text: &str) {
        self.draft_tx.send_replace(text.to_string());
    }

    /// 立即保存一次草稿
    ///
    /// 已取消或草稿为空时返回 `false`。
    pub fn save_now(&self, text: &str) -> bool {
        self.update_draft(text);
        let cancelled = self.shared.lock_cancelled();
        if *cancelled || text.trim().is_empty() {
            return false;
        }
        self.store.save_draft(&self.session_id, self.task, text);
        true
    }

    /// 取消两个周期任务
    ///
    /// 返回后保证不会再触发任何回调，可重复调用。
    pub fn cancel(&mut self) {
        {
            let mut cancelled = self.shared.lock_cancelled();
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.shared.ticking.store(false, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!(
            "⏹️ [会话 {}] {} 计时结束，用时 {}s",
            self.session_id,
            self.task,
            self.elapsed_seconds()
        );
    }
}

impl Drop for DraftTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for DraftTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftTimer")
            .field("session_id", &self.session_id)
            .field("task", &self.task)
            .field("elapsed_seconds", &self.elapsed_seconds())
            .field("ticking", &self.is_ticking())
            .finish_non_exhaustive()
    }
}

async fn run_ticker(shared: Arc<TimerShared>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if !on_tick(&shared) {
            break;
        }
    }
}

fn on_tick(shared: &TimerShared) -> bool {
    let cancelled = shared.lock_cancelled();
    if *cancelled {
        return false;
    }
    if shared.ticking.load(Ordering::SeqCst) {
        shared.elapsed.fetch_add(1, Ordering::SeqCst);
    }
    true
}

async fn run_autosave(
    session_id: SessionId,
    task: TaskKind,
    shared: Arc<TimerShared>,
    draft_rx: watch::Receiver<String>,
    store: Arc<dyn DraftStore>,
    period: Duration,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let text = draft_rx.borrow().clone();
        if text.trim().is_empty() {
            continue;
        }

        // 保存回调可能做同步 IO，放到阻塞线程池执行
        let job = {
            let session_id = session_id.clone();
            let shared = shared.clone();
            let store = store.clone();
            move || on_autosave(&session_id, task, &shared, store.as_ref(), &text)
        };
        match tokio::task::spawn_blocking(job).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                warn!("⚠️ {} 自动保存任务异常: {}", task, e);
                break;
            }
        }
    }
}

/// 取消标记持有期间调用保存回调，已取消时返回 `false`
fn on_autosave(
    session_id: &SessionId,
    task: TaskKind,
    shared: &TimerShared,
    store: &dyn DraftStore,
    text: &str,
) -> bool {
    let cancelled = shared.lock_cancelled();
    if *cancelled {
        return false;
    }
    store.save_draft(session_id, task, text);
    debug!("💾 {} 自动保存 ({} 字符)", task, text.chars().count());
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    type Saved = Arc<Mutex<Vec<(TaskKind, String)>>>;

    fn recording_store() -> (Saved, Arc<dyn DraftStore>) {
        let saved: Saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let store: Arc<dyn DraftStore> = Arc::new(move |_: &SessionId, task: TaskKind, text: &str| {
            sink.lock().unwrap().push((task, text.to_string()));
        });
        (saved, store)
    }

    fn start_timer(task: TaskKind, elapsed: u64, store: Arc<dyn DraftStore>) -> DraftTimer {
        DraftTimer::start(
            SessionId::new("s-1"),
            task,
            elapsed,
            TimerSettings::default(),
            store,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn counts_seconds_while_ticking() {
        let (_saved, store) = recording_store();
        let timer = start_timer(TaskKind::Task1, 0, store);

        sleep(Duration::from_millis(3500)).await;
        assert_eq!(timer.elapsed_seconds(), 3);

        timer.pause_ticking();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.elapsed_seconds(), 3);

        timer.resume_ticking();
        sleep(Duration::from_secs(2)).await;
        assert_eq!(timer.elapsed_seconds(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn autosaves_non_empty_draft_on_interval() {
        let (saved, store) = recording_store();
        let timer = start_timer(TaskKind::Task2, 0, store);

        sleep(Duration::from_millis(30_500)).await;
        assert!(saved.lock().unwrap().is_empty(), "empty draft must not be saved");

        timer.update_draft("Some people believe");
        sleep(Duration::from_secs(30)).await;

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0], (TaskKind::Task2, "Some people believe".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_runs_off_the_runtime_thread() {
        let runtime_thread = std::thread::current().id();
        let threads = Arc::new(Mutex::new(Vec::new()));
        let sink = threads.clone();
        let store: Arc<dyn DraftStore> = Arc::new(move |_: &SessionId, _: TaskKind, _: &str| {
            sink.lock().unwrap().push(std::thread::current().id());
        });
        let timer = start_timer(TaskKind::Task1, 0, store);
        timer.update_draft("The chart shows");

        sleep(Duration::from_millis(30_500)).await;

        let threads = threads.lock().unwrap();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], runtime_thread);
        assert_eq!(timer.elapsed_seconds(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_after_cancel() {
        let (saved, store) = recording_store();
        let mut timer = start_timer(TaskKind::Task1, 10, store);
        timer.update_draft("The chart shows");

        sleep(Duration::from_millis(1500)).await;
        timer.cancel();
        let frozen = timer.elapsed_seconds();

        sleep(Duration::from_secs(120)).await;
        assert_eq!(frozen, 11);
        assert_eq!(timer.elapsed_seconds(), frozen);
        assert!(saved.lock().unwrap().is_empty());
        assert!(!timer.save_now("late text"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_timer_cancels_it() {
        let (saved, store) = recording_store();
        {
            let timer = start_timer(TaskKind::Task1, 0, store);
            timer.update_draft("draft");
        }
        sleep(Duration::from_secs(90)).await;
        assert!(saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_now_skips_empty_text() {
        let (saved, store) = recording_store();
        let timer = start_timer(TaskKind::Task1, 0, store);

        assert!(!timer.save_now("   "));
        assert!(timer.save_now("hello"));
        assert_eq!(saved.lock().unwrap().len(), 1);
    }
}
