//! 草稿写入服务 - 业务能力层
//!
//! 只负责"把草稿写到文件"能力，不关心流程

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{SessionId, TaskKind};
use crate::services::draft_timer::DraftStore;

/// 草稿写入服务
///
/// 职责：
/// - 将当前草稿覆盖写入 `<folder>/<session>_task1.txt` / `_task2.txt`
/// - 只保存单个任务的草稿
/// - 不关心计时与提交
#[derive(Debug, Clone)]
pub struct DraftWriter {
    folder: PathBuf,
}

impl DraftWriter {
    /// 使用草稿目录创建
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// 草稿文件路径
    pub fn path_for(&self, session_id: &SessionId, task: TaskKind) -> PathBuf {
        self.folder
            .join(format!("{}_{}.txt", session_id, task.path_segment()))
    }

    /// 写入草稿
    ///
    /// # 返回
    /// 返回写入的文件路径
    pub fn write(
        &self,
        session_id: &SessionId,
        task: TaskKind,
        text: &str,
    ) -> AppResult<PathBuf> {
        fs::create_dir_all(&self.folder)
            .map_err(|e| AppError::file(self.folder.display().to_string(), e))?;

        let path = self.path_for(session_id, task);
        fs::write(&path, text).map_err(|e| AppError::file(path.display().to_string(), e))?;

        debug!(
            "写入草稿: 会话 {} | {} | {} 字符",
            session_id,
            task,
            text.chars().count()
        );
        Ok(path)
    }

    /// 读取之前保存的草稿，不存在时返回 `None`
    pub fn read(&self, session_id: &SessionId, task: TaskKind) -> Option<String> {
        fs::read_to_string(self.path_for(session_id, task)).ok()
    }
}

impl DraftStore for DraftWriter {
    fn save_draft(&self, session_id: &SessionId, task: TaskKind, text: &str) {
        if let Err(e) = self.write(session_id, task, text) {
            warn!("⚠️ 草稿保存失败: {}", e);
        }
    }
}
