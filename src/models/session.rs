use serde::{Deserialize, Serialize};

/// 后端分配的会话 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 会话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionKind {
    /// 分级测试
    #[default]
    Placement,
    /// 阶段测试
    Progress,
}

impl SessionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Placement => "Placement",
            SessionKind::Progress => "Progress",
        }
    }

    /// 从字符串解析（忽略大小写）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placement" => Some(SessionKind::Placement),
            "progress" => Some(SessionKind::Progress),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 对外暴露的当前步骤
///
/// 只用于展示；实际状态（携带数据）由控制器内部的阶段枚举维护。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Step {
    Intro,
    Task1Loading,
    Task1Editing,
    Task1Submitting,
    Task2Loading,
    Task2Editing,
    Task2Submitting,
    Processing,
    Result,
    Error,
}

impl Step {
    /// 是否正在等待后端
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Step::Task1Loading
                | Step::Task1Submitting
                | Step::Task2Loading
                | Step::Task2Submitting
                | Step::Processing
        )
    }

    /// 是否处于编辑状态
    pub fn is_editing(self) -> bool {
        matches!(self, Step::Task1Editing | Step::Task2Editing)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
