//! 时钟抽象
//!
//! 业务代码通过 `Clock` 取当前时间，测试中使用固定时钟保证结果可复现。

use chrono::{DateTime, Duration, Utc};

/// 系统时钟或固定时钟
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// 当前时间
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// 固定时钟向前拨动，系统时钟无效果
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

/// 测试用固定时间戳 (2023-11-14T22:13:20Z)
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// 测试用固定时间
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or_default()
}

/// 固定在 `fixed_now()` 的时钟
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
