use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 就绪探测参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessProbe {
    /// 健康检查 URL
    pub url: String,
    /// 总超时
    pub timeout: Duration,
    /// 轮询间隔
    pub interval: Duration,
}

impl ReadinessProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_READINESS_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// 单次探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// 收到 HTTP 响应
    Status(u16),
    /// 连接失败、超时等传输层错误
    Unreachable(String),
}

/// 轮询结束时的结论；超时不是错误，由调用方决定如何处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReadinessOutcome {
    Ready { attempts: u32, elapsed: Duration },
    TimedOut { attempts: u32, elapsed: Duration },
}

impl ReadinessOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessOutcome::Ready { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            ReadinessOutcome::Ready { attempts, .. } | ReadinessOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            ReadinessOutcome::Ready { elapsed, .. } | ReadinessOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}
