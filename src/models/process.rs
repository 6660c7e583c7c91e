use serde::Serialize;
use std::time::Duration;

/// 停止操作的默认超时
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// 进程表中的一行（每次轮询重新读取，不跨轮缓存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    /// 进程 ID（第二个空白分隔字段）
    pub pid: Option<u32>,
    /// 原始行文本
    pub line: String,
}

impl ProcessRecord {
    /// 解析 `ps aux` / `tasklist` 输出的一行
    ///
    /// Both utilities put the identifier in the second column:
    /// `user 1234 0.0 ...` and `java.exe 1234 Console ...`.
    pub fn from_line(line: &str) -> Self {
        let line = line.trim();
        let pid = line
            .split_whitespace()
            .nth(1)
            .and_then(|field| field.parse::<u32>().ok());

        Self {
            pid,
            line: line.to_string(),
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.line.contains(token)
    }
}

/// 停止请求：进程名 + 过滤串 + 超时
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisionRequest {
    pub name_token: String,
    pub filter_token: String,
    pub timeout: Duration,
}

impl SupervisionRequest {
    pub fn new(name_token: impl Into<String>, filter_token: impl Into<String>) -> Self {
        Self {
            name_token: name_token.into(),
            filter_token: filter_token.into(),
            timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_from_ps_aux_line() {
        let record = ProcessRecord::from_line(
            "geonode  1234  2.1  8.3 4123456 678900 ?  Sl  10:02  1:07 java -jar jetty-runner.jar geoserver\n",
        );
        assert_eq!(record.pid, Some(1234));
        assert!(record.line.ends_with("geoserver"));
    }

    #[test]
    fn test_pid_from_tasklist_line() {
        let record = ProcessRecord::from_line("java.exe                      5120 Console                    1    412,332 K");
        assert_eq!(record.pid, Some(5120));
    }

    #[test]
    fn test_header_and_short_lines_have_no_pid() {
        assert_eq!(ProcessRecord::from_line("USER PID %CPU %MEM").pid, None);
        assert_eq!(ProcessRecord::from_line("lonely").pid, None);
        assert_eq!(ProcessRecord::from_line("").pid, None);
    }

    #[test]
    fn test_request_defaults_to_thirty_seconds() {
        let request = SupervisionRequest::new("java", "geoserver");
        assert_eq!(request.timeout, Duration::from_secs(30));

        let request = request.with_timeout(Duration::from_secs(5));
        assert_eq!(request.timeout, Duration::from_secs(5));
    }
}
