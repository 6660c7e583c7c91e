use std::process::{Command, Stdio};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

use crate::config::Backend;
use crate::error::{Result, SupervisorError};
use crate::models::ProcessRecord;

/// 进程表快照来源
///
/// Every call reads the OS afresh; implementations must not cache.
pub trait ProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>>;
}

impl<T: ProcessTable + ?Sized> ProcessTable for &T {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        (**self).snapshot()
    }
}

#[cfg(windows)]
const LISTING_COMMAND: &[&str] = &["tasklist"];
#[cfg(not(windows))]
const LISTING_COMMAND: &[&str] = &["ps", "aux"];

/// 解析进程列表工具的输出，丢弃空行
pub fn parse_listing(text: &str) -> Vec<ProcessRecord> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(ProcessRecord::from_line)
        .collect()
}

/// `ps aux` / `tasklist`
#[derive(Debug, Default, Clone, Copy)]
pub struct PsTable;

impl ProcessTable for PsTable {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let output = Command::new(LISTING_COMMAND[0])
            .args(&LISTING_COMMAND[1..])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| SupervisorError::ProcessTable {
                command: LISTING_COMMAND.join(" "),
                source,
            })?;

        Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// 通过 sysinfo 枚举进程
///
/// Lines are rendered as `<name> <pid> <command line>` so that they read like
/// the listing utility's output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeTable;

impl ProcessTable for NativeTable {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        // Linux 上 sysinfo 会把线程也列为进程，只保留真正的进程
        let mut records: Vec<ProcessRecord> = sys
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let name = process.name().to_string_lossy();
                let cmd = process
                    .cmd()
                    .iter()
                    .map(|s| s.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");

                ProcessRecord {
                    pid: Some(pid.as_u32()),
                    line: format!("{} {} {}", name, pid.as_u32(), cmd).trim_end().to_string(),
                }
            })
            .collect();

        records.sort_by_key(|record| record.pid);
        Ok(records)
    }
}

/// 按配置选择的进程表
#[derive(Debug, Clone, Copy)]
pub enum SystemTable {
    Ps(PsTable),
    Native(NativeTable),
}

impl SystemTable {
    pub fn new(backend: Backend) -> Self {
        match backend {
            Backend::Ps => SystemTable::Ps(PsTable),
            Backend::Native => SystemTable::Native(NativeTable),
        }
    }
}

impl ProcessTable for SystemTable {
    fn snapshot(&self) -> Result<Vec<ProcessRecord>> {
        match self {
            SystemTable::Ps(table) => table.snapshot(),
            SystemTable::Native(table) => table.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_skips_blank_lines() {
        let text = "USER PID %CPU\n\nroot 1 0.0 /sbin/init\n   \nuser 1234 2.0 java -jar geoserver\n";
        let records = parse_listing(text);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].pid, None);
        assert_eq!(records[1].pid, Some(1));
        assert_eq!(records[2].pid, Some(1234));
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_listing("").is_empty());
    }

    #[test]
    fn test_native_table_sees_current_process() {
        let own_pid = std::process::id();
        let records = NativeTable.snapshot().unwrap();
        let own = records.iter().find(|r| r.pid == Some(own_pid)).unwrap();
        assert_eq!(ProcessRecord::from_line(&own.line).pid, Some(own_pid));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_native_table_skips_threads() {
        use std::sync::mpsc;

        let own_pid = std::process::id();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let stop_rx = std::sync::Arc::new(std::sync::Mutex::new(stop_rx));
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let stop_rx = stop_rx.clone();
                std::thread::spawn(move || {
                    let _ = stop_rx.lock().map(|rx| rx.recv_timeout(std::time::Duration::from_secs(10)));
                })
            })
            .collect();

        let thread_ids: Vec<u32> = std::fs::read_dir(format!("/proc/{}/task", own_pid))
            .unwrap()
            .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse().ok())
            .filter(|tid| *tid != own_pid)
            .collect();
        assert!(!thread_ids.is_empty());

        let records = NativeTable.snapshot().unwrap();

        drop(stop_tx);
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(records.iter().any(|r| r.pid == Some(own_pid)));
        for tid in thread_ids {
            assert!(
                !records.iter().any(|r| r.pid == Some(tid)),
                "thread {} listed as a process",
                tid
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_ps_table_sees_current_process() {
        if which::which("ps").is_err() {
            return;
        }
        let own_pid = std::process::id();
        let records = SystemTable::new(Backend::Ps).snapshot().unwrap();
        assert!(records.iter().any(|r| r.pid == Some(own_pid)));
    }
}
