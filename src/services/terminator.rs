use std::process::{Command, Stdio};

use crate::models::ProcessRecord;

/// 一次终止尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// kill command accepted the identifier
    Signalled(u32),
    /// kill command refused; the process most likely exited already
    AlreadyGone(u32),
    /// the kill command itself could not be run
    CommandFailed(u32),
    /// line carried no identifier
    Skipped,
}

/// 强制结束进程；进程已退出不算错误
pub trait Terminator {
    fn terminate(&self, name: &str, record: &ProcessRecord) -> Termination;
}

impl<K: Terminator + ?Sized> Terminator for &K {
    fn terminate(&self, name: &str, record: &ProcessRecord) -> Termination {
        (**self).terminate(name, record)
    }
}

/// `kill -9 <pid>` / `taskkill /F /PID <pid>`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTerminator;

impl SystemTerminator {
    fn kill_command(pid: u32) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("taskkill");
            command.args(["/F", "/PID", &pid.to_string()]);
            command
        } else {
            let mut command = Command::new("kill");
            command.args(["-9", &pid.to_string()]);
            command
        }
    }
}

impl Terminator for SystemTerminator {
    fn terminate(&self, name: &str, record: &ProcessRecord) -> Termination {
        let Some(pid) = record.pid else {
            log::warn!("No process number in line, skipping: {}", record.line);
            return Termination::Skipped;
        };

        log::info!("Stopping {} (process number {})", name, pid);

        let status = Self::kill_command(pid)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Termination::Signalled(pid),
            Ok(status) => {
                log::debug!("Process {} already gone ({})", pid, status);
                Termination::AlreadyGone(pid)
            }
            Err(e) => {
                log::warn!("Failed to run kill command for process {}: {}", pid, e);
                Termination::CommandFailed(pid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_without_pid_is_skipped() {
        let record = ProcessRecord::from_line("USER PID COMMAND");
        assert_eq!(SystemTerminator.terminate("java", &record), Termination::Skipped);
    }

    #[cfg(unix)]
    #[test]
    fn test_kills_spawned_process() {
        if which::which("kill").is_err() {
            return;
        }
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let record = ProcessRecord::from_line(&format!("geonode {} sleep 30", child.id()));

        let outcome = SystemTerminator.terminate("sleep", &record);
        assert_eq!(outcome, Termination::Signalled(child.id()));

        let status = child.wait().unwrap();
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_process_is_tolerated() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let record = ProcessRecord::from_line(&format!("geonode {} true", pid));
        let outcome = SystemTerminator.terminate("true", &record);
        assert!(matches!(
            outcome,
            Termination::AlreadyGone(p) | Termination::CommandFailed(p) if p == pid
        ));
    }
}
