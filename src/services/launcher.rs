use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ServerConfig;
use crate::error::{Result, SupervisorError};

/// 启动服务进程与前置命令
pub trait Launcher {
    /// Runs a pre-start hook to completion.
    fn run_hook(&self, server: &ServerConfig, command: &str) -> Result<()>;
    /// Spawns the server detached and returns its pid without waiting on it.
    fn spawn(&self, server: &ServerConfig) -> Result<u32>;
    /// 在 root 下运行一条命令（如测试套件）直到结束
    fn run_task(&self, command: &str) -> Result<()>;
}

impl<L: Launcher + ?Sized> Launcher for &L {
    fn run_hook(&self, server: &ServerConfig, command: &str) -> Result<()> {
        (**self).run_hook(server, command)
    }

    fn spawn(&self, server: &ServerConfig) -> Result<u32> {
        (**self).spawn(server)
    }

    fn run_task(&self, command: &str) -> Result<()> {
        (**self).run_task(command)
    }
}

/// 以后台进程方式启动，输出重定向到日志文件
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    root: PathBuf,
}

impl ProcessLauncher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn shell(command: &str) -> Command {
        if cfg!(windows) {
            let mut shell = Command::new("cmd");
            shell.args(["/C", command]);
            shell
        } else {
            let mut shell = Command::new("sh");
            shell.args(["-c", command]);
            shell
        }
    }

    fn resolve_program(server: &ServerConfig) -> Result<PathBuf> {
        which::which(&server.program).map_err(|e| SupervisorError::Launch {
            name: server.name.clone(),
            reason: format!(
                "cannot find '{}' ({}); set `program` to its full path in the config",
                server.program, e
            ),
        })
    }

    fn output_target(server: &ServerConfig) -> Result<(Stdio, Stdio)> {
        let Some(log_file) = &server.log_file else {
            return Ok((Stdio::null(), Stdio::null()));
        };

        let open = || -> std::io::Result<(Stdio, Stdio)> {
            let path = Path::new(log_file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok((Stdio::from(file.try_clone()?), Stdio::from(file)))
        };

        open().map_err(|e| SupervisorError::Launch {
            name: server.name.clone(),
            reason: format!("cannot open log file {}: {}", log_file, e),
        })
    }

    /// 运行 shell 命令，失败时返回退出状态描述
    fn run_in_root(&self, command: &str) -> std::result::Result<(), String> {
        let status = Self::shell(command)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| e.to_string())?;

        if !status.success() {
            return Err(status.to_string());
        }
        Ok(())
    }
}

impl Launcher for ProcessLauncher {
    fn run_hook(&self, server: &ServerConfig, command: &str) -> Result<()> {
        log::info!("Running pre-start hook for {}: {}", server.name, command);
        self.run_in_root(command)
            .map_err(|status| SupervisorError::HookFailed { command: command.to_string(), status })
    }

    fn run_task(&self, command: &str) -> Result<()> {
        log::info!("Running {}", command);
        self.run_in_root(command)
            .map_err(|status| SupervisorError::TaskFailed { command: command.to_string(), status })
    }

    fn spawn(&self, server: &ServerConfig) -> Result<u32> {
        let program = Self::resolve_program(server)?;
        let (stdout, stderr) = Self::output_target(server)?;

        let mut command = Command::new(&program);
        command
            .args(&server.args)
            .envs(&server.env)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        if let Some(workdir) = &server.workdir {
            command.current_dir(workdir);
        }
        detach(&mut command);

        log::debug!("Launching {}: {}", server.name, server.command_line());
        let child = command.spawn().map_err(|e| SupervisorError::Launch {
            name: server.name.clone(),
            reason: format!("{}: {}", program.display(), e),
        })?;

        // 不等待子进程，由 stop 路径负责终止
        Ok(child.id())
    }
}

/// 脱离当前进程组，supervisor 退出不影响子进程
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_command: &mut Command) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::StopConfig;
    use std::collections::BTreeMap;

    fn server(program: &str, args: &[&str], log_file: Option<String>) -> ServerConfig {
        ServerConfig {
            name: "fixture".to_string(),
            enabled: true,
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            workdir: None,
            log_file,
            health_url: "http://127.0.0.1:1/".to_string(),
            readiness_timeout_secs: 1,
            before_start: Vec::new(),
            env: BTreeMap::from([("GEOSTACK_FIXTURE".to_string(), "from-env".to_string())]),
            stop: StopConfig {
                process: program.to_string(),
                filter: "fixture".to_string(),
                timeout_secs: 1,
            },
        }
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let launcher = ProcessLauncher::new(".");
        let err = launcher
            .spawn(&server("definitely-not-a-real-program-geostack", &[], None))
            .unwrap_err();
        assert!(matches!(err, SupervisorError::Launch { .. }));
        assert!(err.to_string().contains("full path"));
    }

    #[test]
    fn test_output_goes_to_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("fixture.log");
        let launcher = ProcessLauncher::new(dir.path());

        let config = server(
            "sh",
            &["-c", "echo started $GEOSTACK_FIXTURE"],
            Some(log.to_string_lossy().into_owned()),
        );
        let pid = launcher.spawn(&config).unwrap();
        assert!(pid > 0);

        // 子进程未被等待，轮询日志文件
        let mut contents = String::new();
        for _ in 0..50 {
            contents = std::fs::read_to_string(&log).unwrap_or_default();
            if contents.contains("started") {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
        assert_eq!(contents.trim(), "started from-env");
    }

    #[test]
    fn test_hooks_run_in_root() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(dir.path());
        let config = server("sh", &[], None);

        launcher.run_hook(&config, "touch synced").unwrap();
        assert!(dir.path().join("synced").exists());

        let err = launcher.run_hook(&config, "exit 3").unwrap_err();
        assert!(matches!(err, SupervisorError::HookFailed { ref command, .. } if command == "exit 3"));
    }

    #[test]
    fn test_task_runs_in_root_and_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(dir.path());

        launcher.run_task("echo ok > result.txt").unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("result.txt")).unwrap().trim(), "ok");

        let err = launcher.run_task("exit 2").unwrap_err();
        match err {
            SupervisorError::TaskFailed { command, status } => {
                assert_eq!(command, "exit 2");
                assert!(status.contains('2'));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
