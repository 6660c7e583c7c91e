use std::time::Duration;

use crate::config::ServerConfig;
use crate::error::{Result, SupervisorError};
use crate::models::{ProcessRecord, ReadinessOutcome, ReadinessProbe, SupervisionRequest};
use crate::services::clock::{Clock, TokioClock};
use crate::services::launcher::{Launcher, ProcessLauncher};
use crate::services::process_checker::ProcessMatcher;
use crate::services::process_table::{ProcessTable, SystemTable};
use crate::services::readiness::{self, HttpProber, Prober};
use crate::services::terminator::{SystemTerminator, Terminator};
use crate::state::{Lifecycle, ServerState};

/// 停止循环每轮之间的等待
pub const STOP_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub type SystemSupervisor =
    Supervisor<SystemTable, SystemTerminator, TokioClock, HttpProber, ProcessLauncher>;

/// 组合匹配、终止、启动与就绪探测
pub struct Supervisor<T, K, C, P, L> {
    matcher: ProcessMatcher<T>,
    terminator: K,
    clock: C,
    prober: P,
    launcher: L,
}

impl<T, K, C, P, L> Supervisor<T, K, C, P, L>
where
    T: ProcessTable,
    K: Terminator,
    C: Clock,
    P: Prober,
    L: Launcher,
{
    pub fn new(matcher: ProcessMatcher<T>, terminator: K, clock: C, prober: P, launcher: L) -> Self {
        Self {
            matcher,
            terminator,
            clock,
            prober,
            launcher,
        }
    }

    /// 匹配的进程（只查询，不终止）
    pub fn running(&self, request: &SupervisionRequest) -> Result<Vec<ProcessRecord>> {
        self.matcher.find(&request.name_token, &request.filter_token)
    }

    /// 反复查找并终止匹配进程，直到全部消失或超时
    ///
    /// At least one query is always made, so a zero timeout means a single
    /// check. The loop returns within `timeout + STOP_RETRY_INTERVAL`.
    pub async fn ensure_stopped(&self, request: &SupervisionRequest) -> Result<()> {
        let start = self.clock.now();

        loop {
            let running = self.running(request)?;
            if running.is_empty() {
                return Ok(());
            }

            if self.clock.now().saturating_sub(start) >= request.timeout {
                return Err(SupervisorError::StillRunning {
                    name: request.name_token.clone(),
                    lines: running.into_iter().map(|record| record.line).collect(),
                });
            }

            for record in &running {
                self.terminator.terminate(&request.name_token, record);
            }

            self.clock.sleep(STOP_RETRY_INTERVAL).await;
        }
    }

    pub async fn wait_until_ready(&self, probe: &ReadinessProbe) -> ReadinessOutcome {
        readiness::wait_for(&self.prober, &self.clock, probe).await
    }

    /// 启动服务并等待健康检查通过
    ///
    /// A server that never answers 200 ends in `TimedOut` and is left running
    /// for inspection; nothing is terminated here.
    pub async fn ensure_started(&self, server: &ServerConfig) -> Result<ServerState> {
        let mut lifecycle = Lifecycle::new(&server.name);
        lifecycle.transition(ServerState::Launching)?;

        for hook in &server.before_start {
            self.launcher.run_hook(server, hook)?;
        }

        let pid = self.launcher.spawn(server)?;
        log::info!("Starting {} on {} (process number {})", server.name, server.health_url, pid);

        lifecycle.transition(ServerState::Probing)?;
        let outcome = self.wait_until_ready(&server.readiness_probe()).await;

        if let Some(log_file) = &server.log_file {
            log::info!("The logs are available at {}", log_file);
        }

        if outcome.is_ready() {
            lifecycle.transition(ServerState::Ready)?;
        } else {
            log::warn!(
                "{} never started properly or timed out after {:?}. It may still be running in the background.",
                server.name,
                outcome.elapsed()
            );
            lifecycle.transition(ServerState::TimedOut)?;
        }
        Ok(lifecycle.state())
    }

    pub async fn ensure_server_stopped(&self, server: &ServerConfig) -> Result<ServerState> {
        let mut lifecycle = Lifecycle::new(&server.name);
        lifecycle.transition(ServerState::Stopping)?;

        log::info!("Stopping {} ...", server.name);
        self.ensure_stopped(&server.supervision_request()).await?;

        lifecycle.transition(ServerState::Stopped)?;
        Ok(lifecycle.state())
    }

    /// 依次停止所有服务；某个失败时继续停止其余的，返回第一个错误
    pub async fn stop_all(&self, servers: &[&ServerConfig]) -> Result<()> {
        let mut first_error = None;
        for server in servers {
            if let Err(e) = self.ensure_server_stopped(server).await {
                log::error!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// 启动服务、运行任务，无论结果如何都停止整个栈
    ///
    /// A start or task failure takes precedence over a stop failure in the
    /// returned error; the stop step is attempted either way.
    pub async fn run_supervised(
        &self,
        start: &[&ServerConfig],
        stop: &[&ServerConfig],
        command: &str,
    ) -> Result<()> {
        let outcome = self.start_and_run(start, command).await;
        if let Err(e) = &outcome {
            log::warn!("{}; stopping the stack", e);
        }
        let stopped = self.stop_all(stop).await;
        outcome.and(stopped)
    }

    async fn start_and_run(&self, servers: &[&ServerConfig], command: &str) -> Result<()> {
        for server in servers {
            if self.ensure_started(server).await? != ServerState::Ready {
                return Err(SupervisorError::NotReady {
                    name: server.name.clone(),
                    url: server.health_url.clone(),
                });
            }
        }
        self.launcher.run_task(command)
    }
}
