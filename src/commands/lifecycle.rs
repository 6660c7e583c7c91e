use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::config::{Config, ServerConfig};
use crate::models::SupervisionRequest;
use crate::services::SystemSupervisor;
use crate::state::ServerState;

/// 按声明顺序启动所有服务，任何一个未就绪即中止
pub async fn start_all(supervisor: &SystemSupervisor, config: &Config) -> Result<()> {
    let servers: Vec<&ServerConfig> = config.enabled_servers().collect();
    if servers.is_empty() {
        log::warn!("No enabled servers in the configuration, nothing to start");
        return Ok(());
    }

    for server in &servers {
        start_server(supervisor, server).await?;
    }

    print_banner(&servers);
    Ok(())
}

pub async fn start_server(supervisor: &SystemSupervisor, server: &ServerConfig) -> Result<()> {
    let state = supervisor
        .ensure_started(server)
        .await
        .with_context(|| format!("Failed to start {}", server.name))?;

    match state {
        ServerState::Ready => Ok(()),
        state => bail!(
            "{} ended {} waiting for {}; inspect it and run `geostack stop-server {}` before retrying",
            server.name,
            state,
            server.health_url,
            server.name
        ),
    }
}

/// 按声明顺序停止（GeoServer 在前）
pub async fn stop_all(supervisor: &SystemSupervisor, config: &Config) -> Result<()> {
    let servers: Vec<&ServerConfig> = config.enabled_servers().collect();
    supervisor.stop_all(&servers).await.context("Failed to stop the stack")?;
    log::info!("All servers stopped");
    Ok(())
}

/// 启动所选服务，运行命令，最后停止全部启用的服务
pub async fn run(
    supervisor: &SystemSupervisor,
    config: &Config,
    names: &[String],
    command: &[String],
) -> Result<()> {
    let stop: Vec<&ServerConfig> = config.enabled_servers().collect();
    let start: Vec<&ServerConfig> = if names.is_empty() {
        stop.clone()
    } else {
        names
            .iter()
            .map(|name| config.server(name))
            .collect::<crate::error::Result<Vec<_>>>()?
    };

    let command = command.join(" ");
    supervisor
        .run_supervised(&start, &stop, &command)
        .await
        .with_context(|| format!("Supervised run of `{}` failed", command))?;
    log::info!("`{}` finished and the stack is stopped", command);
    Ok(())
}

pub async fn stop_server(supervisor: &SystemSupervisor, server: &ServerConfig) -> Result<()> {
    supervisor
        .ensure_server_stopped(server)
        .await
        .with_context(|| format!("Failed to stop {}", server.name))?;
    Ok(())
}

pub async fn kill(
    supervisor: &SystemSupervisor,
    name: &str,
    filter: &str,
    timeout: Duration,
) -> Result<()> {
    let request = SupervisionRequest::new(name, filter).with_timeout(timeout);
    supervisor.ensure_stopped(&request).await?;
    log::info!("No {} process filtered by '{}' is running", name, filter);
    Ok(())
}

fn print_banner(servers: &[&ServerConfig]) {
    println!("╔═══════════════════════════════════════════════════════════╗");
    println!("║      GeoStack is now available                            ║");
    println!("╚═══════════════════════════════════════════════════════════╝");
    println!();
    for server in servers {
        println!("  {:<12} {}", server.name, server.health_url);
    }
    println!();
    println!("💡 Stop everything with: geostack stop");
    println!("═══════════════════════════════════════════════════════════");
}
