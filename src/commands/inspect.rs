use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::{ProcessRecord, ReadinessProbe};
use crate::services::SystemSupervisor;

#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub name: String,
    pub enabled: bool,
    pub is_running: bool,
    pub health_url: String,
    pub processes: Vec<ProcessRecord>,
}

impl ServerStatus {
    fn new(name: &str, enabled: bool, health_url: &str, processes: Vec<ProcessRecord>) -> Self {
        Self {
            name: name.to_string(),
            enabled,
            is_running: !processes.is_empty(),
            health_url: health_url.to_string(),
            processes,
        }
    }
}

pub fn status(supervisor: &SystemSupervisor, config: &Config, json: bool) -> Result<()> {
    let mut statuses = Vec::with_capacity(config.servers.len());
    for server in &config.servers {
        let processes = supervisor.running(&server.supervision_request())?;
        statuses.push(ServerStatus::new(&server.name, server.enabled, &server.health_url, processes));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else {
        print!("{}", render_status(&statuses));
    }
    Ok(())
}

pub fn render_status(statuses: &[ServerStatus]) -> String {
    let mut out = String::new();
    for status in statuses {
        let state = match (status.is_running, status.enabled) {
            (true, _) => format!("running ({} process(es))", status.processes.len()),
            (false, true) => "stopped".to_string(),
            (false, false) => "stopped (disabled)".to_string(),
        };
        out.push_str(&format!("{:<12} {:<28} {}\n", status.name, state, status.health_url));
        for record in &status.processes {
            out.push_str(&format!("    {}\n", record.line));
        }
    }
    out
}

pub async fn wait_for(
    supervisor: &SystemSupervisor,
    url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let probe = ReadinessProbe::new(url)
        .with_timeout(timeout)
        .with_interval(interval);

    let outcome = supervisor.wait_until_ready(&probe).await;
    if !outcome.is_ready() {
        bail!("{} did not answer 200 within {:?} ({} probes)", url, timeout, outcome.attempts());
    }
    println!("{} is up ({:?}, {} probes)", url, outcome.elapsed(), outcome.attempts());
    Ok(())
}

pub fn print_config(config: &Config) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
