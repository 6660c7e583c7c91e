pub mod inspect;
pub mod lifecycle;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{Command, CommandArgs};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::services::{
    HttpProber, ProcessLauncher, ProcessMatcher, Supervisor, SystemSupervisor, SystemTable,
    SystemTerminator, TokioClock,
};

/// 读取配置并应用命令行覆盖
pub fn load_config(args: &CommandArgs) -> Result<Config> {
    let (path, explicit) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let mut config = Config::load(&path, explicit)?;
    if let Some(root) = &args.root {
        config.supervisor.root = root.clone();
    }
    if let Some(backend) = args.backend {
        config.supervisor.backend = backend;
    }
    if let Some(mode) = args.match_mode {
        config.supervisor.match_mode = Some(mode);
    }

    Ok(config.resolve()?)
}

pub fn build_supervisor(config: &Config) -> Result<SystemSupervisor> {
    let settings = &config.supervisor;
    let matcher = ProcessMatcher::new(SystemTable::new(settings.backend), settings.match_mode());
    let prober = HttpProber::new(Duration::from_secs(settings.http_timeout_secs))
        .context("Failed to set up the readiness prober")?;

    log::debug!(
        "Process table backend {:?}, match mode {:?}, root {}",
        settings.backend,
        matcher.mode(),
        settings.root.display()
    );

    Ok(Supervisor::new(
        matcher,
        SystemTerminator,
        TokioClock::new(),
        prober,
        ProcessLauncher::new(&settings.root),
    ))
}

pub async fn run(args: CommandArgs) -> Result<()> {
    let config = load_config(&args)?;
    let supervisor = build_supervisor(&config)?;

    match args.command {
        Command::Start => lifecycle::start_all(&supervisor, &config).await,
        Command::Stop => lifecycle::stop_all(&supervisor, &config).await,
        Command::StartServer { name } => {
            lifecycle::start_server(&supervisor, config.server(&name)?).await
        }
        Command::StopServer { name } => {
            lifecycle::stop_server(&supervisor, config.server(&name)?).await
        }
        Command::Kill { name, filter, timeout } => {
            lifecycle::kill(&supervisor, &name, &filter, Duration::from_secs(timeout)).await
        }
        Command::Status { json } => inspect::status(&supervisor, &config, json),
        Command::WaitFor { url, timeout, interval } => {
            inspect::wait_for(
                &supervisor,
                &url,
                Duration::from_secs(timeout),
                Duration::from_secs(interval),
            )
            .await
        }
        Command::Run { servers, command } => {
            lifecycle::run(&supervisor, &config, &servers, &command).await
        }
        Command::Config => inspect::print_config(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [supervisor]
            root = "/srv/from-file"
            backend = "ps"
            "#
        )
        .unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let args = CommandArgs::try_parse_from([
            "geostack",
            "--config",
            path.as_str(),
            "--root",
            "/srv/from-cli",
            "--backend",
            "native",
            "status",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.supervisor.root, PathBuf::from("/srv/from-cli"));
        assert_eq!(config.supervisor.backend, crate::config::Backend::Native);
        assert_eq!(
            config.server("geoserver").unwrap().workdir.as_deref(),
            Some("/srv/from-cli/geoserver/data")
        );
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let args = CommandArgs::try_parse_from([
            "geostack",
            "--config",
            "/nonexistent/geostack.toml",
            "status",
        ])
        .unwrap();
        assert!(load_config(&args).is_err());
    }
}
