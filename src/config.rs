use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SupervisorError};
use crate::models::{ReadinessProbe, SupervisionRequest};

pub const DEFAULT_CONFIG_FILE: &str = "geostack.toml";

const ROOT_PLACEHOLDER: &str = "{root}";
const JETTY_RUNNER_JAR: &str = "jetty-runner-8.1.8.v20121106.jar";

/// 进程表来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `ps aux` / `tasklist`
    #[default]
    Ps,
    /// sysinfo
    Native,
}

/// 进程匹配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// name token and filter token must both appear in the line
    Filter,
    /// name token alone decides
    Name,
    /// filter token is a regular expression
    Regex,
}

impl MatchMode {
    /// On Windows a single interpreter image hosts several services, so the
    /// name-only rule is kept there; everywhere else the filter decides.
    pub fn platform_default() -> Self {
        if cfg!(windows) {
            MatchMode::Name
        } else {
            MatchMode::Filter
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_http_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_readiness_timeout_secs() -> u64 {
    300
}

fn default_stop_timeout_secs() -> u64 {
    30
}

/// 全局设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// Project root; `{root}` in server definitions expands to it.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub backend: Backend,
    /// Unset means [`MatchMode::platform_default`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_mode: Option<MatchMode>,
    /// Per-request timeout of a single readiness probe.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            backend: Backend::default(),
            match_mode: None,
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl SupervisorSettings {
    pub fn match_mode(&self) -> MatchMode {
        self.match_mode.unwrap_or_else(MatchMode::platform_default)
    }
}

/// 停止时用于定位进程的标记
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopConfig {
    pub process: String,
    pub filter: String,
    #[serde(default = "default_stop_timeout_secs")]
    pub timeout_secs: u64,
}

/// 单个服务定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    /// stdout/stderr of the detached process; discarded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
    pub health_url: String,
    #[serde(default = "default_readiness_timeout_secs")]
    pub readiness_timeout_secs: u64,
    /// Shell commands run to completion before launch.
    #[serde(default)]
    pub before_start: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub stop: StopConfig,
}

impl ServerConfig {
    pub fn supervision_request(&self) -> SupervisionRequest {
        SupervisionRequest::new(&self.stop.process, &self.stop.filter)
            .with_timeout(Duration::from_secs(self.stop.timeout_secs))
    }

    pub fn readiness_probe(&self) -> ReadinessProbe {
        ReadinessProbe::new(&self.health_url)
            .with_timeout(Duration::from_secs(self.readiness_timeout_secs))
    }

    /// 命令行展示
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn expand_root(&mut self, root: &str) {
        let expand = |value: &str| value.replace(ROOT_PLACEHOLDER, root);

        self.program = expand(&self.program);
        self.args = self.args.iter().map(|arg| expand(arg)).collect();
        self.workdir = self.workdir.as_deref().map(expand);
        self.log_file = self.log_file.as_deref().map(expand);
        self.before_start = self.before_start.iter().map(|hook| expand(hook)).collect();
        for value in self.env.values_mut() {
            *value = expand(value);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub supervisor: SupervisorSettings,
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supervisor: SupervisorSettings::default(),
            servers: default_servers(),
        }
    }
}

impl Config {
    /// 读取配置文件
    ///
    /// A missing file is only an error when the path was given explicitly;
    /// otherwise the built-in GeoServer + Django definitions are used.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        if !path.exists() {
            if explicit {
                return Err(SupervisorError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            log::debug!("No {} found, using built-in server definitions", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            SupervisorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::parse(&text).map_err(|e| match e {
            SupervisorError::Config(msg) => {
                SupervisorError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        log::info!("Loaded {} server definitions from {}", config.servers.len(), path.display());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| SupervisorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.supervisor.http_timeout_secs == 0 {
            return Err(SupervisorError::Config(
                "supervisor.http_timeout_secs must be at least 1".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for server in &self.servers {
            if server.name.trim().is_empty() {
                return Err(SupervisorError::Config("server name must not be empty".to_string()));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(SupervisorError::Config(format!(
                    "server '{}' is defined more than once",
                    server.name
                )));
            }
            if server.stop.process.is_empty() {
                return Err(SupervisorError::Config(format!(
                    "server '{}' needs a non-empty stop.process token",
                    server.name
                )));
            }
        }
        Ok(())
    }

    /// 将 root 转为绝对路径并展开 `{root}`
    pub fn resolve(mut self) -> Result<Self> {
        let root = if self.supervisor.root.is_absolute() {
            self.supervisor.root.clone()
        } else {
            std::env::current_dir()
                .map_err(|e| SupervisorError::Config(format!("cannot resolve project root: {}", e)))?
                .join(&self.supervisor.root)
        };
        let root_str = root.to_string_lossy().into_owned();

        for server in &mut self.servers {
            server.expand_root(&root_str);
        }
        self.supervisor.root = root;
        Ok(self)
    }

    pub fn server(&self, name: &str) -> Result<&ServerConfig> {
        self.servers
            .iter()
            .find(|server| server.name == name)
            .ok_or_else(|| SupervisorError::UnknownServer(name.to_string()))
    }

    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|server| server.enabled)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SupervisorError::Config(e.to_string()))
    }
}

/// 内置的 GeoServer 与 Django 定义；GeoServer 在前，停止顺序同样如此
fn default_servers() -> Vec<ServerConfig> {
    vec![
        ServerConfig {
            name: "geoserver".to_string(),
            enabled: true,
            program: "java".to_string(),
            args: vec![
                "-Xmx512m".to_string(),
                "-XX:MaxPermSize=256m".to_string(),
                "-DGEOSERVER_DATA_DIR={root}/geoserver/data".to_string(),
                // JAI sealed jar issue with the Jetty classloader
                "-Dorg.eclipse.jetty.server.webapp.parentLoaderPriority=true".to_string(),
                "-jar".to_string(),
                format!("{{root}}/downloaded/{}", JETTY_RUNNER_JAR),
                "--log".to_string(),
                "{root}/geoserver/jetty.log".to_string(),
                "{root}/scripts/misc/jetty-runner.xml".to_string(),
            ],
            // GeoNode security only initialises with the data dir as cwd
            workdir: Some("{root}/geoserver/data".to_string()),
            env: BTreeMap::new(),
            log_file: None,
            health_url: "http://localhost:8080/geoserver/".to_string(),
            readiness_timeout_secs: default_readiness_timeout_secs(),
            stop: StopConfig {
                process: "java".to_string(),
                filter: "geoserver".to_string(),
                timeout_secs: default_stop_timeout_secs(),
            },
            before_start: Vec::new(),
        },
        ServerConfig {
            name: "django".to_string(),
            enabled: true,
            program: "python".to_string(),
            args: vec!["manage.py".to_string(), "runserver".to_string()],
            workdir: Some("{root}".to_string()),
            env: BTreeMap::new(),
            log_file: Some("{root}/django.log".to_string()),
            health_url: "http://localhost:8000/".to_string(),
            readiness_timeout_secs: default_readiness_timeout_secs(),
            stop: StopConfig {
                process: "python".to_string(),
                filter: "runserver".to_string(),
                timeout_secs: default_stop_timeout_secs(),
            },
            before_start: vec![
                "python manage.py syncdb --noinput".to_string(),
                "python manage.py loaddata sample_admin.json".to_string(),
            ],
        },
    ]
}
