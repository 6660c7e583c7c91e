use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Backend, MatchMode};

/// geostack - 启动、探测并停止 GeoServer 与 Web 应用
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// 配置文件（默认 geostack.toml，不存在时使用内置定义）
    #[arg(short, long, env = "GEOSTACK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// 项目根目录，覆盖配置中的 root
    #[arg(short, long, env = "GEOSTACK_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// 进程表来源
    #[arg(long, value_enum, env = "GEOSTACK_BACKEND", global = true)]
    pub backend: Option<Backend>,

    /// 进程匹配策略
    #[arg(long, value_enum, global = true)]
    pub match_mode: Option<MatchMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start every enabled server in order and wait until each is ready
    Start,
    /// Stop every enabled server
    Stop,
    /// Start a single server
    StartServer {
        name: String,
    },
    /// Stop a single server
    StopServer {
        name: String,
    },
    /// Show processes matching each server's stop tokens
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Poll a URL until it answers 200 (exit 1 on timeout)
    WaitFor {
        url: String,
        /// 超时（秒）
        #[arg(short, long, default_value_t = 300)]
        timeout: u64,
        /// 轮询间隔（秒），至少 1
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
    /// Kill processes containing NAME and filtered by FILTER
    Kill {
        name: String,
        filter: String,
        /// 超时（秒）
        #[arg(short, long, default_value_t = 30)]
        timeout: u64,
    },
    /// Start servers, run a command against them, then stop the stack
    Run {
        /// 只启动这些服务（可重复，默认全部启用的服务）
        #[arg(long = "server")]
        servers: Vec<String>,
        /// 要运行的命令，如 `-- python manage.py test`
        #[arg(trailing_var_arg = true, required = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Print the effective configuration
    Config,
}
