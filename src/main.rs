use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;
mod models;
mod services;
mod state;

use cli::CommandArgs;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();

    if let Err(e) = commands::run(args).await {
        log::error!("❌ {}", e);
        for cause in e.chain().skip(1) {
            log::error!("     - {}", cause);
        }
        std::process::exit(1);
    }
}
