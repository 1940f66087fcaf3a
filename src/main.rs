use clap::Parser;
use scriptagher::app_constants::defaults::DEFAULT_LOG_LEVEL;
use scriptagher::cli::{Cli, CommandHandler};
use std::process;
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: Option<&str>) {
    // 显式 --log-level 优先于 RUST_LOG
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };

    // 日志写到 stderr，stdout 只留给命令输出
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.global.log_level.as_deref());

    let handler = match CommandHandler::new(&cli.global) {
        Ok(handler) => handler,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = handler.handle_command(cli.command).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
