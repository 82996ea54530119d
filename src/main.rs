// src/main.rs
use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crab_kv::{config, server, Engine};

/// 带过期时间的 KV 与阻塞队列服务
#[derive(Parser, Debug)]
#[command(name = "crab-kv", version, about)]
struct Cli {
    /// 配置文件路径，不存在时自动生成默认配置
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// 覆盖配置中的监听地址
    #[arg(long)]
    bind: Option<String>,

    /// 覆盖配置中的监听端口
    #[arg(short, long)]
    port: Option<u16>,
}

/// RUST_LOG 优先，否则使用配置中的 log_level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut cfg, created) = config::load_or_create(&cli.config)?;
    if let Some(bind) = cli.bind {
        cfg.bind_addr = bind;
    }
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    init_logging(&cfg.log_level);
    if created {
        info!(path = ?cli.config, "config file not found, default config created");
    }
    info!(config = ?cli.config, "starting crab-kv {}", env!("CARGO_PKG_VERSION"));

    // 整个进程只有这一个 engine，显式创建后传给服务层
    let engine = Arc::new(Engine::new());
    server::start(&cfg, engine).await
}
