// src/server.rs
//! 这是 crab-kv 服务的网络层：
//! - 基于 warp 提供 HTTP 服务
//! - POST /         请求体 {"command": "..."}，调度到 protocol 执行
//! - GET  /health   存活检查
//! - GET  /metrics  Prometheus 文本格式的指标
//! - GET  /slowlog  慢命令日志（JSON 数组，最新在前）
//! - 以 {"value"} / {"message"} / {"error"} 形式回复，错误统一 400
use anyhow::{Context, Result};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use warp::{
    http::StatusCode,
    hyper::body::Bytes,
    Filter, Reply as _,
};

use crate::config::Config;
use crate::engine::Engine;
use crate::monitor::Monitor;
use crate::protocol::{self, Reply};

/// 请求体上限
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// 客户端请求体
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// 每个请求共享的状态（只是几份 Arc 的克隆）
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub monitor: Monitor,
    pub metrics_enabled: bool,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, cfg: &Config) -> Self {
        AppState {
            engine,
            monitor: Monitor::new(cfg),
            metrics_enabled: cfg.metrics_enabled,
        }
    }
}

/// 启动 HTTP 服务，直到收到 Ctrl-C
pub async fn start(cfg: &Config, engine: Arc<Engine>) -> Result<()> {
    let addr: SocketAddr = cfg
        .listen_addr()
        .parse()
        .with_context(|| format!("invalid listen address '{}'", cfg.listen_addr()))?;

    let state = AppState::new(engine, cfg);
    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(%bound, "crab-kv server listening");
    server.await;
    info!("server stopped");
    Ok(())
}

/// 全部路由，测试里直接配合 `warp::test` 使用
pub fn routes(
    state: AppState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let command = warp::post()
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(handle_command)
        .recover(handle_body_rejection)
        .unify();

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&Reply::Message("OK".to_string())).into_response());

    let metrics = warp::get()
        .and(warp::path("metrics"))
        .and(warp::path::end())
        .and(with_state(state.clone()))
        .and_then(handle_metrics);

    let slowlog = warp::get()
        .and(warp::path("slowlog"))
        .and(warp::path::end())
        .and(with_state(state))
        .map(|state: AppState| warp::reply::json(&state.monitor.slow_log.get_logs()).into_response());

    command
        .or(health)
        .unify()
        .or(metrics)
        .unify()
        .or(slowlog)
        .unify()
        .with(warp::trace::request())
}

fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// 单个命令请求的处理逻辑
/// - 解析 JSON 请求体
/// - 调 protocol 解析 & 执行
/// - 记录指标和慢日志
/// - 回复 JSON，错误时 400
async fn handle_command(body: Bytes, state: AppState) -> Result<warp::reply::Response, Infallible> {
    let reply = match serde_json::from_slice::<CommandRequest>(&body) {
        Ok(req) => dispatch(&req.command, &state).await,
        Err(e) => {
            warn!(error = %e, "malformed request body");
            state.monitor.metrics.record_command("INVALID", Some("invalid_argument"));
            Reply::Error(format!("invalid request body: {}", e))
        }
    };

    Ok(reply_response(&reply))
}

fn reply_response(reply: &Reply) -> warp::reply::Response {
    let status = if reply.is_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::OK
    };
    warp::reply::with_status(warp::reply::json(reply), status).into_response()
}

/// 请求体过大 / 缺少 Content-Length 时，同样回复 {"error"} + 400；
/// 其它拒绝原样交给后面的路由
async fn handle_body_rejection(err: warp::Rejection) -> Result<warp::reply::Response, warp::Rejection> {
    let msg = if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        format!("invalid request body: larger than {} bytes", MAX_BODY_BYTES)
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        "invalid request body: Content-Length header required".to_string()
    } else {
        return Err(err);
    };
    warn!(error = %msg, "rejected request body");
    Ok(reply_response(&Reply::Error(msg)))
}

async fn dispatch(line: &str, state: &AppState) -> Reply {
    let metrics = &state.monitor.metrics;

    let cmd = match protocol::parse(line) {
        Ok(cmd) => cmd,
        Err(e) => {
            debug!(error = %e, "rejected command");
            metrics.record_command("INVALID", Some(e.kind()));
            return e.into();
        }
    };

    let name = cmd.name();
    let blocking = cmd.is_blocking();
    let started = Instant::now();
    let result = protocol::run(cmd, &state.engine).await;

    // BQPOP 本来就会阻塞，不算慢命令
    if !blocking {
        state.monitor.slow_log.add_entry(line, started.elapsed());
    }
    metrics.record_command(name, result.as_ref().err().map(|e| e.kind()));

    result.unwrap_or_else(Reply::from)
}

async fn handle_metrics(state: AppState) -> Result<warp::reply::Response, Infallible> {
    if !state.metrics_enabled {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }
    let body = state.monitor.metrics.to_prometheus();
    Ok(warp::reply::with_header(body, "content-type", "text/plain; version=0.0.4").into_response())
}
