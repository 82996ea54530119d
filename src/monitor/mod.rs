// src/monitor/mod.rs
//! 监控与诊断模块
mod slowlog;
mod metrics;

use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use std::time::{SystemTime, Duration};
use std::collections::VecDeque;
use dashmap::DashMap;

use crate::config::Config;

pub use slowlog::SlowLog;
pub use metrics::Metrics;

/// 监控系统主结构
#[derive(Clone)]
pub struct Monitor {
    pub slow_log: Arc<SlowLog>,
    pub metrics: Arc<Metrics>,
}

impl Monitor {
    pub fn new(cfg: &Config) -> Self {
        Monitor {
            slow_log: Arc::new(SlowLog::new(
                cfg.slowlog_max_entries,
                Duration::from_millis(cfg.slowlog_threshold_ms),
            )),
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// 慢日志条目
#[derive(Debug, Clone)]
pub struct SlowLogEntry {
    pub timestamp: SystemTime,
    pub duration: Duration,
    pub command: String,
}
