// src/monitor/slowlog.rs

use super::*;
use serde_json::{json, Value};
use std::sync::{Mutex, PoisonError};
use std::time::UNIX_EPOCH;
use tracing::warn;

pub struct SlowLog {
    logs: Mutex<VecDeque<SlowLogEntry>>,
    max_entries: usize,
    slow_threshold: Duration,
}

impl SlowLog {
    pub fn new(max_entries: usize, slow_threshold: Duration) -> Self {
        SlowLog {
            logs: Mutex::new(VecDeque::with_capacity(max_entries)),
            max_entries,
            slow_threshold,
        }
    }

    /// 超过阈值才记录，最新的在最前面
    pub fn add_entry(&self, command: &str, duration: Duration) {
        if duration < self.slow_threshold || self.max_entries == 0 {
            return;
        }
        warn!(command, elapsed_ms = duration.as_millis() as u64, "slow command");

        let mut logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        if logs.len() >= self.max_entries {
            logs.pop_back();
        }
        logs.push_front(SlowLogEntry {
            timestamp: SystemTime::now(),
            duration,
            command: command.to_string(),
        });
    }

    pub fn entries(&self) -> Vec<SlowLogEntry> {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.iter().cloned().collect()
    }

    /// 对外展示用的 JSON 数组，最新在前
    pub fn get_logs(&self) -> Value {
        let logs = self.logs.lock().unwrap_or_else(PoisonError::into_inner);
        logs.iter()
            .enumerate()
            .map(|(i, entry)| {
                json!({
                    "id": i + 1,
                    "timestamp": entry.timestamp
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs())
                        .unwrap_or(0),
                    "duration_ms": entry.duration.as_millis() as u64,
                    "command": entry.command,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
