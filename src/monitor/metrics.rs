// src/monitor/metrics.rs

use super::*;

/// Prometheus 指标名前缀（不能包含 '-'）
const PREFIX: &str = "crab_kv";

#[derive(Debug, Default)]
pub struct Metrics {
    pub command_count: AtomicU64,
    pub error_count: AtomicU64,
    pub command_stats: DashMap<String, u64>,
    pub error_stats: DashMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// 记录一次命令执行；`error` 为错误类别（见 `StoreError::kind`）
    pub fn record_command(&self, command: &str, error: Option<&str>) {
        self.command_count.fetch_add(1, Ordering::Relaxed);
        self.command_stats.entry(command.to_string()).and_modify(|c| *c += 1).or_insert(1);
        if let Some(kind) = error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
            self.error_stats.entry(kind.to_string()).and_modify(|c| *c += 1).or_insert(1);
        }
    }

    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# HELP {}_command_count Total commands processed\n", PREFIX));
        output.push_str(&format!("# TYPE {}_command_count counter\n", PREFIX));
        output.push_str(&format!(
            "{}_command_count {}\n",
            PREFIX,
            self.command_count.load(Ordering::Relaxed)
        ));

        output.push_str(&format!("# HELP {}_error_count Total commands answered with an error\n", PREFIX));
        output.push_str(&format!("# TYPE {}_error_count counter\n", PREFIX));
        output.push_str(&format!(
            "{}_error_count {}\n",
            PREFIX,
            self.error_count.load(Ordering::Relaxed)
        ));

        output.push_str(&format!("# HELP {}_command_stats Command statistics\n", PREFIX));
        output.push_str(&format!("# TYPE {}_command_stats counter\n", PREFIX));
        for entry in self.command_stats.iter() {
            output.push_str(&format!(
                "{}_command_stats{{command=\"{}\"}} {}\n",
                PREFIX,
                entry.key(),
                entry.value()
            ));
        }

        output.push_str(&format!("# HELP {}_error_stats Errors by kind\n", PREFIX));
        output.push_str(&format!("# TYPE {}_error_stats counter\n", PREFIX));
        for entry in self.error_stats.iter() {
            output.push_str(&format!(
                "{}_error_stats{{kind=\"{}\"}} {}\n",
                PREFIX,
                entry.key(),
                entry.value()
            ));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let m = Metrics::new();
        m.record_command("GET", None);
        m.record_command("GET", Some("key_not_found"));
        m.record_command("QPUSH", None);

        assert_eq!(m.command_count.load(Ordering::Relaxed), 3);
        assert_eq!(m.error_count.load(Ordering::Relaxed), 1);
        assert_eq!(*m.command_stats.get("GET").unwrap(), 2);

        let text = m.to_prometheus();
        assert!(text.contains("crab_kv_command_count 3\n"));
        assert!(text.contains("crab_kv_command_stats{command=\"GET\"} 2\n"));
        assert!(text.contains("crab_kv_error_stats{kind=\"key_not_found\"} 1\n"));
    }
}
