// src/engine/mod.rs

//! # 引擎模块
//!
//! `Engine` 把 String 存储和 Queue 存储组合在一个门面后面：
//! - 自身不持有额外状态，只拥有两个 store。
//! - 启动时显式创建一次，通过 `Arc<Engine>` 传给每个请求和每个测试，
//!   不使用进程级全局变量，测试之间互不干扰。
//! - 调用方拿不到任何指向内部结构的引用，所有修改都经过下面的方法。

use std::time::Duration;

use crate::error::Result;
use crate::types::queue::QueueStore;
use crate::types::string::{ScalarStore, SetCondition};

#[derive(Debug, Default)]
pub struct Engine {
    strings: ScalarStore,
    queues: QueueStore,
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    /// SET：无条件写入，`ttl_secs == 0` 永不过期
    pub fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        self.strings.set(key, value, ttl_secs);
    }

    /// SET ... NX / XX：原子的条件写，返回是否写入
    pub fn set_if(&self, key: &str, value: &str, ttl_secs: u64, condition: SetCondition) -> bool {
        self.strings.compare_and_set(key, value, ttl_secs, condition)
    }

    /// GET：不存在或已过期返回 KeyNotFound
    pub fn get(&self, key: &str) -> Result<String> {
        self.strings.get(key)
    }

    /// 剩余存活时间，None 表示永不过期
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        self.strings.ttl(key)
    }

    /// QPUSH
    pub fn queue_push(&self, key: &str, values: Vec<String>) {
        self.queues.push(key, values);
    }

    /// QPOP
    pub fn queue_pop(&self, key: &str) -> Result<String> {
        self.queues.pop(key)
    }

    /// BQPOP：`timeout_secs == 0` 表示无限等待
    pub async fn blocking_queue_pop(&self, key: &str, timeout_secs: u64) -> Result<String> {
        self.queues
            .blocking_pop(key, Duration::from_secs(timeout_secs))
            .await
    }

    pub fn queue_len(&self, key: &str) -> Option<usize> {
        self.queues.len(key)
    }

    pub fn queue_waiting(&self, key: &str) -> usize {
        self.queues.waiting(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use std::sync::Arc;

    #[test]
    fn test_engines_are_isolated() -> anyhow::Result<()> {
        let a = Engine::new();
        let b = Engine::new();

        a.set("k", "from-a", 0);
        a.queue_push("q", vec!["x".into()]);

        assert_eq!(a.get("k")?, "from-a");
        assert_eq!(b.get("k"), Err(StoreError::KeyNotFound));
        assert_eq!(b.queue_pop("q"), Err(StoreError::QueueNotFound));
        Ok(())
    }

    #[test]
    fn test_strings_and_queues_have_separate_keyspaces() -> anyhow::Result<()> {
        let engine = Engine::new();
        engine.set("same", "scalar", 0);
        engine.queue_push("same", vec!["item".into()]);

        assert_eq!(engine.get("same")?, "scalar");
        assert_eq!(engine.queue_pop("same")?, "item");
        Ok(())
    }

    #[test]
    fn test_set_if() -> anyhow::Result<()> {
        let engine = Engine::new();
        assert!(engine.set_if("k", "v1", 0, SetCondition::IfAbsent));
        assert!(!engine.set_if("k", "v2", 0, SetCondition::IfAbsent));
        assert!(engine.set_if("k", "v3", 0, SetCondition::IfPresent));
        assert_eq!(engine.get("k")?, "v3");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_pop_through_engine() -> anyhow::Result<()> {
        let engine = Arc::new(Engine::new());

        let e = engine.clone();
        let blocked = tokio::spawn(async move { e.blocking_queue_pop("jobs", 5).await });
        while engine.queue_waiting("jobs") == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        engine.queue_push("jobs", vec!["job-1".into()]);

        assert_eq!(blocked.await?, Ok("job-1".to_string()));
        assert_eq!(engine.queue_len("jobs"), Some(0));
        Ok(())
    }
}
