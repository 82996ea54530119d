// src/types/string.rs

//! String 类型（带 TTL 的标量值）
//!
//! 基于 DashMap 实现：
//! - set key value ttl → 无条件写入，覆盖旧 entry（连同旧 TTL）
//! - get key → 返回 value，或 KeyNotFound（不存在 / 已过期）
//! - compare_and_set → NX / XX 条件写，检查与写入在同一把分片锁内完成
//!
//! 过期是惰性的：读到已过期的 entry 时顺手删掉。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

use crate::error::{Result, StoreError};
use crate::expire::Expiry;

/// 标量 entry
#[derive(Debug, Clone)]
pub struct ScalarEntry {
    pub value: String,
    pub expires_at: Expiry,
}

impl ScalarEntry {
    fn new(value: &str, ttl_secs: u64) -> Self {
        ScalarEntry {
            value: value.to_string(),
            expires_at: Expiry::from_ttl_secs(ttl_secs),
        }
    }
}

/// 条件写模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// NX：只在 key 不存在时写入
    IfAbsent,
    /// XX：只在 key 存在时写入
    IfPresent,
}

#[derive(Debug, Default)]
pub struct ScalarStore {
    entries: DashMap<String, ScalarEntry>,
}

impl ScalarStore {
    pub fn new() -> Self {
        ScalarStore::default()
    }

    /// 写入一个值，已有 entry 整体被替换。
    ///
    /// `ttl_secs == 0` 表示永不过期。负数在 protocol 层就被拒绝了。
    ///
    /// # 示例
    ///
    /// ```ignore
    /// store.set("foo", "bar", 10);
    /// assert_eq!(store.get("foo")?, "bar");
    /// ```
    pub fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        self.entries.insert(key.to_string(), ScalarEntry::new(value, ttl_secs));
    }

    /// 读取一个值。
    ///
    /// # 返回
    /// - Ok(value)          – 键存在且未过期
    /// - Err(KeyNotFound)   – 键不存在，或已过期（此时同时删除该 entry）
    pub fn get(&self, key: &str) -> Result<String> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key).ok_or(StoreError::KeyNotFound)?;
            if !entry.expires_at.is_expired_at(now) {
                return Ok(entry.value.clone());
            }
            // 读锁必须在 remove_if 之前释放
        }
        // 只在仍然过期时删除，避免误删并发写入的新值
        self.entries
            .remove_if(key, |_, e| e.expires_at.is_expired_at(now));
        Err(StoreError::KeyNotFound)
    }

    /// 原子的条件写：检查与写入在同一把锁内完成。
    ///
    /// 已过期的 entry 视为不存在。返回是否写入。
    pub fn compare_and_set(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
        condition: SetCondition,
    ) -> bool {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let live = !occupied.get().expires_at.is_expired();
                let write = match condition {
                    SetCondition::IfAbsent => !live,
                    SetCondition::IfPresent => live,
                };
                if write {
                    occupied.insert(ScalarEntry::new(value, ttl_secs));
                } else if !live {
                    occupied.remove();
                }
                write
            }
            Entry::Vacant(vacant) => match condition {
                SetCondition::IfAbsent => {
                    vacant.insert(ScalarEntry::new(value, ttl_secs));
                    true
                }
                SetCondition::IfPresent => false,
            },
        }
    }

    /// 剩余存活时间：None 表示永不过期
    pub fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key).ok_or(StoreError::KeyNotFound)?;
            if !entry.expires_at.is_expired_at(now) {
                return Ok(entry.expires_at.remaining());
            }
        }
        self.entries
            .remove_if(key, |_, e| e.expires_at.is_expired_at(now));
        Err(StoreError::KeyNotFound)
    }

    /// map 中实际保存的 entry 数（包含尚未被访问的过期 entry）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
