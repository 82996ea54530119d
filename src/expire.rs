// src/expire.rs

//! 过期策略：只做惰性过期
//!
//! 没有后台清理任务，过期的 entry 只有在下一次被访问时才会被删除。

use std::time::{Duration, Instant};

/// entry 的过期时刻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(Instant),
}

impl Expiry {
    /// 按 TTL 秒数计算过期时刻，0 表示永不过期
    pub fn from_ttl_secs(secs: u64) -> Self {
        if secs == 0 {
            return Expiry::Never;
        }
        match Instant::now().checked_add(Duration::from_secs(secs)) {
            Some(at) => Expiry::At(at),
            // 溢出时等同于永不过期
            None => Expiry::Never,
        }
    }

    /// 过期时刻已到（<= now）即视为过期
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => *at <= now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// 剩余存活时间；永不过期返回 None，已过期返回 Some(0)
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Expiry::Never => None,
            Expiry::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_zero_ttl_never_expires() {
        let e = Expiry::from_ttl_secs(0);
        assert_eq!(e, Expiry::Never);
        assert!(!e.is_expired());
        assert!(e.remaining().is_none());
    }

    #[test]
    fn test_expire_after_ttl() {
        let e = Expiry::from_ttl_secs(1);
        assert!(!e.is_expired());
        let left = e.remaining().unwrap();
        assert!(left <= Duration::from_secs(1));

        // 睡眠 1.1s
        sleep(Duration::from_millis(1100));
        assert!(e.is_expired());
        assert_eq!(e.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_boundary_counts_as_expired() {
        let now = Instant::now();
        assert!(Expiry::At(now).is_expired_at(now));
    }
}
