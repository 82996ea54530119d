// src/error.rs

//! 存储层错误类型
//!
//! 这些错误都是可恢复的、预期内的结果，由调用方（protocol 层）
//! 转换成客户端可见的错误信息，绝不导致进程退出。

/// 存储层结果类型
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// 标量 key 不存在或已过期
    #[error("key not found")]
    KeyNotFound,

    /// 该 key 从未创建过队列
    #[error("queue not found")]
    QueueNotFound,

    /// 队列存在但没有可取的元素（非阻塞 pop）
    #[error("queue is empty")]
    QueueEmpty,

    /// 阻塞 pop 在超时时间内没有收到任何值
    #[error("timed out waiting for queue item")]
    Timeout,

    /// 命令格式错误，只在 protocol 层产生
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn invalid(detail: impl Into<String>) -> Self {
        StoreError::InvalidArgument(detail.into())
    }

    /// 用于监控统计的短名字
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::KeyNotFound => "key_not_found",
            StoreError::QueueNotFound => "queue_not_found",
            StoreError::QueueEmpty => "queue_empty",
            StoreError::Timeout => "timeout",
            StoreError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(StoreError::KeyNotFound.to_string(), "key not found");
        assert_eq!(StoreError::QueueNotFound.to_string(), "queue not found");
        assert_eq!(StoreError::QueueEmpty.to_string(), "queue is empty");
        assert_eq!(
            StoreError::invalid("empty command").to_string(),
            "invalid argument: empty command"
        );
    }
}
