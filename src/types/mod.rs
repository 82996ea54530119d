// src/types/mod.rs
//! 数据结构：带 TTL 的 String，以及支持阻塞 pop 的 Queue

pub mod queue;
pub mod string;

pub use queue::QueueStore;
pub use string::{ScalarStore, SetCondition};
