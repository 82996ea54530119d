// src/lib.rs
//! crab-kv 库：protocol / server / engine / expire / monitor / types

pub mod config;    // 配置加载
pub mod error;     // 存储层错误类型
pub mod protocol;  // 命令解析 & 执行
pub mod server;    // HTTP 网络层
pub mod engine;    // 存储引擎门面
pub mod expire;    // 过期策略
pub mod monitor;   // 监控 & 诊断
pub mod types;     // String / Queue 数据结构

pub use engine::Engine;
pub use error::StoreError;
