use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::Path
};
use anyhow::{Context, Result};


/// 进程启动后，从 config.json 中读到的全局配置
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// HTTP 监听端口
    pub port: u16,
    /// 日志级别，RUST_LOG 优先
    pub log_level: String,
    // 监控配置
    pub metrics_enabled: bool,
    pub slowlog_threshold_ms: u64,
    pub slowlog_max_entries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1".to_string(),
            port: 6380,
            log_level: "info".to_string(),
            metrics_enabled: true,
            slowlog_threshold_ms: 10,
            slowlog_max_entries: 128,
        }
    }
}

impl Config {
    /// "addr:port" 形式的监听地址
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// 从指定路径读取并反序列化 JSON 配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    load_or_create(path).map(|(cfg, _)| cfg)
}

/// 同 `load`，额外返回配置文件是否是这次新建的。
/// 不打日志，由调用方在日志初始化之后记录。
pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Config, bool)> {
    let path_ref = path.as_ref();

    // 如果配置文件不存在，创建默认配置
    if !path_ref.exists() {
        let default_cfg = Config::default();
        let default_json = serde_json::to_string_pretty(&default_cfg)?;
        fs::write(path_ref, default_json)
            .with_context(|| format!("Failed to write default config {:?}", path_ref))?;

        return Ok((default_cfg, true));
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read config file {:?}", path_ref))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {:?}", path_ref))?;
    Ok((cfg, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_creates_default() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("config.json");

        let cfg = load(&path)?;
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        // 第二次读取的是刚写出的文件
        assert_eq!(load(&path)?, cfg);
        Ok(())
    }

    #[test]
    fn test_load_or_create_reports_new_file() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("config.json");

        let (cfg, created) = load_or_create(&path)?;
        assert!(created);
        assert_eq!(cfg, Config::default());

        // 文件已存在，不再是新建
        let (_, created) = load_or_create(&path)?;
        assert!(!created);
        Ok(())
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "port": 7000, "metrics_enabled": false }"#)?;

        let cfg = load(&path)?;
        assert_eq!(cfg.port, 7000);
        assert!(!cfg.metrics_enabled);
        assert_eq!(cfg.bind_addr, "127.0.0.1");
        assert_eq!(cfg.listen_addr(), "127.0.0.1:7000");
        Ok(())
    }

    #[test]
    fn test_invalid_json_is_an_error() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("config.json");
        fs::write(&path, "not json")?;

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
        Ok(())
    }
}
