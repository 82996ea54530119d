// src/protocol.rs

//! 协议层：文本命令 → 类型化的 Command → Engine → Reply
//!
//! 支持的命令（命令名与选项大小写不敏感）：
//! - SET <key> <value> [EX<seconds>] [NX|XX]
//! - GET <key>
//! - QPUSH <key> <value> [value ...]
//! - QPOP <key>
//! - BQPOP <key> <timeout_seconds>
//!
//! 参数错误统一以 `StoreError::InvalidArgument` 表示，不会进入 store。

use serde::Serialize;
use tracing::debug;

use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::types::string::SetCondition;

/// 解析后的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set {
        key: String,
        value: String,
        ttl_secs: u64,
        condition: Option<SetCondition>,
    },
    Get {
        key: String,
    },
    QPush {
        key: String,
        values: Vec<String>,
    },
    QPop {
        key: String,
    },
    BqPop {
        key: String,
        timeout_secs: u64,
    },
}

impl Command {
    /// 命令名，用于日志和监控
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::QPush { .. } => "QPUSH",
            Command::QPop { .. } => "QPOP",
            Command::BqPop { .. } => "BQPOP",
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Command::BqPop { .. })
    }
}

/// 命令执行结果，序列化后就是 JSON 响应体：
/// `{"value": ..}` / `{"message": ..}` / `{"error": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Value(String),
    Message(String),
    Error(String),
}

impl Reply {
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl From<StoreError> for Reply {
    fn from(err: StoreError) -> Self {
        Reply::Error(err.to_string())
    }
}

/// 把一行命令文本解析成 Command
pub fn parse(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = parts.first() else {
        return Err(StoreError::invalid("empty command"));
    };

    let cmd = first.to_uppercase();
    match cmd.as_str() {
        "SET" => parse_set(&parts),
        "GET" => {
            if parts.len() != 2 {
                return Err(wrong_args("GET"));
            }
            Ok(Command::Get { key: parts[1].to_string() })
        }
        "QPUSH" => {
            if parts.len() < 3 {
                return Err(wrong_args("QPUSH"));
            }
            Ok(Command::QPush {
                key: parts[1].to_string(),
                values: parts[2..].iter().map(|s| s.to_string()).collect(),
            })
        }
        "QPOP" => {
            if parts.len() != 2 {
                return Err(wrong_args("QPOP"));
            }
            Ok(Command::QPop { key: parts[1].to_string() })
        }
        "BQPOP" => {
            if parts.len() != 3 {
                return Err(wrong_args("BQPOP"));
            }
            let timeout_secs = parse_secs(parts[2])
                .ok_or_else(|| StoreError::invalid("timeout is not a non-negative integer"))?;
            Ok(Command::BqPop {
                key: parts[1].to_string(),
                timeout_secs,
            })
        }
        other => Err(StoreError::invalid(format!("unrecognised command '{}'", other))),
    }
}

/// 只接受纯数字，`u64::from_str` 会放过前导 '+'
fn parse_secs(token: &str) -> Option<u64> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn wrong_args(cmd: &str) -> StoreError {
    StoreError::invalid(format!("wrong number of arguments for '{}'", cmd))
}

/// SET <key> <value> [EX<n>] [NX|XX]
fn parse_set(parts: &[&str]) -> Result<Command> {
    if parts.len() < 3 {
        return Err(wrong_args("SET"));
    }

    let mut ttl_secs = 0u64;
    let mut condition = None;
    for opt in &parts[3..] {
        let upper = opt.to_uppercase();
        match upper.as_str() {
            "NX" | "XX" => {
                let cond = if upper == "NX" {
                    SetCondition::IfAbsent
                } else {
                    SetCondition::IfPresent
                };
                if condition.is_some_and(|c| c != cond) {
                    return Err(StoreError::invalid("NX and XX are mutually exclusive"));
                }
                condition = Some(cond);
            }
            _ => {
                let Some(secs) = upper.strip_prefix("EX") else {
                    return Err(StoreError::invalid(format!("unknown SET option '{}'", opt)));
                };
                // 负数在这里被拒绝，store 本身不做校验
                ttl_secs = parse_secs(secs)
                    .ok_or_else(|| StoreError::invalid("expiry is not a non-negative integer"))?;
            }
        }
    }

    Ok(Command::Set {
        key: parts[1].to_string(),
        value: parts[2].to_string(),
        ttl_secs,
        condition,
    })
}

/// 执行一条已解析的命令
pub async fn run(cmd: Command, engine: &Engine) -> Result<Reply> {
    debug!(command = cmd.name(), "executing");
    match cmd {
        Command::Set { key, value, ttl_secs, condition } => {
            let inserted = match condition {
                None => {
                    engine.set(&key, &value, ttl_secs);
                    true
                }
                Some(cond) => engine.set_if(&key, &value, ttl_secs, cond),
            };
            let msg = if inserted { "Inserted" } else { "Not Inserted" };
            Ok(Reply::Message(msg.to_string()))
        }
        Command::Get { key } => engine.get(&key).map(Reply::Value),
        Command::QPush { key, values } => {
            engine.queue_push(&key, values);
            Ok(Reply::Message("Pushed successfully".to_string()))
        }
        Command::QPop { key } => engine.queue_pop(&key).map(Reply::Value),
        Command::BqPop { key, timeout_secs } => engine
            .blocking_queue_pop(&key, timeout_secs)
            .await
            .map(Reply::Value),
    }
}

/// 解析并执行一行命令；所有错误都折叠成 `Reply::Error`
pub async fn execute(line: &str, engine: &Engine) -> Reply {
    let cmd = match parse(line) {
        Ok(cmd) => cmd,
        Err(e) => return e.into(),
    };
    run(cmd, engine).await.unwrap_or_else(Reply::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(key: &str, value: &str, ttl_secs: u64, condition: Option<SetCondition>) -> Command {
        Command::Set {
            key: key.into(),
            value: value.into(),
            ttl_secs,
            condition,
        }
    }

    #[test]
    fn test_parse_set_variants() -> anyhow::Result<()> {
        assert_eq!(parse("SET foo bar")?, set("foo", "bar", 0, None));
        assert_eq!(parse("SET foo bar EX10")?, set("foo", "bar", 10, None));
        assert_eq!(
            parse("SET foo bar EX10 NX")?,
            set("foo", "bar", 10, Some(SetCondition::IfAbsent))
        );
        assert_eq!(
            parse("set foo bar xx")?,
            set("foo", "bar", 0, Some(SetCondition::IfPresent))
        );
        // 值本身保持原样
        assert_eq!(parse("SET Foo BaR")?, set("Foo", "BaR", 0, None));
        Ok(())
    }

    #[test]
    fn test_parse_set_rejects_bad_input() {
        for line in [
            "SET",
            "SET foo",
            "SET foo bar EX",
            "SET foo bar EX-1",
            "SET foo bar EXabc",
            "SET foo bar EX+5",
            "SET foo bar NX XX",
            "SET foo bar PX10",
        ] {
            assert!(
                matches!(parse(line), Err(StoreError::InvalidArgument(_))),
                "expected '{}' to be rejected",
                line
            );
        }
    }

    #[test]
    fn test_parse_queue_commands() -> anyhow::Result<()> {
        assert_eq!(
            parse("QPUSH foo bar baz")?,
            Command::QPush { key: "foo".into(), values: vec!["bar".into(), "baz".into()] }
        );
        assert_eq!(parse("QPOP foo")?, Command::QPop { key: "foo".into() });
        assert_eq!(
            parse("BQPOP foo 5")?,
            Command::BqPop { key: "foo".into(), timeout_secs: 5 }
        );

        assert!(parse("QPUSH foo").is_err());
        assert!(parse("QPOP").is_err());
        assert!(parse("QPOP foo bar").is_err());
        assert!(parse("BQPOP foo").is_err());
        assert!(parse("BQPOP foo -1").is_err());
        assert!(parse("BQPOP foo soon").is_err());
        assert!(parse("BQPOP foo +5").is_err());
        Ok(())
    }

    #[test]
    fn test_parse_get_and_unknown() -> anyhow::Result<()> {
        assert_eq!(parse("  GET   foo  ")?, Command::Get { key: "foo".into() });
        assert!(parse("GET").is_err());
        assert!(parse("GET foo bar").is_err());
        assert_eq!(parse(""), Err(StoreError::invalid("empty command")));
        assert_eq!(
            parse("DEL foo"),
            Err(StoreError::invalid("unrecognised command 'DEL'"))
        );
        Ok(())
    }

    #[test]
    fn test_reply_serializes_as_envelope() -> anyhow::Result<()> {
        let v = serde_json::to_string(&Reply::Value("bar".into()))?;
        assert_eq!(v, r#"{"value":"bar"}"#);
        let m = serde_json::to_string(&Reply::Message("Inserted".into()))?;
        assert_eq!(m, r#"{"message":"Inserted"}"#);
        let e = serde_json::to_string(&Reply::from(StoreError::KeyNotFound))?;
        assert_eq!(e, r#"{"error":"key not found"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn test_execute_conditional_set() {
        let engine = Engine::new();
        assert_eq!(execute("SET k v XX", &engine).await, Reply::Message("Not Inserted".into()));
        assert_eq!(execute("SET k v NX", &engine).await, Reply::Message("Inserted".into()));
        assert_eq!(execute("SET k w NX", &engine).await, Reply::Message("Not Inserted".into()));
        assert_eq!(execute("SET k w XX", &engine).await, Reply::Message("Inserted".into()));
        assert_eq!(execute("GET k", &engine).await, Reply::Value("w".into()));
    }
}
