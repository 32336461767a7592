//! # Routing Service 設定
//!
//! 環境変数から Routing Service サーバーの設定を読み込む。

use std::{env, path::PathBuf};

use docflow_shared::observability::LogFormat;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3100;
const DEFAULT_EVENT_BROADCAST_CAPACITY: usize = 256;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 値の形式が不正
    #[error("{name} の値が不正です: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Routing Service サーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingServiceConfig {
    /// バインドアドレス
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// ログ出力形式
    pub log_format: LogFormat,
    /// アクターディレクトリのシード JSON（未設定なら空のディレクトリで起動）
    pub actor_directory_path: Option<PathBuf>,
    /// UI 更新用 broadcast チャネルの容量
    pub event_broadcast_capacity: usize,
}

impl RoutingServiceConfig {
    /// 環境変数から設定を読み込む
    ///
    /// `.env` の読み込みは呼び出し側（`main`）で行う。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: lookup("ROUTING_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or("ROUTING_PORT", lookup("ROUTING_PORT"), DEFAULT_PORT)?,
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            actor_directory_path: lookup("ACTOR_DIRECTORY_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            event_broadcast_capacity: parse_or(
                "EVENT_BROADCAST_CAPACITY",
                lookup("EVENT_BROADCAST_CAPACITY"),
                DEFAULT_EVENT_BROADCAST_CAPACITY,
            )?,
        })
    }

    /// バインドするアドレス文字列
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
    }
}
