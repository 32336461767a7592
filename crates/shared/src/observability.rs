//! # Observability 基盤
//!
//! トレーシング subscriber の初期化を提供する。
//!
//! - 出力形式は [`LogFormat`] で切り替える（本番は JSON、開発は Pretty）
//! - `RUST_LOG` が未設定のときは [`TracingConfig::default_directive`] を使う
//! - `tracing_error::ErrorLayer` を登録し、インフラ層のエラーに `SpanTrace` を持たせる

/// ワークスペースのクレートを debug で出すデフォルトのフィルタ
pub const DEFAULT_DIRECTIVE: &str = "info,docflow_routing_service=debug,docflow_infra=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（ログ収集基盤向け）
    Json,
    /// 人間が読みやすい形式
    #[default]
    Pretty,
}

impl LogFormat {
    /// 設定値からログ形式を決める
    ///
    /// 大文字小文字と前後の空白は無視する。不明な値は Pretty にフォールバックし、
    /// subscriber の初期化前なので stderr に警告を出す。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" | "" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// サービス名（起動ログの `service` フィールド）
    pub service_name:      String,
    pub log_format:        LogFormat,
    /// `RUST_LOG` 未設定時の EnvFilter ディレクティブ
    pub default_directive: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_directive: DEFAULT_DIRECTIVE.to_string(),
        }
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }
}

/// トレーシングを初期化する
///
/// グローバル subscriber を登録するので、プロセスで 1 回だけ呼ぶ。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_directive.as_str().into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parseは大文字小文字と空白を無視する() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("Pretty"), LogFormat::Pretty);
    }

    #[test]
    fn test_parse_不明な値はprettyにフォールバックする() {
        assert_eq!(LogFormat::parse("yaml"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
    }

    #[test]
    fn test_tracing_configのデフォルトフィルタ() {
        let config = TracingConfig::new("routing-service", LogFormat::Json);

        assert_eq!(config.service_name, "routing-service");
        assert_eq!(config.default_directive, DEFAULT_DIRECTIVE);

        let config = config.with_default_directive("warn");
        assert_eq!(config.default_directive, "warn");
    }
}
