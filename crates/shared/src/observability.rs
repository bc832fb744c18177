//! # トレーシング
//!
//! subscriber の初期化と、HTTP リクエストごとのスパン・リクエスト ID。
//! `tower-http` 等への依存は `observability` feature の内側にある。
//!
//! | 環境変数 | 既定値 | |
//! |---|---|---|
//! | `RUST_LOG` | `info,nutrilens=debug` | `EnvFilter` の指定 |
//! | `LOG_FORMAT` | `pretty` | `json` で 1 行 1 イベントの JSON |

/// 既定のフィルタ
pub const DEFAULT_FILTER: &str = "info,nutrilens=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Cloud Logging に取り込む本番向け
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` の値を解釈する
    ///
    /// 未知の値は `Pretty` として扱う。subscriber がまだないので警告は stderr に出す。
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "json" => Self::Json,
            "pretty" | "" => Self::Pretty,
            other => {
                eprintln!("WARNING: LOG_FORMAT={other:?} は不明な値です。pretty で出力します");
                Self::Pretty
            }
        }
    }
}

/// [`init_tracing`] に渡す設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 起動ログに出すサービス名
    pub service_name:   String,
    pub log_format:     LogFormat,
    /// `RUST_LOG` がない場合のフィルタ
    pub default_filter: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }

    /// `LOG_FORMAT` を読んで設定を作る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let format = std::env::var("LOG_FORMAT")
            .map(|value| LogFormat::parse(&value))
            .unwrap_or_default();
        Self::new(service_name, format)
    }
}

/// グローバル subscriber を登録する
///
/// `ErrorLayer` も登録するので、`InfraError` の SpanTrace にスパンが載る。
/// プロセスで一度だけ呼ぶ。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let output = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "トレーシングを初期化しました"
    );
}

#[cfg(feature = "observability")]
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// リクエスト ID を UUID v7 で採番する
///
/// `SetRequestIdLayer::x_request_id(MakeRequestUuidV7)` で使う。
/// 呼び出し元が `x-request-id` を付けてきた場合はその値が使われる。
#[cfg(feature = "observability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

#[cfg(feature = "observability")]
impl tower_http::request_id::MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        http::HeaderValue::from_str(&uuid::Uuid::now_v7().to_string())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

/// `TraceLayer::make_span_with` に渡すリクエストスパン
///
/// クエリ文字列は記録しない。`SetRequestIdLayer` より内側で使うこと。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
