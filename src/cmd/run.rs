//! `header-filter run` - start the filtering proxy.
//!
//! Loads the config file, builds the filter registry and the Axum router,
//! and serves until SIGTERM / Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderName;

use crate::cli::RunArgs;
use crate::config::model::{Config, DumpTarget};
use crate::config;
use crate::error::HeaderFilterError;
use crate::filter::{DumpSink, FilterRegistry, HeaderFilterLayer, LogSink, StdoutSink};
use crate::logging;
use crate::server::{self, AppState, Stats};

pub async fn execute(args: RunArgs) -> Result<(), HeaderFilterError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let (mut config, config_path) = config::load(args.config.as_deref()).await?;

    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }

    let filter = build_filter_layer(&config)?;
    let upstream =
        url::Url::parse(&config.upstream).map_err(|e| HeaderFilterError::UriParse {
            source: Box::new(e),
        })?;

    let filter_count = filter.registry().filters().len();
    let pattern_count = filter.registry().pattern_count();

    let state = Arc::new(AppState {
        upstream,
        timeout: Duration::from_millis(config.timeout),
        correlation_header: correlation_header(&config)?,
        http_client: server::build_http_client(),
        config_path,
        filter_count,
        pattern_count,
        start_time: Instant::now(),
        stats: Stats::new(),
    });

    let router = server::build_router(Arc::clone(&state), filter, args.max_body);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        upstream = %state.upstream,
        filters = filter_count,
        url_patterns = pattern_count,
        "header-filter started"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    tracing::info!("header-filter stopped");
    Ok(())
}

/// Build the filter layer described by `config`.
pub fn build_filter_layer(config: &Config) -> Result<HeaderFilterLayer, HeaderFilterError> {
    let sink: Arc<dyn DumpSink> = match config.dump_target {
        DumpTarget::Log => Arc::new(LogSink),
        DumpTarget::Stdout => Arc::new(StdoutSink),
    };
    let registry = FilterRegistry::new(config.registrations());

    Ok(HeaderFilterLayer::with_options(
        registry,
        sink,
        correlation_header(config)?,
    ))
}

fn correlation_header(config: &Config) -> Result<HeaderName, HeaderFilterError> {
    config
        .correlation_header
        .parse::<HeaderName>()
        .map_err(|e| HeaderFilterError::ConfigParse {
            path: "correlation_header".into(),
            source: Box::new(e),
        })
}
