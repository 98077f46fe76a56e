// Axum request handler: maps request paths to files and answers with ranges, 304s or compressed bodies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use super::cache::CompressionCache;
use super::compress::{compress, negotiate, Encoding};
use super::range::{parse_range_header, ByteRange, ParsedRange};
use super::stats::{ServerStats, StatsSnapshot};
use crate::config::ServerConfig;
use crate::detect::mime::detect_asset;
use crate::source::fs_source::FsAssetSource;
use crate::source::traits::{AssetError, AssetInfo, AssetSource};

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AssetState {
    source: Arc<dyn AssetSource>,
    cache: Arc<CompressionCache>,
    stats: Arc<ServerStats>,
    compression_min_bytes: u64,
    range_window_bytes: u64,
}

impl AssetState {
    pub fn new(source: Arc<dyn AssetSource>, config: &ServerConfig) -> Self {
        Self {
            source,
            cache: Arc::new(CompressionCache::new()),
            stats: Arc::new(ServerStats::new()),
            compression_min_bytes: config.compression_min_bytes,
            range_window_bytes: config.range_window_bytes,
        }
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn cache(&self) -> &CompressionCache {
        &self.cache
    }
}

/// Every path and method is answered by the asset handler.
pub fn router(state: AssetState) -> Router {
    Router::new().fallback(serve_asset).with_state(state)
}

pub struct AssetServer {
    addr: SocketAddr,
    state: AssetState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl AssetServer {
    /// Serve `config.root` from the filesystem on `config.port`.
    pub async fn start(config: ServerConfig) -> Result<Self> {
        let source = Arc::new(FsAssetSource::new(config.root.clone()));
        info!("asset server root={}", config.root.display());
        Self::start_with_source(source, &config).await
    }

    pub async fn start_with_source(
        source: Arc<dyn AssetSource>,
        config: &ServerConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = AssetState::new(source, config);
        let app = router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        info!("asset server listening on http://{}", addr);

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build a URL for a path on this server.
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.state.stats.snapshot()
    }

    pub fn compression_cache(&self) -> &CompressionCache {
        &self.state.cache
    }

    /// Shutdown the server gracefully.
    pub fn shutdown(mut self) {
        let snap = self.state.stats.snapshot();
        info!(
            "asset server stopping requests={} bytes={} not_modified={} partial={} compression_hit_rate={:.2} cached_bytes={}",
            snap.requests,
            snap.bytes_served,
            snap.not_modified,
            snap.partial,
            snap.compression_hit_rate,
            self.state.cache.stored_bytes()
        );
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn serve_asset(
    State(state): State<AssetState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.stats.record_request();
    let request_path = percent_decode(uri.path());

    if request_path.contains("..") {
        debug!("asset traversal rejected path={}", request_path);
        state.stats.record_rejected();
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }

    let asset = match state.source.probe(&request_path).await {
        Ok(asset) => asset,
        Err(e) => return error_response(&state, &request_path, e),
    };

    let kind = detect_asset(&asset.path);
    let etag = asset.etag();

    let mut resp_headers = HeaderMap::new();
    resp_headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(kind.cache_control()),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        resp_headers.insert(header::ETAG, value);
    }

    if etag_matches(&headers, &etag) {
        debug!("asset not modified path={}", request_path);
        state.stats.record_not_modified();
        return (StatusCode::NOT_MODIFIED, resp_headers).into_response();
    }

    resp_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(kind.content_type),
    );

    if kind.is_streamable() {
        resp_headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if kind.is_compressible() {
        resp_headers.insert(header::VARY, HeaderValue::from_static("accept-encoding"));
    }

    // Headers of the identity body; nothing is read or compressed.
    if method == Method::HEAD {
        resp_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.len));
        return (StatusCode::OK, resp_headers).into_response();
    }

    if kind.is_streamable() {
        let range = headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_range_header);
        if let Some(range) = range {
            return serve_range(&state, &request_path, &asset, range, resp_headers).await;
        }
    }

    let encoding = if kind.is_compressible() && asset.len >= state.compression_min_bytes {
        negotiate(
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok()),
        )
    } else {
        None
    };

    if let Some(encoding) = encoding {
        match compressed_body(&state, &request_path, &asset, encoding).await {
            Ok(body) => {
                resp_headers.insert(
                    header::CONTENT_ENCODING,
                    HeaderValue::from_static(encoding.header_value()),
                );
                state.stats.record_served(body.len() as u64);
                return (StatusCode::OK, resp_headers, body).into_response();
            }
            Err(e) => {
                warn!(
                    "compression failed path={} encoding={}: {}",
                    request_path,
                    encoding.header_value(),
                    e
                );
            }
        }
    }

    match state.source.open(&asset).await {
        Ok(reader) => {
            resp_headers.insert(header::CONTENT_LENGTH, HeaderValue::from(asset.len));
            state.stats.record_served(asset.len);
            let body = Body::from_stream(ReaderStream::new(reader));
            (StatusCode::OK, resp_headers, body).into_response()
        }
        Err(e) => error_response(&state, &request_path, e),
    }
}

async fn serve_range(
    state: &AssetState,
    request_path: &str,
    asset: &AssetInfo,
    range: ParsedRange,
    mut resp_headers: HeaderMap,
) -> Response {
    let (start, end) = match range.resolve(asset.len, state.range_window_bytes) {
        ByteRange::Satisfiable { start, end } => (start, end),
        ByteRange::Unsatisfiable => {
            state.stats.record_rejected();
            if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", asset.len)) {
                resp_headers.insert(header::CONTENT_RANGE, value);
            }
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                resp_headers,
                "range not satisfiable",
            )
                .into_response();
        }
    };

    match state.source.read_range(asset, start, end).await {
        Ok(data) => {
            debug!(
                "asset range path={} range=[{}, {}] total={}",
                request_path, start, end, asset.len
            );
            if let Ok(value) =
                HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, asset.len))
            {
                resp_headers.insert(header::CONTENT_RANGE, value);
            }
            state.stats.record_partial();
            state.stats.record_served(data.len() as u64);
            (StatusCode::PARTIAL_CONTENT, resp_headers, data).into_response()
        }
        Err(e) => error_response(state, request_path, e),
    }
}

/// Compressed body from the cache, compressing on a blocking thread on a miss.
async fn compressed_body(
    state: &AssetState,
    request_path: &str,
    asset: &AssetInfo,
    encoding: Encoding,
) -> Result<Bytes, AssetError> {
    if let Some(hit) = state.cache.get(&asset.path, asset.modified, encoding) {
        state.stats.record_compression(true);
        return Ok(hit);
    }
    state.stats.record_compression(false);

    let raw = state.source.read_all(asset).await?;
    let raw_len = raw.len();
    let compressed = tokio::task::spawn_blocking(move || compress(&raw, encoding))
        .await
        .map_err(std::io::Error::other)??;

    let body = Bytes::from(compressed);
    debug!(
        "asset compressed path={} encoding={} bytes={}->{}",
        asset.path.display(),
        encoding.header_value(),
        raw_len,
        body.len()
    );

    // A rebuild may have rewritten the file since it was probed.
    match state.source.probe(request_path).await {
        Ok(current) if current.modified == asset.modified && current.len == asset.len => {
            state
                .cache
                .insert(&asset.path, asset.modified, encoding, body.clone());
        }
        _ => debug!("asset changed while compressing path={}, not cached", request_path),
    }
    Ok(body)
}

fn error_response(state: &AssetState, request_path: &str, err: AssetError) -> Response {
    match err {
        AssetError::Forbidden => {
            state.stats.record_rejected();
            (StatusCode::FORBIDDEN, "forbidden").into_response()
        }
        AssetError::NotFound => {
            debug!("asset not found path={}", request_path);
            state.stats.record_rejected();
            (StatusCode::NOT_FOUND, "not found").into_response()
        }
        AssetError::Io(e) => {
            error!("asset read error path={}: {}", request_path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// `If-None-Match` against our validator, weak comparison, `*` matches anything.
fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let ours = etag.trim_start_matches("W/");
    value
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == ours)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let h1 = bytes[i + 1] as char;
            let h2 = bytes[i + 2] as char;
            if let (Some(a), Some(b)) = (h1.to_digit(16), h2.to_digit(16)) {
                out.push(((a << 4) + b) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
