// Integration tests for the AssetServer against a temporary site.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use loadin_engine::config::ServerConfig;
use loadin_engine::server::handler::AssetServer;
use loadin_engine::source::fs_source::FsAssetSource;
use loadin_engine::source::traits::{AssetError, AssetInfo, AssetSource};

const MB: usize = 1024 * 1024;
const VIDEO_SIZE: usize = 3 * MB;

const INDEX_HTML: &str = "<!doctype html><title>home</title>";
const ABOUT_HTML: &str = "<!doctype html><title>about</title>";

/// Generate deterministic media content.
fn generate_video() -> Vec<u8> {
    (0..VIDEO_SIZE).map(|i| (i % 251) as u8).collect()
}

fn app_js() -> String {
    "export const ticker = 'HOOD';\n".repeat(400)
}

fn write(root: &Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}

/// Filesystem source whose files get rewritten by a rebuild right after every read.
struct RebuildingSource {
    inner: FsAssetSource,
}

#[async_trait]
impl AssetSource for RebuildingSource {
    async fn probe(&self, request_path: &str) -> Result<AssetInfo, AssetError> {
        self.inner.probe(request_path).await
    }

    async fn open(
        &self,
        asset: &AssetInfo,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>, AssetError> {
        self.inner.open(asset).await
    }

    async fn read_range(
        &self,
        asset: &AssetInfo,
        start: u64,
        end: u64,
    ) -> Result<Bytes, AssetError> {
        let data = self.inner.read_range(asset, start, end).await?;
        std::fs::File::options()
            .write(true)
            .open(&asset.path)?
            .set_modified(asset.modified + Duration::from_secs(60))?;
        Ok(data)
    }
}

/// Site layout under `<tmp>/public`, with a secret file one level above it.
async fn start_site() -> (tempfile::TempDir, AssetServer) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("public");
    std::fs::create_dir_all(&root).unwrap();

    write(dir.path(), "secret.txt", b"do not serve");
    write(&root, "index.html", INDEX_HTML.as_bytes());
    write(&root, "about/index.html", ABOUT_HTML.as_bytes());
    write(&root, "app.js", app_js().as_bytes());
    write(&root, "small.css", b"body { margin: 0; }");
    write(&root, "fonts/inter.woff2", &[0x77, 0x4f, 0x46, 0x32, 0, 1, 0, 0]);
    write(&root, "logo.png", &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    write(&root, "hero.mp4", &generate_video());
    write(&root, "hello world.txt", b"spaced");

    let config = ServerConfig {
        root,
        port: 0,
        ..ServerConfig::default()
    };
    let server = AssetServer::start(config).await.unwrap();
    (dir, server)
}

/// Send a request line verbatim, bypassing client-side path normalization.
async fn raw_get(server: &AssetServer, target: &str) -> String {
    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        target
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

async fn fetch_brotli(client: &reqwest::Client, url: &str) -> String {
    let resp = client
        .get(url)
        .header("Accept-Encoding", "br")
        .send()
        .await
        .unwrap();
    assert_eq!(header(&resp, "content-encoding"), "br");
    let body = resp.bytes().await.unwrap();
    let mut decoded = String::new();
    brotli::Decompressor::new(&body[..], 4096)
        .read_to_string(&mut decoded)
        .unwrap();
    decoded
}

fn header<'a>(resp: &'a reqwest::Response, name: &str) -> &'a str {
    resp.headers()
        .get(name)
        .map(|v| v.to_str().unwrap())
        .unwrap_or("")
}

#[tokio::test]
async fn test_index_and_directory_resolution() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url_for("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "content-type"), "text/html; charset=utf-8");
    assert_eq!(header(&resp, "cache-control"), "no-cache");
    assert_eq!(resp.text().await.unwrap(), INDEX_HTML);

    for path in ["/about/", "/about"] {
        let resp = client.get(server.url_for(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "path {}", path);
        assert_eq!(resp.text().await.unwrap(), ABOUT_HTML);
    }

    let resp = client
        .get(server.url_for("/hello%20world.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "spaced");

    server.shutdown();
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url_for("/missing.js"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "not found");

    let resp = client
        .get(server.url_for("/fonts/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.shutdown();
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let (_dir, server) = start_site().await;

    for target in ["/../secret.txt", "/%2e%2e/secret.txt", "/about/..%2F..%2Fsecret.txt"] {
        let response = raw_get(&server, target).await;
        assert!(
            response.starts_with("HTTP/1.1 403"),
            "target {} got {}",
            target,
            response.lines().next().unwrap_or("")
        );
        assert!(!response.contains("do not serve"));
    }

    // Any `..` is refused, even when it would not escape the root.
    let resp = reqwest::get(server.url_for("/foo..bar.js")).await.unwrap();
    assert_eq!(resp.status(), 403);

    assert_eq!(server.stats().rejected, 4);
    server.shutdown();
}

#[tokio::test]
async fn test_if_none_match_returns_304() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/app.js");

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), 200);
    let etag = header(&first, "etag").to_string();
    assert!(etag.starts_with("W/\""));

    let resp = client
        .get(&url)
        .header("If-None-Match", &etag)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 304);
    assert_eq!(header(&resp, "etag"), etag);
    assert!(resp.bytes().await.unwrap().is_empty());

    let resp = client
        .get(&url)
        .header("If-None-Match", "\"something-else\"")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    assert_eq!(server.stats().not_modified, 1);
    server.shutdown();
}

#[tokio::test]
async fn test_open_range_serves_one_megabyte_window() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/hero.mp4");
    let expected = generate_video();

    let resp = client
        .get(&url)
        .header("Range", "bytes=0-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(header(&resp, "accept-ranges"), "bytes");
    assert_eq!(
        header(&resp, "content-range"),
        format!("bytes 0-{}/{}", MB - 1, VIDEO_SIZE)
    );
    assert_eq!(header(&resp, "content-type"), "video/mp4");
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.len(), MB);
    assert_eq!(&body[..], &expected[..MB]);

    // Window runs past EOF: stops at the last byte.
    let start = VIDEO_SIZE - MB / 2;
    let resp = client
        .get(&url)
        .header("Range", format!("bytes={}-", start))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        header(&resp, "content-range"),
        format!("bytes {}-{}/{}", start, VIDEO_SIZE - 1, VIDEO_SIZE)
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &expected[start..]);

    assert_eq!(server.stats().partial, 2);
    server.shutdown();
}

#[tokio::test]
async fn test_explicit_and_suffix_ranges() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/hero.mp4");
    let expected = generate_video();

    let resp = client
        .get(&url)
        .header("Range", "bytes=100-199")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        header(&resp, "content-range"),
        format!("bytes 100-199/{}", VIDEO_SIZE)
    );
    assert_eq!(&resp.bytes().await.unwrap()[..], &expected[100..200]);

    let resp = client
        .get(&url)
        .header("Range", "bytes=-10")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(
        &resp.bytes().await.unwrap()[..],
        &expected[VIDEO_SIZE - 10..]
    );

    server.shutdown();
}

#[tokio::test]
async fn test_unsatisfiable_and_malformed_ranges() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/hero.mp4");

    let resp = client
        .get(&url)
        .header("Range", format!("bytes={}-", VIDEO_SIZE))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 416);
    assert_eq!(
        header(&resp, "content-range"),
        format!("bytes */{}", VIDEO_SIZE)
    );

    let resp = client
        .get(&url)
        .header("Range", "bytes=abc-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().len(), VIDEO_SIZE);

    // Ranges only apply to streamable media.
    let resp = client
        .get(server.url_for("/app.js"))
        .header("Range", "bytes=0-9")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("accept-ranges").is_none());
    assert_eq!(resp.bytes().await.unwrap().len(), app_js().len());

    server.shutdown();
}

#[tokio::test]
async fn test_brotli_preferred_and_cached() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/app.js");
    let original = app_js();

    for _ in 0..2 {
        let resp = client
            .get(&url)
            .header("Accept-Encoding", "gzip, br")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(header(&resp, "content-encoding"), "br");
        assert_eq!(header(&resp, "vary"), "accept-encoding");
        let body = resp.bytes().await.unwrap();
        assert!(body.len() < original.len());

        let mut decoded = String::new();
        brotli::Decompressor::new(&body[..], 4096)
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, original);
    }

    let snap = server.stats();
    assert_eq!(snap.compression_misses, 1);
    assert_eq!(snap.compression_hits, 1);
    assert_eq!(server.compression_cache().len(), 1);

    server.shutdown();
}

#[tokio::test]
async fn test_gzip_fallback_and_small_bodies_uncompressed() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(server.url_for("/app.js"))
        .header("Accept-Encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(header(&resp, "content-encoding"), "gzip");
    let body = resp.bytes().await.unwrap();
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(&body[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, app_js());

    // Below the size threshold.
    let resp = client
        .get(server.url_for("/small.css"))
        .header("Accept-Encoding", "gzip, br")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("content-encoding").is_none());
    assert_eq!(resp.text().await.unwrap(), "body { margin: 0; }");

    // Not a text-like type.
    let resp = client
        .get(server.url_for("/hero.mp4"))
        .header("Accept-Encoding", "gzip, br")
        .send()
        .await
        .unwrap();
    assert!(resp.headers().get("content-encoding").is_none());

    server.shutdown();
}

#[tokio::test]
async fn test_modified_file_is_recompressed() {
    let (dir, server) = start_site().await;
    let client = reqwest::Client::new();
    let url = server.url_for("/app.js");

    assert_eq!(fetch_brotli(&client, &url).await, app_js());

    let updated = "export const ticker = 'NEW';\n".repeat(400);
    let path = dir.path().join("public/app.js");
    std::fs::write(&path, &updated).unwrap();
    std::fs::File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    assert_eq!(fetch_brotli(&client, &url).await, updated);
    // The stale entry for the old modification time is gone.
    assert_eq!(server.compression_cache().len(), 1);
    assert_eq!(server.stats().compression_misses, 2);

    server.shutdown();
}

#[tokio::test]
async fn test_cache_control_by_class() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let cases = [
        ("/index.html", "no-cache"),
        ("/fonts/inter.woff2", "public, max-age=31536000, immutable"),
        ("/logo.png", "public, max-age=31536000, immutable"),
        ("/app.js", "public, max-age=3600"),
        ("/hero.mp4", "public, max-age=3600"),
    ];
    for (path, expected) in cases {
        let resp = client.get(server.url_for(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200, "path {}", path);
        assert_eq!(header(&resp, "cache-control"), expected, "path {}", path);
    }

    server.shutdown();
}

#[tokio::test]
async fn test_head_and_other_methods() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let resp = client
        .head(server.url_for("/hero.mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "accept-ranges"), "bytes");
    assert!(resp.bytes().await.unwrap().is_empty());

    // No method checking.
    let resp = client
        .post(server.url_for("/index.html"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), INDEX_HTML);

    assert_eq!(server.stats().requests, 2);
    server.shutdown();
}

#[tokio::test]
async fn test_head_reads_and_compresses_nothing() {
    let (_dir, server) = start_site().await;
    let client = reqwest::Client::new();

    let resp = client
        .head(server.url_for("/hero.mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "content-length"), VIDEO_SIZE.to_string());

    let resp = client
        .head(server.url_for("/app.js"))
        .header("Accept-Encoding", "br")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-encoding").is_none());
    assert_eq!(header(&resp, "content-length"), app_js().len().to_string());
    assert_eq!(header(&resp, "vary"), "accept-encoding");

    let snap = server.stats();
    assert_eq!(snap.bytes_served, 0);
    assert_eq!(snap.compression_misses, 0);
    assert_eq!(server.compression_cache().len(), 0);

    server.shutdown();
}

#[tokio::test]
async fn test_full_body_is_streamed_with_length() {
    let (_dir, server) = start_site().await;

    let resp = reqwest::get(server.url_for("/hero.mp4")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "content-length"), VIDEO_SIZE.to_string());
    let body = resp.bytes().await.unwrap();
    assert_eq!(&body[..], &generate_video()[..]);
    assert_eq!(server.stats().bytes_served, VIDEO_SIZE as u64);

    server.shutdown();
}

#[tokio::test]
async fn test_file_rewritten_during_compression_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app.js", app_js().as_bytes());
    let config = ServerConfig {
        root: dir.path().to_path_buf(),
        port: 0,
        ..ServerConfig::default()
    };
    let source = Arc::new(RebuildingSource {
        inner: FsAssetSource::new(dir.path()),
    });
    let server = AssetServer::start_with_source(source, &config).await.unwrap();
    let client = reqwest::Client::new();
    let url = server.url_for("/app.js");

    for _ in 0..2 {
        assert_eq!(fetch_brotli(&client, &url).await, app_js());
    }

    let snap = server.stats();
    assert_eq!(snap.compression_misses, 2);
    assert_eq!(snap.compression_hits, 0);
    assert!(server.compression_cache().is_empty());

    server.shutdown();
}

