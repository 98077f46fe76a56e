use std::path::Path;

/// Caching and streaming behaviour shared by a family of extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Html,
    Font,
    Image,
    /// Audio/video, served with byte ranges.
    Media,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetKind {
    pub content_type: &'static str,
    pub class: AssetClass,
}

impl AssetKind {
    pub fn is_streamable(&self) -> bool {
        self.class == AssetClass::Media
    }

    /// Text-like payloads worth compressing.
    pub fn is_compressible(&self) -> bool {
        let ct = self.content_type;
        ct.starts_with("text/")
            || ct.starts_with("application/javascript")
            || ct.starts_with("application/json")
            || ct.starts_with("application/manifest+json")
            || ct.starts_with("application/xml")
            || ct == "application/wasm"
            || ct == "image/svg+xml"
    }

    pub fn cache_control(&self) -> &'static str {
        match self.class {
            AssetClass::Html => "no-cache",
            AssetClass::Font | AssetClass::Image => "public, max-age=31536000, immutable",
            AssetClass::Media | AssetClass::Other => "public, max-age=3600",
        }
    }
}

/// Detect content type and class from the file extension (case-insensitive).
pub fn detect_asset(path: &Path) -> AssetKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let (content_type, class) = match ext.as_str() {
        "html" | "htm" => ("text/html; charset=utf-8", AssetClass::Html),
        "css" => ("text/css; charset=utf-8", AssetClass::Other),
        "js" | "mjs" => ("application/javascript; charset=utf-8", AssetClass::Other),
        "json" | "map" => ("application/json", AssetClass::Other),
        "webmanifest" => ("application/manifest+json", AssetClass::Other),
        "txt" => ("text/plain; charset=utf-8", AssetClass::Other),
        "xml" => ("application/xml", AssetClass::Other),
        "wasm" => ("application/wasm", AssetClass::Other),

        "woff" => ("font/woff", AssetClass::Font),
        "woff2" => ("font/woff2", AssetClass::Font),
        "ttf" => ("font/ttf", AssetClass::Font),
        "otf" => ("font/otf", AssetClass::Font),

        "png" => ("image/png", AssetClass::Image),
        "jpg" | "jpeg" => ("image/jpeg", AssetClass::Image),
        "gif" => ("image/gif", AssetClass::Image),
        "webp" => ("image/webp", AssetClass::Image),
        "avif" => ("image/avif", AssetClass::Image),
        "svg" => ("image/svg+xml", AssetClass::Image),
        "ico" => ("image/x-icon", AssetClass::Image),

        "mp4" | "m4v" => ("video/mp4", AssetClass::Media),
        "webm" => ("video/webm", AssetClass::Media),
        "mov" => ("video/quicktime", AssetClass::Media),
        "ogv" => ("video/ogg", AssetClass::Media),
        "mp3" => ("audio/mpeg", AssetClass::Media),
        "m4a" => ("audio/mp4", AssetClass::Media),
        "wav" => ("audio/wav", AssetClass::Media),
        "ogg" => ("audio/ogg", AssetClass::Media),

        _ => ("application/octet-stream", AssetClass::Other),
    };

    AssetKind {
        content_type,
        class,
    }
}
