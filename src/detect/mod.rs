// Asset type detection: MIME type and caching class per extension.

pub mod mime;
