// Static asset server: axum handler, range resolution, compression and its cache.

pub mod cache;
pub mod compress;
pub mod handler;
pub mod range;
pub mod stats;
