pub mod api;
pub mod config;
pub mod detect;
pub mod engine;
pub mod server;
pub mod source;
pub mod storage;
pub mod telemetry;
