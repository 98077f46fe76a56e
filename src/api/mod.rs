pub mod overlay_api;
