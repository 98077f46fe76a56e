use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Session-storage key guarding against replays within one session.
pub const SESSION_FLAG_KEY: &str = "loadin-overlay-played";

/// Sentinel stored under [`SESSION_FLAG_KEY`] once the overlay has finished.
pub const SESSION_FLAG_VALUE: &str = "1";

/// Random decoy digits shown on each odometer strip before the target digit.
pub const ODOMETER_DECOYS: usize = 10;

/// Default range window for open-ended range requests (1 MB).
pub const DEFAULT_RANGE_WINDOW_BYTES: u64 = 1024 * 1024;

/// Minimum body size before a compressible asset is compressed.
pub const COMPRESSION_MIN_BYTES: u64 = 1024;

/// Port the asset server binds when none is configured.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Viewport breakpoints as (max width exclusive, columns). Widths past the
/// last entry use [`WIDE_VIEWPORT_COLUMNS`].
pub const GRID_BREAKPOINTS: [(u32, u32); 3] = [(640, 6), (1024, 10), (1440, 14)];

pub const WIDE_VIEWPORT_COLUMNS: u32 = 18;

/// Durations driving the load-in overlay phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OverlayTiming {
    /// Hold on the company name before the price starts rolling.
    #[serde(with = "millis")]
    pub intro_hold: Duration,
    /// Scroll time of a single odometer strip.
    #[serde(with = "millis")]
    pub roll_duration: Duration,
    /// Delay added per digit index, left to right.
    #[serde(with = "millis")]
    pub digit_stagger: Duration,
    /// Extra hold after the last digit settles.
    #[serde(with = "millis")]
    pub post_roll_hold: Duration,
    /// How long the day change line stays up.
    #[serde(with = "millis")]
    pub day_change_hold: Duration,
    #[serde(with = "millis")]
    pub text_fade: Duration,
    #[serde(with = "millis")]
    pub fade_buffer: Duration,
    /// Delay per diagonal index of the block wipe.
    #[serde(with = "millis")]
    pub block_stagger: Duration,
    /// Fall time of a single block.
    #[serde(with = "millis")]
    pub block_drop: Duration,
    #[serde(with = "millis")]
    pub block_buffer: Duration,
    /// Fade used instead of the full sequence under reduced motion.
    #[serde(with = "millis")]
    pub reduced_motion_fade: Duration,
}

impl Default for OverlayTiming {
    fn default() -> Self {
        Self {
            intro_hold: Duration::from_millis(1200),
            roll_duration: Duration::from_millis(1400),
            digit_stagger: Duration::from_millis(120),
            post_roll_hold: Duration::from_millis(400),
            day_change_hold: Duration::from_millis(1500),
            text_fade: Duration::from_millis(500),
            fade_buffer: Duration::from_millis(100),
            block_stagger: Duration::from_millis(35),
            block_drop: Duration::from_millis(700),
            block_buffer: Duration::from_millis(150),
            reduced_motion_fade: Duration::from_millis(400),
        }
    }
}

/// Configuration for the development asset server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory served as the site root.
    pub root: PathBuf,
    pub port: u16,
    /// Bodies smaller than this are never compressed.
    pub compression_min_bytes: u64,
    /// Window served for `bytes=N-` range requests.
    pub range_window_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("public"),
            port: DEFAULT_SERVER_PORT,
            compression_min_bytes: COMPRESSION_MIN_BYTES,
            range_window_bytes: DEFAULT_RANGE_WINDOW_BYTES,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
