use serde::Deserialize;

/// Inputs supplied by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverlayProps {
    pub company_name: String,
    pub ticker: String,
    #[serde(default = "default_stock_price")]
    pub stock_price: String,
    #[serde(default = "default_day_change_abs")]
    pub day_change_abs: String,
    #[serde(default = "default_day_change_pct")]
    pub day_change_pct: String,
    #[serde(default = "default_accent_color")]
    pub accent_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    /// Play even if the session flag says the overlay already ran.
    #[serde(default)]
    pub force_replay: bool,
}

impl OverlayProps {
    pub fn new(company_name: impl Into<String>, ticker: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ticker: ticker.into(),
            stock_price: default_stock_price(),
            day_change_abs: default_day_change_abs(),
            day_change_pct: default_day_change_pct(),
            accent_color: default_accent_color(),
            background_color: default_background_color(),
            force_replay: false,
        }
    }

    pub fn with_price(mut self, stock_price: impl Into<String>) -> Self {
        self.stock_price = stock_price.into();
        self
    }

    pub fn with_force_replay(mut self, force_replay: bool) -> Self {
        self.force_replay = force_replay;
        self
    }

    /// "+0.12 (+3.64%)"
    pub fn day_change_label(&self) -> String {
        format!("{} ({})", self.day_change_abs, self.day_change_pct)
    }

    pub fn day_change_is_negative(&self) -> bool {
        self.day_change_abs.trim_start().starts_with('-')
    }
}

fn default_stock_price() -> String {
    "$3.42".to_string()
}

fn default_day_change_abs() -> String {
    "+0.12".to_string()
}

fn default_day_change_pct() -> String {
    "+3.64%".to_string()
}

fn default_accent_color() -> String {
    "#00c805".to_string()
}

fn default_background_color() -> String {
    "#0b0b0f".to_string()
}

/// What the host knows about the display at mount time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub prefers_reduced_motion: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            viewport_width: 1440,
            viewport_height: 900,
            prefers_reduced_motion: false,
        }
    }
}
