use serde::Deserialize;

/// Root application configuration. Loaded from environment variables with
/// the prefix `PERKS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub spin: SpinConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            coupons: CouponConfig::default(),
            spin: SpinConfig::default(),
        }
    }
}

// ─── Coupon Config ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CouponConfig {
    /// Random characters in a generated coupon code, excluding the prefix.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
}

fn default_code_length() -> usize { 10 }
fn default_code_prefix() -> String { "PW".to_string() }

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            code_prefix: default_code_prefix(),
        }
    }
}

// ─── Spin Config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SpinConfig {
    /// Maximum spin-history rows returned by per-customer listings.
    #[serde(default = "default_history_page_size")]
    pub history_page_size: usize,
}

fn default_history_page_size() -> usize { 50 }

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            history_page_size: default_history_page_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("PERKS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
