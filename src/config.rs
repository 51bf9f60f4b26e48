use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub gateway: GatewaySettings,
    pub reconciliation: ReconciliationSettings,
    pub kafka: KafkaSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub port: u16,
    pub log_level: String,
    /// pretty | json | compact
    pub log_format: String,
    /// Account that accumulates collected fees. Must exist in the accounts
    /// table before any fee-bearing operation runs.
    pub profit_account_number: String,
    pub currency: String,
}

/// Mobile-money gateway connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub short_code: String,
    pub passkey: String,
    pub callback_url: String,
    /// Per-request timeout for gateway HTTP calls.
    pub request_timeout_secs: u64,
    /// Refresh the cached credential this many seconds before it expires.
    pub credential_refresh_margin_secs: u64,
    /// Sandbox-only force-complete of pending requests. Ignored unless the
    /// `simulate-gateway` feature is compiled in.
    #[serde(default)]
    pub simulate_completion: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationSettings {
    /// Interval between periodic reconciliation runs.
    pub interval_secs: u64,
    /// Bound on a single status query so one slow request cannot starve the batch.
    pub query_timeout_secs: u64,
    /// Fixed delay between gateway calls during a batch reversal sweep.
    pub sweep_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KafkaSettings {
    pub brokers: String,
    pub notification_topic: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
