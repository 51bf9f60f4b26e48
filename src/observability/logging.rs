use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initializes the tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().compact())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    tracing::info!("Logging initialized with level: {}", config.level);
}

/// Masks a phone number for logs, keeping country code and the last two
/// digits: `254712345678` -> `254*******78`.
pub fn mask_phone(msisdn: &str) -> String {
    if msisdn.len() <= 5 {
        return "*".repeat(msisdn.len());
    }
    let prefix = &msisdn[..3];
    let suffix = &msisdn[msisdn.len() - 2..];
    format!("{}{}{}", prefix, "*".repeat(msisdn.len() - 5), suffix)
}

/// Masks an account number, keeping only the last four digits.
pub fn mask_account_number(account_number: &str) -> String {
    if account_number.len() <= 4 {
        return "*".repeat(account_number.len());
    }
    format!(
        "{}{}",
        "*".repeat(account_number.len() - 4),
        &account_number[account_number.len() - 4..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("254712345678"), "254*******78");
        assert_eq!(mask_phone("0712"), "****");
    }

    #[test]
    fn test_mask_account_number() {
        assert_eq!(mask_account_number("0001000123"), "******0123");
        assert_eq!(mask_account_number("123"), "***");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!(LogFormat::from("json"), LogFormat::Json);
        assert_eq!(LogFormat::from("COMPACT"), LogFormat::Compact);
        assert_eq!(LogFormat::from("anything"), LogFormat::Pretty);
    }
}
