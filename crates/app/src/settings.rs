//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden with `GRANARY__*` environment
//! variables (e.g. `GRANARY__SERVER__PORT=8080`).
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// HTTP mail relay. Without it, notices are only logged.
#[derive(Debug, Deserialize)]
pub struct Mail {
    pub relay_url: String,
    pub from: String,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Otp {
    pub ttl_secs: u64,
}

impl Default for Otp {
    fn default() -> Self {
        Self {
            ttl_secs: engine::DEFAULT_OTP_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Dispatch {
    pub trading_settlement: String,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            trading_settlement: "debit".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub mail: Option<Mail>,
    #[serde(default)]
    pub otp: Otp,
    #[serde(default)]
    pub dispatch: Dispatch,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("GRANARY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn minimal_settings_use_defaults() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            port = 3000
            database = "memory"
            "#,
        );
        assert!(matches!(settings.server.database, Database::Memory));
        assert!(settings.mail.is_none());
        assert_eq!(settings.otp.ttl_secs, 300);
        assert_eq!(settings.dispatch.trading_settlement, "debit");
    }

    #[test]
    fn sqlite_and_mail_are_parsed() {
        let settings = parse(
            r#"
            [app]
            level = "info"

            [server]
            bind = "0.0.0.0"
            port = 8080
            database = { sqlite = "granary.db" }

            [mail]
            relay_url = "http://localhost:8025/send"
            from = "dispatch@granary.test"

            [dispatch]
            trading_settlement = "credit"
            "#,
        );
        assert!(matches!(settings.server.database, Database::Sqlite(ref path) if path == "granary.db"));
        assert_eq!(settings.mail.unwrap().max_attempts, None);
        assert_eq!(settings.dispatch.trading_settlement, "credit");
    }
}
