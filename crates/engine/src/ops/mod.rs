use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{EngineError, Notifier, ResultEngine, otps::DEFAULT_OTP_TTL};

mod access;
mod catalog;
mod dispatches;
mod inventory;
mod otp;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Which way a verified Trading dispatch moves the source warehouse's stock.
///
/// `Debit` releases the goods from the creator's warehouse, mirroring the
/// source side of an inter-warehouse confirmation. `Credit` adds them
/// instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TradingSettlement {
    #[default]
    Debit,
    Credit,
}

impl TryFrom<&str> for TradingSettlement {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::Validation(format!(
                "invalid trading settlement: {other}"
            ))),
        }
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    notifier: Notifier,
    otp_ttl: chrono::TimeDelta,
    trading_settlement: TradingSettlement,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Notifier,
    otp_ttl: Duration,
    trading_settlement: TradingSettlement,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            notifier: Notifier::default(),
            otp_ttl: DEFAULT_OTP_TTL,
            trading_settlement: TradingSettlement::default(),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Where approval/rejection notices go. Defaults to logging only.
    pub fn notifier(mut self, notifier: Notifier) -> EngineBuilder {
        self.notifier = notifier;
        self
    }

    /// Lifetime of issued passcodes.
    pub fn otp_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.otp_ttl = ttl;
        self
    }

    pub fn trading_settlement(mut self, settlement: TradingSettlement) -> EngineBuilder {
        self.trading_settlement = settlement;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.otp_ttl.is_zero() {
            return Err(EngineError::Validation(
                "otp ttl must be greater than zero".to_string(),
            ));
        }
        let otp_ttl = chrono::TimeDelta::from_std(self.otp_ttl)
            .map_err(|_| EngineError::Validation("otp ttl is out of range".to_string()))?;

        Ok(Engine {
            database: self.database,
            notifier: self.notifier,
            otp_ttl,
            trading_settlement: self.trading_settlement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_parses_case_insensitively() {
        assert_eq!(
            TradingSettlement::try_from("Credit").unwrap(),
            TradingSettlement::Credit
        );
        assert_eq!(
            TradingSettlement::try_from(" debit ").unwrap(),
            TradingSettlement::Debit
        );
        assert!(TradingSettlement::try_from("both").is_err());
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let err = Engine::builder()
            .otp_ttl(Duration::ZERO)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
