use std::{net::SocketAddr, sync::Arc, time::Duration};

use engine::{LogMailer, Mailer, Notifier, RetryPolicy, TradingSettlement};
use migration::{Migrator, MigratorTrait};
use server::PresenceDirectory;
use settings::Database;

mod mailer;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "granary={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let trading_settlement = TradingSettlement::try_from(settings.dispatch.trading_settlement.as_str())?;
    let db = parse_database(&settings.server.database).await?;

    let presence = Arc::new(PresenceDirectory::default());
    let mut retry = RetryPolicy::default();
    let mailer: Arc<dyn Mailer> = match settings.mail {
        Some(mail) => {
            tracing::info!("Found mail settings...");
            if let Some(max_attempts) = mail.max_attempts {
                retry.max_attempts = max_attempts;
            }
            Arc::new(mailer::HttpMailer::new(
                reqwest::Client::new(),
                mail.relay_url,
                mail.from,
            ))
        }
        None => {
            tracing::warn!("no mail settings, notices will only be logged");
            Arc::new(LogMailer)
        }
    };

    let engine = engine::Engine::builder()
        .database(db)
        .notifier(Notifier::new(mailer, presence.clone()).retry(retry))
        .otp_ttl(Duration::from_secs(settings.otp.ttl_secs))
        .trading_settlement(trading_settlement)
        .build()
        .await?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    tasks.spawn(async move {
        tracing::info!("Found server settings...");
        server::run(engine, presence, addr).await;
    });

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
