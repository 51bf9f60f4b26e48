use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing::info;

use banking_core::api::{create_router, AppState};
use banking_core::config::Settings;
use banking_core::events::{NotificationProducer, ProducerConfig};
use banking_core::gateway::{HttpGateway, MobileMoneyAdapter, MobileMoneyGateway};
use banking_core::observability::{init_logging, init_metrics, LogConfig, LogFormat};
use banking_core::reconciliation::{ReconciliationProcessor, ReconciliationScheduler};
use banking_core::repositories::AccountRepository;
use banking_core::services::{
    KafkaNotifier, LedgerService, LogNotifier, Notifier, PaymentEngine, ReversalService,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;

    init_logging(&LogConfig {
        level: settings.application.log_level.clone(),
        format: LogFormat::from(settings.application.log_format.as_str()),
    });
    let metrics_handle = init_metrics();

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // The fee profit account is seeded by migration; refusing to start
    // without it beats silently dropping fee income later.
    let profit_account = AccountRepository::new(pool.clone())
        .find_by_number(&settings.application.profit_account_number)
        .await?
        .ok_or("profit account not found; check application.profit_account_number")?;

    let notifier: Arc<dyn Notifier> = if settings.kafka.enabled {
        Arc::new(KafkaNotifier::new(NotificationProducer::new(ProducerConfig {
            brokers: settings
                .kafka
                .brokers
                .split(',')
                .map(str::to_string)
                .collect(),
            topic: settings.kafka.notification_topic.clone(),
            ..ProducerConfig::default()
        })))
    } else {
        Arc::new(LogNotifier)
    };

    let gateway: Arc<dyn MobileMoneyGateway> = Arc::new(HttpGateway::new(settings.gateway.clone())?);

    let ledger = Arc::new(LedgerService::new(pool.clone(), profit_account.id));
    let payments = Arc::new(PaymentEngine::new(pool.clone(), ledger.clone(), notifier.clone()));
    let reversals = Arc::new(ReversalService::new(pool.clone(), notifier.clone()));
    let mobile_money = Arc::new(MobileMoneyAdapter::new(pool.clone(), gateway.clone()));

    let reconciliation = Arc::new(ReconciliationProcessor::new(
        pool.clone(),
        gateway,
        notifier,
        Duration::from_secs(settings.reconciliation.query_timeout_secs),
        Duration::from_millis(settings.reconciliation.sweep_delay_ms),
    ));

    ReconciliationScheduler::new(
        reconciliation.clone(),
        Duration::from_secs(settings.reconciliation.interval_secs),
        settings.gateway.simulate_completion,
    )
    .spawn();

    let state = AppState {
        pool,
        ledger,
        payments,
        reversals,
        mobile_money,
        reconciliation,
        metrics_handle: Some(metrics_handle),
    };

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let listener =
        tokio::net::TcpListener::bind(("0.0.0.0", settings.application.port)).await?;
    info!("Listening on port {}", settings.application.port);
    axum::serve(listener, app).await?;

    Ok(())
}
