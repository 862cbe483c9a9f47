//! Hive API server binary

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::Router;
use hive_core::{
    BillingWebhook, DevOverrideMailer, HttpMailer, LifecycleServices, LogMailer, Mailer,
};
use hive_db::Repositories;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hive_api::{build_router, AppState, Config, Secrets};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("hive_api=debug".parse()?)
                .add_directive("hive_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hive API");

    let config = Config::from_env()?;
    tracing::info!(http_port = config.http_port, ?config, "Configuration loaded");

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let pool = hive_db::create_pool(&config.database_url).await?;
    hive_db::run_migrations(&pool).await?;
    tracing::info!("Database pool created and migrated");

    let repos = Repositories::postgres(pool.clone());
    let services = LifecycleServices::new(repos, build_mailer(&config), config.lifecycle.clone());

    let state = AppState::new(
        services,
        BillingWebhook::new(config.webhook_secret.clone()),
        Some(pool),
        Secrets {
            cron: config.cron_secret.clone(),
            internal_api: config.internal_api_token.clone(),
        },
        config.request_timeout,
    );

    let app = build_router(state, metrics_handle);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    run_http_server(app, addr).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    let base: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(HttpMailer::new(
            mail.relay_url.clone(),
            mail.api_key.clone(),
            mail.from.clone(),
        )),
        None => {
            tracing::warn!("MAIL_RELAY_URL not set, emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    match &config.dev_email_override {
        Some(to) => {
            tracing::warn!(override_to = %to, "All outgoing email redirected");
            Arc::new(DevOverrideMailer::new(base, to.clone()))
        }
        None => base,
    }
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let service: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
        app.into_make_service_with_connect_info();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Request paths are quick; cron scans and cascades take longer
    let request_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];
    let job_buckets = &[0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("hive_operation_duration_seconds".to_string()),
            request_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("hive_cron_duration_seconds".to_string()),
            job_buckets,
        )?
        .set_buckets_for_metric(
            Matcher::Full("hive_enforcement_duration_seconds".to_string()),
            job_buckets,
        )?;

    let handle = builder.install_recorder()?;

    metrics::describe_counter!(
        "hive_accounts_downgraded_total",
        "Accounts downgraded after the grace period"
    );
    metrics::describe_counter!(
        "hive_enforcement_failures_total",
        "Enforcement candidates that failed or timed out"
    );
    metrics::describe_counter!("hive_groups_deleted_total", "Groups removed by cascade");
    metrics::describe_counter!(
        "hive_member_reset_failures_total",
        "Group members whose active group could not be reset during a cascade"
    );
    metrics::describe_counter!("hive_groups_created_total", "Groups created");
    metrics::describe_counter!(
        "hive_notifications_sent_total",
        "Emails delivered by notification kind"
    );
    metrics::describe_counter!(
        "hive_notifications_failed_total",
        "Emails that failed or timed out by notification kind"
    );
    metrics::describe_counter!(
        "hive_subscriptions_activated_total",
        "Subscriptions activated by tier"
    );
    metrics::describe_counter!(
        "hive_subscriptions_canceled_total",
        "Subscriptions canceled immediately"
    );
    metrics::describe_counter!(
        "hive_access_codes_redeemed_total",
        "Access codes redeemed"
    );
    metrics::describe_counter!(
        "hive_premium_check_errors_total",
        "Premium checks that failed closed"
    );
    metrics::describe_counter!(
        "hive_webhooks_processed_total",
        "Billing webhooks by status"
    );
    metrics::describe_counter!(
        "hive_api_unauthorized_total",
        "Requests rejected by a bearer guard"
    );
    metrics::describe_histogram!(
        "hive_operation_duration_seconds",
        "Operation latency in seconds by operation type"
    );
    metrics::describe_histogram!(
        "hive_cron_duration_seconds",
        "Cron job duration in seconds by job"
    );
    metrics::describe_histogram!(
        "hive_enforcement_duration_seconds",
        "Grace-period enforcement run duration in seconds"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
