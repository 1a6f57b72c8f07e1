use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use credit_meter::{auth, charge, config::Config, handlers, scheduler, state::AppState, store::LedgerStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("credit_meter=debug,tower_http=debug")),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env();
    tracing::info!(
        port = config.server_port,
        reservation_ttl_seconds = config.reservation_ttl_seconds,
        sweep_interval_seconds = config.sweep_interval_seconds,
        broker_url = ?config.broker_url,
        "starting credit-meter"
    );

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = LedgerStore::new(pool);
    let state = AppState { store: store.clone() };

    tokio::spawn(scheduler::run(store, config.clone()));

    let metered = Router::new()
        .route("/echo", get(handlers::echo))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            charge::charge_one_credit,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/wallets", post(handlers::create_wallet))
        .route("/wallets/:id", get(handlers::get_wallet))
        .route("/wallets/:id/topup", post(handlers::top_up_wallet))
        .route("/balance", get(handlers::balance))
        .merge(metered)
        .layer(middleware::from_fn_with_state(state.clone(), auth::attach_wallet))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
