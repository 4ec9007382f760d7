use std::net::SocketAddr;

use api::{ema_task, routes};
use common::logger;
use common::Config;
use store::{DisconnectResolver, PresenceStore, TtlPolicy};
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use util::state::AppState;
use util::ws::WebSocketManager;

#[tokio::main]
async fn main() {
    let config = Config::init(".env");

    // `common::logger` (log + fern) keeps stdout/file output for `log::`
    // call sites the way the teacher's services emit them; a
    // `tracing-subscriber` fmt layer sits alongside it since `store`,
    // `util`, and this crate's own handlers emit structured `tracing`
    // events instead.
    logger::init_logger(&config.log_level, &config.log_file);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    log::info!("Starting {} backend...", config.project_name);

    let ttl = TtlPolicy {
        active_secs: config.presence_ttl_active_secs,
        passive_secs: config.presence_ttl_passive_secs,
        clamp_secs: config.presence_ttl_clamp_secs,
    };
    let store = PresenceStore::connect(&config.redis_url, ttl)
        .await
        .expect("failed to connect to Redis");

    let state = AppState::new(store, WebSocketManager::new(), DisconnectResolver::new());

    tokio::spawn(ema_task::run(state.clone(), config));

    let app = routes::routes(state);

    let addr = SocketAddr::new(config.host.parse().expect("Invalid HOST"), config.port);
    let listener = TcpListener::bind(addr).await.unwrap();

    tracing::info!(%addr, "{} running", config.project_name);

    axum::serve(listener, app).await.unwrap();
}
