//! Router assembly and server lifecycle.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    tower_http::cors::CorsLayer,
    tracing::info,
};

use {
    tgrelay_messaging::ConversationGateway,
    tgrelay_products::ProductSearch,
    tgrelay_sessions::{LoginFlow, SessionRegistry},
};

use crate::routes;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub login: Arc<LoginFlow>,
    pub conversations: Arc<ConversationGateway>,
    pub products: Arc<dyn ProductSearch>,
}

impl AppState {
    /// Wire the standard service graph on top of a session registry.
    pub fn new(registry: Arc<SessionRegistry>, products: Arc<dyn ProductSearch>) -> Self {
        let login = Arc::new(LoginFlow::new(Arc::clone(&registry)));
        let conversations = Arc::new(ConversationGateway::new(Arc::clone(&registry)));
        Self {
            registry,
            login,
            conversations,
            products,
        }
    }
}

/// Build the HTTP router.
///
/// Upload size is unconstrained here; whatever the backend accepts is
/// accepted.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/docs", get(routes::docs))
        .route("/login", post(routes::login))
        .route("/qr_code/{phone}", get(routes::qr_code))
        .route("/check/login", get(routes::check_login))
        .route(
            "/messages",
            get(routes::get_messages).post(routes::send_message),
        )
        .route("/messages/media", post(routes::send_media))
        .route("/wild", get(routes::wild_search))
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain every session.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let registry = Arc::clone(&state.registry);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    registry.shutdown_all().await;
    Ok(())
}
