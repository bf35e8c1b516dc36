//! HTTP surface serving the generated artifacts.

pub mod api;
pub mod state;

use std::io;
use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::WebState;

/// Build the gateway router.
pub fn build_router(state: WebState) -> Router {
    Router::new()
        .route("/", get(api::get_status))
        .route("/playlist.m3u", get(api::get_playlist))
        .route("/epg.xml", get(api::get_epg))
        .route("/refresh", post(api::trigger_refresh))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind the HTTP listener. Called before anything is spawned so a bind
/// failure aborts startup.
pub async fn bind_listener(listen_addr: SocketAddr) -> io::Result<TcpListener> {
    let listener = TcpListener::bind(listen_addr).await?;
    log::info!("Web server listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serve on `listener` until `shutdown` flips to true.
pub async fn start_web_server(
    listener: TcpListener,
    state: WebState,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let app = build_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            log::info!("Web server shutting down");
        })
        .await
}
