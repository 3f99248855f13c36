//! HTTP server for calnotes.

pub mod config;
pub mod routes;
pub mod session;
pub mod state;

use axum::{Router, middleware};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::calendar::router())
        .merge(routes::events::router())
        .merge(routes::notes::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_api_session,
        ));

    let pages = routes::pages::protected_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        session::require_page_session,
    ));

    let mut app = Router::new()
        .merge(api)
        .merge(pages)
        .merge(routes::pages::public_router())
        .merge(routes::auth::router());

    if let Some(dir) = &state.static_dir {
        app = app.nest_service("/static", ServeDir::new(dir));
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}
