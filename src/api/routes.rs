use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    let sudoku = Router::new()
        .route("/sessions", post(handlers::open_sudoku))
        .route(
            "/sessions/:id",
            get(handlers::get_sudoku).delete(handlers::close_sudoku),
        )
        .route("/sessions/:id/select", post(handlers::select_cell))
        .route("/sessions/:id/place", post(handlers::place_digit));

    #[cfg(feature = "dev-reveal")]
    let sudoku = sudoku.route("/sessions/:id/reveal", post(handlers::reveal_solution));

    let wordle = Router::new()
        .route("/sessions", post(handlers::open_wordle))
        .route(
            "/sessions/:id",
            get(handlers::get_wordle).delete(handlers::close_wordle),
        )
        .route("/sessions/:id/keys", post(handlers::press_key));

    Router::new().nest("/sudoku", sudoku).nest("/wordle", wordle)
}
