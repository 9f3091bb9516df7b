pub mod boards;
pub mod error;
pub mod messages;
pub mod middleware;

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get},
};

use paper_db::Database;
use paper_grid::PlacementService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub placement: PlacementService<Database>,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String) -> AppState {
        Arc::new(Self {
            placement: PlacementService::new(db),
            jwt_secret,
        })
    }
}

pub fn router(state: AppState) -> Router {
    // Visitors write anonymously; only deleting needs a signed-in owner.
    let public_routes = Router::new()
        .route(
            "/boards/{owner_id}/messages",
            get(messages::list_messages).post(messages::place_message),
        )
        .route("/boards/{owner_id}/suggestions", get(boards::suggestions))
        .route("/boards/{owner_id}/layout", get(boards::layout))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/boards/{owner_id}/messages/{message_id}",
            delete(messages::delete_message),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
