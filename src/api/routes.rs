use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{self, AppState};
use crate::controller::Controller;

pub fn create_router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/controller/state", get(handlers::get_state))
        .route("/controller/emoncms", get(handlers::get_emoncms))
        .route("/controller/override", put(handlers::put_override))
        .with_state(AppState { controller })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
