//! Contains all the routes that this application can handle.

mod count;
mod interest;

// re-export errors
pub use count::{CountError, SIGNUP_CAPACITY};
pub use interest::InterestError;

use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Json, Router,
};

use crate::{
    web::{
        midware::{self, AllowedMethods},
        types::HealthResponse,
    },
    AppState,
};

async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        region: app_state.region.clone(),
    })
}

/// All the routes of the server
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .with_state(app_state.clone())
        .merge(interest_routes(app_state.clone()))
        .merge(count_routes(app_state))
}

/// INTEREST - `POST /interest` and its preflight
fn interest_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/interest",
            post(interest::submit_interest).options(midware::preflight),
        )
        .with_state(app_state)
        .layer(middleware::map_response_with_state(
            AllowedMethods("POST, OPTIONS"),
            midware::cors_headers,
        ))
}

/// COUNT - `GET /count` and its preflight
fn count_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/count", get(count::get_count).options(midware::preflight))
        .with_state(app_state)
        .layer(middleware::map_response_with_state(
            AllowedMethods("GET, OPTIONS"),
            midware::cors_headers,
        ))
}
