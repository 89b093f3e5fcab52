use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    config::CountView,
    store::{iso_timestamp, StoreError},
    web::{
        types::{CapacityCount, CountResponse, RawCount},
        WebResult,
    },
    AppState,
};

/// Fixed number of spots `GET /count` counts down from in the capacity view.
pub const SIGNUP_CAPACITY: u64 = 387;

#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// `GET /count`
#[tracing::instrument(name = "Reading signup count", skip(app_state))]
pub async fn get_count(State(app_state): State<AppState>) -> WebResult<Json<CountResponse>> {
    let signup_count = app_state
        .store
        .signup_count()
        .await
        .map_err(CountError::Store)?;
    let timestamp = iso_timestamp(Utc::now());

    Ok(Json(count_response(app_state.count_view, signup_count, timestamp)))
}

fn count_response(view: CountView, signup_count: u64, timestamp: String) -> CountResponse {
    match view {
        CountView::Raw => CountResponse::Raw(RawCount {
            total_signups: signup_count,
            message: raw_count_message(signup_count),
            timestamp,
        }),
        CountView::Capacity => CountResponse::Capacity(CapacityCount {
            spots_remaining: SIGNUP_CAPACITY.saturating_sub(signup_count),
            timestamp,
        }),
    }
}

fn raw_count_message(signup_count: u64) -> String {
    if signup_count > 0 {
        format!("{signup_count} people are already interested! 🔥")
    } else {
        "Be the first to show interest!".to_string()
    }
}
