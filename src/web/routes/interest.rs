use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::info;

use crate::{
    notify_client::{self, SignupNotification},
    store::{InsertOutcome, SignupRecord, StoreError},
    web::{
        types::{DataParsingError, InterestRequest, InterestResponse},
        WebResult,
    },
    AppState,
};

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum InterestError {
    #[error("data parsing error: {0}")]
    DataParsing(#[from] DataParsingError),
    #[error("failed to decode the request body: {0}")]
    BodyDecode(serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("notify client error: {0}")]
    Notify(#[from] notify_client::Error),
}

// ###################################
// ->   API
// ###################################
/// `POST /interest`
///
/// Validation -> dedup check -> conditional write -> counter increment -> notification, in that
/// order. A repeated email short-circuits with a 200 and the originally stored timestamp.
#[tracing::instrument(
    name = "Recording interest signup",
    skip(app_state, body),
    fields(email = tracing::field::Empty)
)]
pub async fn submit_interest(
    State(app_state): State<AppState>,
    body: Bytes,
) -> WebResult<(StatusCode, Json<InterestResponse>)> {
    if body.is_empty() {
        return Err(InterestError::DataParsing(DataParsingError::BodyMissing).into());
    }
    let email = InterestRequest::decode(&body)
        .map_err(InterestError::BodyDecode)?
        .valid_email()
        .map_err(InterestError::DataParsing)?;
    tracing::Span::current().record("email", email.as_ref());

    let store = &app_state.store;

    if let Some(existing) = store
        .find_signup(&email)
        .await
        .map_err(InterestError::Store)?
    {
        info!("Email already registered");
        return Ok(already_registered(existing));
    }

    let record = SignupRecord::new(&email, Utc::now());
    match store
        .insert_signup(&record)
        .await
        .map_err(InterestError::Store)?
    {
        InsertOutcome::Inserted => {}
        InsertOutcome::AlreadyExists(existing) => {
            info!("Email registered by a concurrent request");
            return Ok(already_registered(existing));
        }
    }

    let signup_count = store
        .increment_signup_count()
        .await
        .map_err(InterestError::Store)?;
    info!(signup_count, "New signup recorded");

    if let Some(notifier) = &app_state.notifier {
        let notification = SignupNotification::new(&record);
        notifier
            .publish(&notification.subject, &notification.message)
            .await
            .map_err(InterestError::Notify)?;
    }

    Ok((
        StatusCode::CREATED,
        Json(InterestResponse {
            message: "Interest recorded successfully",
            email: record.email,
            timestamp: record.timestamp,
            already_exists: None,
        }),
    ))
}

fn already_registered(existing: SignupRecord) -> (StatusCode, Json<InterestResponse>) {
    (
        StatusCode::OK,
        Json(InterestResponse {
            message: "Email already registered",
            email: existing.email,
            timestamp: existing.timestamp,
            already_exists: Some(true),
        }),
    )
}
