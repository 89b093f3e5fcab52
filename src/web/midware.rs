use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH, CONTENT_TYPE,
        },
        HeaderMap, HeaderValue, Method, StatusCode, Uri,
    },
    response::Response,
};
use serde_json::json;
use uuid::Uuid;

use crate::web::{log, Error, REQUEST_ID_HEADER};

/// Turns a `web::Error` stashed in the response extensions into the client facing JSON body.
/// Headers set further down the stack (CORS, request id) are kept.
pub async fn response_mapper(
    req_method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    resp: Response,
) -> Response {
    let uuid = req_headers
        .get(REQUEST_ID_HEADER)
        .and_then(|id| id.to_str().ok())
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(Uuid::new_v4);

    let web_error = resp.extensions().get::<Arc<Error>>().cloned();
    let client_status_and_error = web_error
        .as_deref()
        .map(Error::status_code_and_client_error);

    log::log_request(
        uuid,
        &req_method,
        &uri,
        resp.status(),
        web_error.as_deref(),
        client_status_and_error.as_ref(),
    );

    let Some((status, client_error)) = client_status_and_error else {
        return resp;
    };

    let body = json!({ "error": client_error.to_string() });
    let (mut parts, _body) = resp.into_parts();
    parts.status = status;
    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Response::from_parts(parts, Body::from(body.to_string()))
}

/// The verbs a route group answers to, sent back in `Access-Control-Allow-Methods`.
#[derive(Debug, Clone, Copy)]
pub struct AllowedMethods(pub &'static str);

/// Sets the CORS and content type headers every signup endpoint response carries.
pub async fn cors_headers(
    State(AllowedMethods(methods)): State<AllowedMethods>,
    mut resp: Response,
) -> Response {
    let headers = resp.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(methods),
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    resp
}

/// CORS preflight: 200 with an empty body, no store access.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
