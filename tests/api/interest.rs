use anyhow::Result;
use chrono::DateTime;
use reqwest::StatusCode;
use serde_json::{json, Value};
use waitlist::SignupStore;
use wiremock::{
    matchers::{any, header, method, path},
    Mock, ResponseTemplate,
};

use crate::helpers::{assert_cors_headers, TestApp};

async fn mount_notify_ok(app: &TestApp, expected_calls: u64) {
    Mock::given(path("/publish"))
        .and(method("POST"))
        .and(header("X-Notify-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected_calls)
        .mount(&app.notify_server)
        .await;
}

#[tokio::test]
async fn interest_new_email_returns_201_and_is_recorded() -> Result<()> {
    let app = TestApp::spawn().await?;
    mount_notify_ok(&app, 1).await;

    let res = app
        .post_interest_json(&json!({ "email": "new@example.com" }))
        .await?;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_cors_headers(res.headers(), "POST, OPTIONS");
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Interest recorded successfully");
    assert_eq!(body["email"], "new@example.com");
    assert!(body.get("alreadyExists").is_none());
    let timestamp = body["timestamp"].as_str().unwrap_or_default();
    assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "{timestamp}");

    let signups = app.store.signups().await;
    assert_eq!(signups.len(), 1);
    assert_eq!(signups[0].email, "new@example.com");
    assert_eq!(signups[0].timestamp, timestamp);
    assert_eq!(app.store.signup_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn interest_repeated_email_returns_200_with_original_timestamp() -> Result<()> {
    let app = TestApp::spawn().await?;
    // Only the first submission publishes.
    mount_notify_ok(&app, 1).await;
    let body = json!({ "email": "new@example.com" });

    let first = app.post_interest_json(&body).await?;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first: Value = first.json().await?;

    let second = app.post_interest_json(&body).await?;
    assert_eq!(second.status(), StatusCode::OK);
    assert_cors_headers(second.headers(), "POST, OPTIONS");
    let second: Value = second.json().await?;

    assert_eq!(second["alreadyExists"], true);
    assert_eq!(second["email"], "new@example.com");
    assert_eq!(second["timestamp"], first["timestamp"]);
    assert_eq!(app.store.signups().await.len(), 1);
    assert_eq!(app.store.signup_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn interest_email_is_normalized_before_dedup() -> Result<()> {
    let app = TestApp::spawn().await?;
    mount_notify_ok(&app, 1).await;

    let first = app
        .post_interest_json(&json!({ "email": "  Foo@BAR.com " }))
        .await?;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first: Value = first.json().await?;
    assert_eq!(first["email"], "foo@bar.com");

    let second = app
        .post_interest_json(&json!({ "email": "foo@bar.com" }))
        .await?;
    assert_eq!(second.status(), StatusCode::OK);
    let second: Value = second.json().await?;
    assert_eq!(second["alreadyExists"], true);

    let signups = app.store.signups().await;
    assert_eq!(signups.len(), 1);
    assert_eq!(signups[0].email, "foo@bar.com");

    Ok(())
}

#[tokio::test]
async fn interest_empty_body_returns_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.post_interest("").await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_cors_headers(res.headers(), "POST, OPTIONS");
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "error": "Email is required" }));
    assert_eq!(app.store.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn interest_missing_or_non_string_email_returns_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let cases = [
        (json!({}), "Empty json"),
        (json!({ "name": "John Doe" }), "Missing email"),
        (json!({ "email": null }), "Null email"),
        (json!({ "email": 42 }), "Numeric email"),
        (json!({ "email": ["jd@example.com"] }), "Array email"),
        (json!({ "email": "" }), "Empty email"),
        (json!([]), "Array body"),
    ];

    for (body, description) in cases {
        let res = app.post_interest_json(&body).await?;
        assert_eq!(
            res.status(),
            StatusCode::BAD_REQUEST,
            "The API did not return a 400 BAD REQUEST the payload was {description}."
        );
        let body: Value = res.json().await?;
        assert_eq!(body["error"], "Valid email is required", "{description}");
    }
    assert_eq!(app.store.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn interest_invalid_email_format_returns_400() -> Result<()> {
    let app = TestApp::spawn().await?;

    let cases = [
        "plainaddress",
        "missing-tld@example",
        "@example.com",
        "user@",
        "user name@example.com",
        "user@exam ple.com",
        "user@@example.com",
        "   ",
    ];

    for email in cases {
        let res = app.post_interest_json(&json!({ "email": email })).await?;
        assert_eq!(
            res.status(),
            StatusCode::BAD_REQUEST,
            "The API did not return a 400 BAD REQUEST for email: '{email}'."
        );
        let body: Value = res.json().await?;
        assert_eq!(body["error"], "Invalid email format", "email: '{email}'");
    }
    assert_eq!(app.store.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn interest_malformed_body_returns_500() -> Result<()> {
    let app = TestApp::spawn().await?;

    for body in ["{\"email\": ", "email=jd@example.com", "null"] {
        let res = app.post_interest(body).await?;
        assert_eq!(
            res.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "body: {body}"
        );
        assert_cors_headers(res.headers(), "POST, OPTIONS");
        let body: Value = res.json().await?;
        assert_eq!(body, json!({ "error": "Internal server error" }));
    }
    assert_eq!(app.store.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn interest_notify_failure_returns_500_after_persisting() -> Result<()> {
    let app = TestApp::spawn().await?;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.notify_server)
        .await;

    let res = app
        .post_interest_json(&json!({ "email": "new@example.com" }))
        .await?;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "error": "Internal server error" }));

    // The write and the increment already happened.
    assert_eq!(app.store.signups().await.len(), 1);
    assert_eq!(app.store.signup_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn interest_without_notifier_still_records_signup() -> Result<()> {
    let app = TestApp::builder().without_notifications().spawn().await?;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.notify_server)
        .await;

    let res = app
        .post_interest_json(&json!({ "email": "quiet@example.com" }))
        .await?;

    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(app.store.signup_count().await?, 1);

    Ok(())
}

#[tokio::test]
async fn interest_notification_names_the_email() -> Result<()> {
    let app = TestApp::spawn().await?;
    mount_notify_ok(&app, 1).await;

    app.post_interest_json(&json!({ "email": "Le_Guin@Example.com" }))
        .await?;

    let requests = app
        .notify_server
        .received_requests()
        .await
        .unwrap_or_default();
    assert_eq!(requests.len(), 1);
    let publish: Value = serde_json::from_slice(&requests[0].body)?;
    assert_eq!(publish["Topic"], "waitlist-signups");
    assert_eq!(publish["Subject"], "New interest signup: le_guin@example.com");
    let message = publish["Message"].as_str().unwrap_or_default();
    assert!(message.contains("Email: le_guin@example.com"), "{message}");

    Ok(())
}

#[tokio::test]
async fn interest_responses_carry_a_request_id() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.post_interest("").await?;

    assert!(res.headers().get("x-request-id").is_some());

    Ok(())
}

#[tokio::test]
async fn interest_concurrent_submissions_record_one_signup() -> Result<()> {
    let app = TestApp::spawn().await?;
    mount_notify_ok(&app, 1).await;

    let mut submissions = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let http_client = app.http_client.clone();
        let url = format!("http://{}/interest", app.addr);
        submissions.spawn(async move {
            http_client
                .post(url)
                .header("Content-Type", "application/json")
                .body(json!({ "email": "race@example.com" }).to_string())
                .send()
                .await
        });
    }

    let mut created = 0;
    let mut already_exists = 0;
    while let Some(res) = submissions.join_next().await {
        let res = res??;
        match res.status() {
            StatusCode::CREATED => created += 1,
            StatusCode::OK => {
                let body: Value = res.json().await?;
                assert_eq!(body["alreadyExists"], true);
                already_exists += 1;
            }
            other => panic!("unexpected status: {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(already_exists, 19);
    assert_eq!(app.store.signups().await.len(), 1);
    assert_eq!(app.store.signup_count().await?, 1);

    Ok(())
}
