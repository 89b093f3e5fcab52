use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use waitlist::{config::CountView, MemoryStore};
use wiremock::{matchers::any, Mock, ResponseTemplate};

use crate::helpers::{assert_cors_headers, TestApp};

async fn spots_remaining(app: &TestApp) -> Result<u64> {
    let res = app.get_count().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    body["spotsRemaining"]
        .as_u64()
        .ok_or_else(|| anyhow::anyhow!("spotsRemaining missing from: {body}"))
}

#[tokio::test]
async fn count_capacity_view_starts_at_full_capacity() -> Result<()> {
    let app = TestApp::spawn().await?;

    let res = app.get_count().await?;

    assert_eq!(res.status(), StatusCode::OK);
    assert_cors_headers(res.headers(), "GET, OPTIONS");
    let body: Value = res.json().await?;
    assert_eq!(body["spotsRemaining"], 387);
    assert!(body["timestamp"].is_string());
    assert!(body.get("totalSignups").is_none());

    Ok(())
}

#[tokio::test]
async fn count_capacity_view_never_goes_negative() -> Result<()> {
    for (signup_count, expected) in [(386, 1), (387, 0), (500, 0)] {
        let app = TestApp::builder()
            .store(MemoryStore::with_signup_count(signup_count))
            .spawn()
            .await?;

        assert_eq!(
            spots_remaining(&app).await?,
            expected,
            "signup_count: {signup_count}"
        );
    }

    Ok(())
}

#[tokio::test]
async fn count_capacity_view_counts_down_per_new_signup() -> Result<()> {
    let app = TestApp::spawn().await?;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.notify_server)
        .await;

    let mut previous = spots_remaining(&app).await?;
    for email in ["a@example.com", "b@example.com", "a@example.com", "c@example.com"] {
        app.post_interest_json(&json!({ "email": email })).await?;
        let current = spots_remaining(&app).await?;
        assert!(current <= previous, "{current} > {previous}");
        previous = current;
    }

    assert_eq!(previous, 384);

    Ok(())
}

#[tokio::test]
async fn count_raw_view_invites_first_signup() -> Result<()> {
    let app = TestApp::builder().count_view(CountView::Raw).spawn().await?;

    let res = app.get_count().await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["totalSignups"], 0);
    assert_eq!(body["message"], "Be the first to show interest!");
    assert!(body["timestamp"].is_string());
    assert!(body.get("spotsRemaining").is_none());

    Ok(())
}

#[tokio::test]
async fn count_raw_view_after_one_signup() -> Result<()> {
    let app = TestApp::builder().count_view(CountView::Raw).spawn().await?;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.notify_server)
        .await;

    let res = app
        .post_interest_json(&json!({ "email": "new@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = app.get_count().await?.json().await?;
    assert_eq!(body["totalSignups"], 1);
    assert_eq!(body["message"], "1 people are already interested! 🔥");

    Ok(())
}
