use serde_json::json;

use crate::helpers::{assert_is_redirect_to, TestApp};

#[tokio::test]
async fn create_returns_the_new_subscriber() {
    let app = TestApp::spawn().await;

    let response = app
        .post_users(&json!({ "email": "ursula_le_guin@gmail.com" }))
        .await;

    assert!(response.status().is_success());
    let subscriber: serde_json::Value = response.json().await.unwrap();
    assert_eq!(subscriber["email"], "ursula_le_guin@gmail.com");
    assert!(subscriber["id"].is_i64());
}

#[tokio::test]
async fn create_then_list_includes_exactly_one_matching_subscriber() {
    let app = TestApp::spawn().await;
    app.post_users(&json!({ "email": "ursula_le_guin@gmail.com" }))
        .await;

    let response = app.get_users("").await;

    assert!(response.status().is_success());
    let subscribers: Vec<serde_json::Value> = response.json().await.unwrap();
    let matching = subscribers
        .iter()
        .filter(|s| s["email"] == "ursula_le_guin@gmail.com")
        .count();
    assert_eq!(matching, 1);
}

#[tokio::test]
async fn creating_the_same_email_twice_returns_a_400() {
    let app = TestApp::spawn().await;
    let body = json!({ "email": "ursula_le_guin@gmail.com" });

    let response = app.post_users(&body).await;
    assert!(response.status().is_success());

    let response = app.post_users(&body).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn create_rejects_an_invalid_email_with_a_400() {
    let app = TestApp::spawn().await;

    for invalid_email in ["", "ursuladomain.com", "@domain.com"] {
        let response = app.post_users(&json!({ "email": invalid_email })).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not return a 400 for email `{invalid_email}`"
        );
    }
}

#[tokio::test]
async fn list_honors_skip_and_limit() {
    let app = TestApp::spawn().await;
    for email in [
        "first@example.com",
        "second@example.com",
        "third@example.com",
    ] {
        app.post_users(&json!({ "email": email })).await;
    }

    let response = app.get_users("?skip=1&limit=1").await;

    let subscribers: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "second@example.com");
}

#[tokio::test]
async fn remove_deletes_the_subscriber() {
    let app = TestApp::spawn().await;
    let body = json!({ "email": "ursula_le_guin@gmail.com" });
    app.post_users(&body).await;

    let response = app.post_remove(&body).await;
    assert!(response.status().is_success());

    let subscribers: Vec<serde_json::Value> = app.get_users("").await.json().await.unwrap();
    assert!(subscribers.is_empty());
}

#[tokio::test]
async fn removing_an_unknown_email_returns_a_404() {
    let app = TestApp::spawn().await;

    let response = app
        .post_remove(&json!({ "email": "nobody@example.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn form_subscribe_redirects_to_the_home_page_and_persists() {
    let app = TestApp::spawn().await;

    let response = app
        .post_subscribe_form("email=ursula_le_guin%40gmail.com")
        .await;

    assert_is_redirect_to(&response, "/");
    let saved = sqlx::query_scalar::<_, String>("SELECT email FROM subscribers")
        .fetch_one(&app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber");
    assert_eq!(saved, "ursula_le_guin@gmail.com");
}

#[tokio::test]
async fn form_unsubscribe_redirects_to_the_home_page() {
    let app = TestApp::spawn().await;
    app.post_subscribe_form("email=ursula_le_guin%40gmail.com")
        .await;

    let response = app
        .post_unsubscribe_form("email=ursula_le_guin%40gmail.com")
        .await;

    assert_is_redirect_to(&response, "/");
    let subscribers: Vec<serde_json::Value> = app.get_users("").await.json().await.unwrap();
    assert!(subscribers.is_empty());
}
