mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn register(client: &reqwest::Client, server: &common::TestServer, email: &str) -> Result<Value> {
    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Ada Shopper", "email": email, "password": "Sup3rSecret!" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(res.json().await?)
}

#[tokio::test]
async fn registration_and_login_use_fallback_store() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let email = common::unique_email("ada");

    let body = register(&client, server, &email).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "customer");
    assert!(body["data"]["access_token"].is_string());
    // Fallback sessions cannot be refreshed
    assert!(body["data"]["refresh_token"].is_null());
    assert!(server.fallback_file.exists());

    let res = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email.to_uppercase(), "password": "Sup3rSecret!" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["user"]["email"], email);
    Ok(())
}

#[tokio::test]
async fn duplicate_fallback_registration_conflicts() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let email = common::unique_email("dup");

    register(&client, server, &email).await?;
    let res = client
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Someone Else", "email": email, "password": "An0therSecret!" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(common::error_code(&res.json().await?), "CONFLICT");
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_unauthorized() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let email = common::unique_email("wrong");
    register(&client, server, &email).await?;

    let res = client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email, "password": "not-the-password" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::error_code(&res.json().await?), "UNAUTHORIZED");
    Ok(())
}

#[tokio::test]
async fn fallback_token_passes_auth_but_data_routes_are_unavailable() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();
    let body = register(&client, server, &common::unique_email("cart")).await?;
    let token = body["data"]["access_token"].as_str().unwrap_or_default().to_string();

    // Authenticated and a customer, but the cart lives in Postgres
    let res = client.get(server.url("/api/cart")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = client.get(server.url("/api/me")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    // Customers never reach admin routes
    let res = client.get(server.url("/api/admin/users")).bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(common::error_code(&res.json().await?), "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn registration_validates_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/register"))
        .json(&json!({ "name": "Bad Email", "email": "not-an-email", "password": "Sup3rSecret!" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(common::error_code(&body), "VALIDATION_ERROR");
    assert!(body["field_errors"]["email"].is_string());
    Ok(())
}
