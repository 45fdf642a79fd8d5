mod common;

use serde_json::{json, Value};

use common::spawn_app;

#[tokio::test]
async fn list_users_returns_public_fields_in_id_order() {
    let app = spawn_app().await;
    app.register("alice@example.com", "secret123").await;
    app.register("bob@example.com", "hunter22").await;

    let response = app
        .client
        .get(&format!("{}/users", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!([
            { "id": 1, "email": "alice@example.com" },
            { "id": 2, "email": "bob@example.com" }
        ])
    );
}

#[tokio::test]
async fn get_user_by_id() {
    let app = spawn_app().await;
    app.register("alice@example.com", "secret123").await;

    let found = app
        .client
        .get(&format!("{}/users/1", app.address))
        .send()
        .await
        .unwrap();
    let missing = app
        .client
        .get(&format!("{}/users/99", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(200, found.status().as_u16());
    let body: Value = found.json().await.unwrap();
    assert_eq!(body, json!({ "id": 1, "email": "alice@example.com" }));

    assert_eq!(404, missing.status().as_u16());
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn create_user_hashes_password_and_rejects_duplicates() {
    let app = spawn_app().await;
    let body = json!({ "email": "carol@example.com", "password": "secret123" });

    let created = app.post_json("/users/create", &body).await;
    let duplicate = app.post_json("/users/create", &body).await;

    assert_eq!(201, created.status().as_u16());
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["email"], "carol@example.com");
    assert!(created.get("password_hash").is_none());

    assert_eq!(409, duplicate.status().as_u16());

    // The created account can log in like a registered one.
    let login = app.login("carol@example.com", "secret123").await;
    assert_eq!(200, login.status().as_u16());
}

#[tokio::test]
async fn list_users_accepts_trailing_slash() {
    let app = spawn_app().await;
    app.register("alice@example.com", "secret123").await;

    let response = app
        .client
        .get(&format!("{}/users/", app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!([{ "id": 1, "email": "alice@example.com" }]));
}
