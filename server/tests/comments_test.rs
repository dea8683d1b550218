mod common;

use axum::http::{Method, StatusCode};
use common::{create_recipe, TestApp};
use serde_json::json;

async fn add_comment(app: &TestApp, token: &str, recipe_id: i32, content: &str) -> i64 {
    let res = app
        .json(
            Method::POST,
            &format!("/api/recipes/{}/comments", recipe_id),
            Some(token),
            Some(json!({ "content": content })),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    res.body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_comments_newest_first() {
    let app = TestApp::spawn();
    let maria = app.signup("Maria", "maria@example.com").await;
    let luca = app.signup("Luca", "luca@example.com").await;
    let id = create_recipe(&app, &maria, "Lasagne", &["Plat", "Four"]).await;

    add_comment(&app, &maria, id, "Première version").await;
    add_comment(&app, &luca, id, "  Avec plus de béchamel  ").await;

    let res = app.get(&format!("/api/recipes/{}/comments", id), &maria).await;
    assert_eq!(res.status, StatusCode::OK);
    let comments = res.body.as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["content"], "Avec plus de béchamel");
    assert_eq!(comments[0]["author"]["name"], "Luca");
    assert_eq!(comments[0]["recipe_id"], id);
    assert!(comments[0]["updated_at"].is_null());
    assert_eq!(comments[1]["author"]["name"], "Maria");
}

#[tokio::test]
async fn test_blank_comment_is_rejected() {
    let app = TestApp::spawn();
    let token = app.signup("Maria", "maria@example.com").await;
    let id = create_recipe(&app, &token, "Lasagne", &["Plat"]).await;

    let res = app
        .json(
            Method::POST,
            &format!("/api/recipes/{}/comments", id),
            Some(&token),
            Some(json!({ "content": "   " })),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error(), "Comment cannot be empty");
}

#[tokio::test]
async fn test_comments_on_missing_recipe() {
    let app = TestApp::spawn();
    let token = app.signup("Maria", "maria@example.com").await;

    let list = app.get("/api/recipes/42/comments", &token).await;
    assert_eq!(list.status, StatusCode::NOT_FOUND);
    assert_eq!(list.error(), "Recipe not found");

    let add = app
        .json(
            Method::POST,
            "/api/recipes/42/comments",
            Some(&token),
            Some(json!({ "content": "Buonissimo" })),
        )
        .await;
    assert_eq!(add.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_edits_comment() {
    let app = TestApp::spawn();
    let maria = app.signup("Maria", "maria@example.com").await;
    let luca = app.signup("Luca", "luca@example.com").await;
    let id = create_recipe(&app, &maria, "Panna cotta", &["Dessert"]).await;
    let comment_id = add_comment(&app, &maria, id, "Trop sucré").await;

    let denied = app
        .json(
            Method::PUT,
            &format!("/api/comments/{}", comment_id),
            Some(&luca),
            Some(json!({ "content": "Parfait" })),
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.error(), "You can only edit your own comments");

    let edited = app
        .json(
            Method::PUT,
            &format!("/api/comments/{}", comment_id),
            Some(&maria),
            Some(json!({ "content": "Un peu moins de sucre" })),
        )
        .await;
    assert_eq!(edited.status, StatusCode::OK, "{:?}", edited.body);
    assert_eq!(edited.body["content"], "Un peu moins de sucre");
    assert!(!edited.body["updated_at"].is_null());

    let missing = app
        .json(
            Method::PUT,
            "/api/comments/999",
            Some(&maria),
            Some(json!({ "content": "?" })),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_author_deletes_comment() {
    let app = TestApp::spawn();
    let maria = app.signup("Maria", "maria@example.com").await;
    let luca = app.signup("Luca", "luca@example.com").await;
    let id = create_recipe(&app, &maria, "Panna cotta", &["Dessert"]).await;
    let comment_id = add_comment(&app, &maria, id, "Trop sucré").await;

    let denied = app
        .json(
            Method::DELETE,
            &format!("/api/comments/{}", comment_id),
            Some(&luca),
            None,
        )
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.error(), "You can only delete your own comments");

    let deleted = app
        .json(
            Method::DELETE,
            &format!("/api/comments/{}", comment_id),
            Some(&maria),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let list = app.get(&format!("/api/recipes/{}/comments", id), &maria).await;
    assert!(list.body.as_array().unwrap().is_empty());
}
