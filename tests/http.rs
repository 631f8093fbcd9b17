use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use murmur::{
    AppState, chat::ChatService, config::Config, live::ConnectionRegistry, store::SqliteStore,
};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

async fn app() -> Router {
    let store = SqliteStore::in_memory().await.unwrap();
    let chat = ChatService::new(Arc::new(store), Arc::new(ConnectionRegistry::new()));
    let config = Config::from_lookup(|_| None).unwrap();
    let sessions = SessionManagerLayer::new(MemoryStore::default()).with_secure(false);
    murmur::app(AppState::new(chat, config), sessions)
}

struct Reply {
    status: StatusCode,
    cookie: Option<String>,
    body: String,
}

async fn call(app: &Router, method: Method, uri: &str, form: Option<&str>, cookie: Option<&str>) -> Reply {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let body = match form {
        Some(form) => {
            request = request.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            Body::from(form.to_owned())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().split(';').next().unwrap().to_owned());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    Reply {
        status,
        cookie,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

async fn register(app: &Router, handle: &str, name: &str) -> String {
    let reply = call(app, Method::POST, "/user", Some(&format!("username={handle}&display-name={name}")), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.cookie.expect("session cookie")
}

#[tokio::test]
async fn anonymous_visitors_see_the_register_form() {
    let app = app().await;

    let reply = call(&app, Method::GET, "/", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Create an Account"));

    let reply = call(&app, Method::POST, "/main", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn registering_logs_in() {
    let app = app().await;
    let cookie = register(&app, "alice", "Alice").await;

    let reply = call(&app, Method::POST, "/main", None, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("Alice"));
    assert!(reply.body.contains(r#"ws-connect="/ws""#));

    let reply = call(&app, Method::POST, "/user-exists", Some("username=alice&expect=free"), None).await;
    assert!(reply.body.contains("username is taken"));
    let reply = call(&app, Method::POST, "/user-exists", Some("username=bob&expect=free"), None).await;
    assert!(reply.body.contains("username is available"));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app().await;
    register(&app, "alice", "Alice").await;

    let reply = call(&app, Method::POST, "/user", Some("username=alice&display-name=Imposter"), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn private_chat_round_trip() {
    let app = app().await;
    let alice = register(&app, "alice", "Alice").await;
    let bob = register(&app, "bob", "Bob").await;

    let reply = call(&app, Method::POST, "/private-chat", Some("username-input=bob"), Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains(r#"chat-target="user:bob""#));

    let reply = call(
        &app,
        Method::POST,
        "/private-message",
        Some("target=bob&message-content=hello+there"),
        Some(&alice),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("hello there"));
    assert!(reply.body.contains("You: hello there"));

    let reply = call(&app, Method::GET, "/private-chat?target=alice", None, Some(&bob)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("hello there"));

    let reply = call(
        &app,
        Method::POST,
        "/private-message",
        Some("target=ghost&message-content=hi"),
        Some(&alice),
    )
    .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn group_chat_over_http() {
    let app = app().await;
    let alice = register(&app, "alice", "Alice").await;
    let bob = register(&app, "bob", "Bob").await;
    register(&app, "carol", "Carol").await;

    let reply = call(&app, Method::POST, "/group-chat", Some("group-name-input=team&members=bob"), Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains(r#"chat-target="group:team""#));

    let reply = call(&app, Method::POST, "/group-members", Some("target=team&username=carol"), Some(&bob)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = call(&app, Method::POST, "/group-members", Some("target=team&username=carol"), Some(&alice)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let members: serde_json::Value = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(members.as_array().unwrap().len(), 3);

    let reply = call(&app, Method::DELETE, "/group-members?target=team&username=bob", None, Some(&bob)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, Method::POST, "/group-message", Some("target=team&message-content=hi"), Some(&bob)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app().await;
    let cookie = register(&app, "alice", "Alice").await;

    let reply = call(&app, Method::GET, "/users", None, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains(r#""handle":"alice""#));

    let reply = call(&app, Method::PUT, "/logout", None, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = call(&app, Method::POST, "/main", None, Some(&cookie)).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
