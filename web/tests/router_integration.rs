//! End-to-end routing through axum.

#![allow(clippy::expect_used)]

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum_test::TestServer;
use route_bind_core::{ValidationError, Validatable};
use route_bind_testing::init_tracing;
use route_bind_web::{Bindable, Reply, RequestContext, RouteError, RouteResult, Router, RouterConfig};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;

#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Clone)]
struct NewComment {
    text: String,
}

#[derive(Bindable, Debug, Default)]
#[bind(validate_self)]
struct AddComment {
    #[bind(path = "postId")]
    post_id: u64,
    #[bind(header = "x-author,required")]
    author: String,
    #[bind(query = "notify")]
    notify: bool,
    #[bind(body)]
    comment: NewComment,
}

impl Validatable for AddComment {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.comment.text.trim().is_empty() {
            return Err(ValidationError::custom("comment text must not be blank"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Comment {
    post_id: u64,
    author: String,
    text: String,
    notified: bool,
}

async fn add_comment(_ctx: RequestContext, request: AddComment) -> RouteResult<Comment> {
    Ok(Reply::created(Comment {
        post_id: request.post_id,
        author: request.author,
        text: request.comment.text,
        notified: request.notify,
    }))
}

#[derive(Bindable, Debug, Default)]
struct ListComments {
    #[bind(path = "postId")]
    post_id: u64,
    #[bind(query = "limit", validate = "max=50")]
    limit: u32,
}

async fn list_comments(_ctx: RequestContext, request: ListComments) -> RouteResult<Vec<u64>> {
    if request.post_id == 404 {
        return Err(RouteError::not_found("Post", request.post_id));
    }
    Ok(Reply::ok((0..u64::from(request.limit)).collect()))
}

fn app(config: RouterConfig) -> axum::Router {
    let router = Router::new().title("Comments").with_config(config);
    let add = router
        .endpoint("/posts/{postId}/comments", add_comment)
        .expect("endpoint builds");
    let list = router
        .endpoint("/posts/{postId}/comments/list", list_comments)
        .expect("endpoint builds");
    router.post(add).get(list).into_axum()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn test_bound_request_reaches_handler() {
    init_tracing();
    let request = Request::post("/posts/12/comments?notify=true")
        .header("x-author", "ada")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text":"nice post"}"#))
        .expect("valid request");

    let response = app(RouterConfig::default())
        .oneshot(request)
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({
            "post_id": 12,
            "author": "ada",
            "text": "nice post",
            "notified": true
        })
    );
}

#[tokio::test]
async fn test_every_failure_is_reported() {
    init_tracing();
    let request = Request::post("/posts/abc/comments?notify=maybe")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text":"  "}"#))
        .expect("valid request");

    let response = app(RouterConfig::default().development(true))
        .oneshot(request)
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let errors: Vec<&str> = body["parsing_errors"]
        .as_array()
        .expect("error list")
        .iter()
        .filter_map(serde_json::Value::as_str)
        .collect();
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(errors.iter().any(|e| e.starts_with("post_id - ")));
    assert!(errors.iter().any(|e| e.starts_with("notify - ")));
    assert!(errors.iter().any(|e| e.contains("x-author")));
    assert!(errors.iter().any(|e| e.contains("must not be blank")));
    assert_eq!(body["status_code"], 400);
}

#[tokio::test]
async fn test_unrouted_method_is_rejected_by_axum() {
    let request = Request::delete("/posts/1/comments")
        .body(Body::empty())
        .expect("valid request");
    let response = app(RouterConfig::default())
        .oneshot(request)
        .await
        .expect("infallible");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_with_test_server() {
    let server = TestServer::new(app(RouterConfig::default())).expect("server starts");

    let response = server.get("/posts/7/comments/list?limit=3").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Vec<u64>>(), vec![0, 1, 2]);

    let response = server.get("/posts/7/comments/list?limit=51").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server.get("/posts/404/comments/list").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<serde_json::Value>(),
        serde_json::json!({ "code": "NOT_FOUND" })
    );

    let response = server
        .post("/posts/7/comments")
        .add_header(
            HeaderName::from_static("x-author"),
            HeaderValue::from_static("grace"),
        )
        .json(&NewComment {
            text: "hello".to_string(),
        })
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Comment>().author, "grace");
}
