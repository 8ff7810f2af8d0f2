use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use school_api_client::SchoolApiClient;
use school_api_client::http_client::ReqwestSchoolApiClient;
use school_planner::domains::helpers::{Locale, RelativeTimeFormatter};
use school_planner::domains::videoconference::messages;
use school_planner::routes::{AppState, router};
use school_planner::PlannerService;

fn app(server: &MockServer) -> axum::Router {
    let client: Arc<dyn SchoolApiClient> = Arc::new(ReqwestSchoolApiClient::new(
        &server.uri(),
        SecretString::new("jwt".into()),
    ));
    router(Arc::new(AppState {
        planner: PlannerService::new(
            client,
            chrono_tz::Europe::Berlin,
            RelativeTimeFormatter::new(Locale::De),
        ),
        metrics: None,
    }))
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

async fn body_json_value(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).expect("json body")
}

#[tokio::test]
async fn health_is_ok() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn moderator_sees_start_section() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videoconference/event/e1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "permission": "START_MEETING",
            "state": "NOT_STARTED"
        })))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::get("/videoconference/event/e1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json_value(response).await,
        serde_json::json!({
            "state": "MODERATOR_INACTIVE",
            "section": "start-conference",
            "action": "start"
        })
    );
}

#[tokio::test]
async fn forbidden_upstream_renders_no_permission() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videoconference/event/e2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::get("/videoconference/event/e2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json_value(response).await;
    assert_eq!(json["state"], "FORBIDDEN");
    assert_eq!(json["message"], messages::NO_PERMISSION);
}

#[tokio::test]
async fn upstream_failure_shows_general_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/videoconference/event/e3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::get("/videoconference/event/e3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_string(response).await, messages::GENERAL_ERROR);
}

#[tokio::test]
async fn start_posts_options_and_returns_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/videoconference/"))
        .and(header("authorization", "Bearer jwt"))
        .and(body_json(serde_json::json!({
            "scopeId": "e1",
            "scopeName": "event",
            "options": {
                "everyAttendeJoinsMuted": true,
                "moderatorMustApproveJoinRequests": false,
                "everybodyJoinsAsModerator": true
            }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"url": "https://bbb.example/join/1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::post("/videoconference/event/e1/start")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"startMuted": true, "everyoneIsModerator": true}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json_value(response).await,
        serde_json::json!({"url": "https://bbb.example/join/1"})
    );
}

#[tokio::test]
async fn join_posts_empty_options() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/videoconference/"))
        .and(body_json(serde_json::json!({
            "scopeId": "e9",
            "scopeName": "event",
            "options": {}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"url": "https://bbb.example/join/9"})),
        )
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::post("/videoconference/event/e9/join")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json_value(response).await["url"], "https://bbb.example/join/9");
}

#[tokio::test]
async fn calendar_requires_school_id() {
    let server = MockServer::start().await;
    let response = app(&server)
        .oneshot(Request::get("/planner/calendar").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calendar_for_unknown_school_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schools/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such school"))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::get("/planner/calendar?schoolId=missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_runs_presign_put_model_and_association() {
    let server = MockServer::start().await;
    let storage_url = format!("{}/storage/put-here", server.uri());

    Mock::given(method("POST"))
        .and(path("/files/file"))
        .and(body_json(serde_json::json!({
            "type": "text/plain",
            "filename": "essay.txt"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedUrl": {
                "url": storage_url,
                "header": {"x-amz-meta-flat-name": "flat-essay"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/storage/put-here"))
        .and(header("x-amz-meta-flat-name", "flat-essay"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/fileModel"))
        .and(body_json(serde_json::json!({
            "name": "essay.txt",
            "type": "text/plain",
            "size": 5,
            "storageFileName": "flat-essay"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_id": "f1",
            "name": "essay.txt",
            "storageFileName": "flat-essay"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/homework/submit/sub1/grade-files"))
        .and(body_json(serde_json::json!({
            "fileId": "f1",
            "teamMembers": ["u1", "u2"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/homework/submit/sub1/files/f1/permissions"))
        .and(body_json(serde_json::json!({"teamMembers": ["u1", "u2"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::post(
                "/homework/submit/sub1/upload?filename=essay.txt&associationType=grade-files&teamMembers=u1,u2",
            )
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json_value(response).await;
    assert_eq!(json["_id"], "f1");

    let received = server.received_requests().await.unwrap();
    let order: Vec<String> = received
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        order,
        vec![
            "POST /files/file",
            "PUT /storage/put-here",
            "POST /files/fileModel",
            "POST /homework/submit/sub1/grade-files",
            "POST /homework/submit/sub1/files/f1/permissions",
        ]
    );
}

#[tokio::test]
async fn upload_without_flat_name_header_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedUrl": {"url": format!("{}/storage/x", server.uri()), "header": {}}
        })))
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::post("/homework/submit/sub1/upload?filename=a.bin&parent=&owner=")
                .body(Body::from(vec![1_u8, 2, 3]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn empty_parent_is_left_out_of_presign() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/file"))
        .and(body_json(serde_json::json!({
            "type": "application/octet-stream",
            "filename": "a.bin"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "signedUrl": {"url": format!("{}/storage/x", server.uri()), "header": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = app(&server)
        .oneshot(
            Request::post("/homework/submit/sub1/upload?filename=a.bin&parent=")
                .body(Body::from(vec![1_u8]))
                .unwrap(),
        )
        .await
        .unwrap();
    // Presign matched without a parent; the missing flat-name header then rejects.
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
