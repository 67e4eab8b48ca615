//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::time::Duration;
use taskpilot_agent::test_utils::{ScriptedCompletion, ScriptedSandbox};
use taskpilot_agent::{AgentState, Orchestrator, Services};
use taskpilot_api::{NewGoalResponse, StatusResponse, router};
use tower::ServiceExt;

fn orchestrator(completion: ScriptedCompletion) -> Orchestrator {
    Orchestrator::new(Services::new(
        completion,
        ScriptedSandbox::new().succeed("ls", "a.txt\nb.txt"),
    ))
}

async fn send(orchestrator: &Orchestrator, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router(orchestrator.clone()).oneshot(request).await.unwrap();
    let code = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (code, body.to_vec())
}

fn post_goal(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/new")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let orchestrator = orchestrator(ScriptedCompletion::new());
    let (code, body) = send(&orchestrator, get("/health")).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body, b"ok");
}

#[tokio::test]
async fn test_submit_and_poll_goal() {
    let completion = ScriptedCompletion::new()
        .answer("plan", r#"{"tasks": ["list the files"]}"#)
        .answer(
            "solution",
            r#"{"tool": "TERMINAL", "inputs": ["ls"], "reasoning": "", "limitations": "", "outcome": ""}"#,
        );
    let orchestrator = orchestrator(completion);

    let (code, body) = send(
        &orchestrator,
        post_goal(r#"{"goal": "list files in the current directory"}"#),
    )
    .await;
    assert_eq!(code, StatusCode::OK);
    let NewGoalResponse { id } = serde_json::from_slice(&body).unwrap();

    let mut state = AgentState::Init;
    for _ in 0..500 {
        let (code, body) = send(&orchestrator, get(&format!("/status/{id}"))).await;
        assert_eq!(code, StatusCode::OK);
        let response: StatusResponse = serde_json::from_slice(&body).unwrap();
        state = response.status.planner.state;
        if state.is_terminal() {
            let history = response.status.planner.history;
            assert_eq!(history.len(), 1);
            assert_eq!(
                history[0].result.as_ref().map(|output| output.text()),
                Some("a.txt\nb.txt")
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, AgentState::Finished);
}

#[tokio::test]
async fn test_status_json_shape() {
    let completion = ScriptedCompletion::new().answer("plan", "no plan today");
    let orchestrator = orchestrator(completion);
    let id = orchestrator.submit("anything").await;

    let (code, body) = send(&orchestrator, get(&format!("/status/{id}"))).await;
    assert_eq!(code, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"]["planner"]["state"], "failed");
    assert_eq!(
        json["status"]["planner"]["error"]["kind"],
        "AnswerExtractionFailure"
    );
    assert!(json["status"]["planner"]["plan"].is_null());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let orchestrator = orchestrator(ScriptedCompletion::new());
    let (code, body) = send(&orchestrator, post_goal("{\"goal\": ")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unable to parse body");
}

#[tokio::test]
async fn test_bad_and_unknown_ids() {
    let orchestrator = orchestrator(ScriptedCompletion::new());

    let (code, body) = send(&orchestrator, get("/status/not-a-uuid")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "unable to parse id");

    let id = uuid::Uuid::new_v4();
    let (code, _) = send(&orchestrator, get(&format!("/status/{id}"))).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}
