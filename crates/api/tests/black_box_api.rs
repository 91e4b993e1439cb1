use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use surety_api::app::{AppServices, build_router};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory stores, on an ephemeral port.
        let app = build_router(Arc::new(AppServices::in_memory("SuretyDAO")));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_job(client: &reqwest::Client, server: &TestServer, employer: &str) -> Value {
    let res = client
        .post(server.url("/jobs"))
        .json(&json!({
            "title": "Deliver package",
            "amount_eth": 0.05,
            "employer_address": employer,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn banner_and_health() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let banner: Value = client
        .get(server.url("/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(banner, json!({"status": "ok", "service": "SuretyDAO Backend"}));
}

#[tokio::test]
async fn create_start_complete_then_oracle_read() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let job = create_job(&client, &server, "E1").await;
    assert_eq!(job["status"], "PENDING");
    assert!(job["worker_address"].is_null());
    let id = job["id"].as_str().unwrap().to_string();

    let res = client
        .post(server.url(&format!("/jobs/{id}/start")))
        .json(&json!({"worker_address": "W1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let started: Value = res.json().await.unwrap();
    assert_eq!(started["status"], "IN_PROGRESS");
    assert_eq!(started["worker_address"], "W1");

    let res = client
        .post(server.url(&format!("/jobs/{id}/complete")))
        .json(&json!({
            "worker_address": "W1",
            "end_location_lat": 6.4541,
            "end_location_lng": 3.3947,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": "success",
            "message": "Job verified",
            "new_worker_score": 10,
            "worker_stats_updated": true,
        })
    );

    let job: Value = client
        .get(server.url(&format!("/jobs/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(job["status"], "VERIFIED");

    let risk: Value = client
        .get(server.url("/risk/worker/W1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        risk,
        json!({"worker": "W1", "score": 10, "jobs_completed": 1, "status": "active"})
    );
}

#[tokio::test]
async fn start_accepts_query_parameter_and_rejects_second_start() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let job = create_job(&client, &server, "E1").await;
    let id = job["id"].as_str().unwrap();

    let res = client
        .post(server.url(&format!("/jobs/{id}/start?worker_address=W1")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(server.url(&format!("/jobs/{id}/start?worker_address=W2")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "invalid_transition");
}

#[tokio::test]
async fn start_without_worker_is_a_validation_error() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let job = create_job(&client, &server, "E1").await;
    let id = job["id"].as_str().unwrap();

    let res = client
        .post(server.url(&format!("/jobs/{id}/start")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn complete_pending_job_names_required_state() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let job = create_job(&client, &server, "E1").await;
    let id = job["id"].as_str().unwrap();

    let res = client
        .post(server.url(&format!("/jobs/{id}/complete")))
        .json(&json!({
            "worker_address": "W1",
            "end_location_lat": 1.0,
            "end_location_lng": 1.0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "invalid_transition");
    assert!(err["message"].as_str().unwrap().contains("IN_PROGRESS"));
}

#[tokio::test]
async fn unknown_and_malformed_job_ids() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/jobs/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(server.url("/jobs/0190f3a2-7b7c-7cc4-9f3e-2a1b3c4d5e6f"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "not_found");
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/jobs"))
        .json(&json!({"title": "Free work", "amount_eth": 0, "employer_address": "E1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn unknown_worker_gets_neutral_score() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let risk: Value = client
        .get(server.url("/risk/worker/0xnobody"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        risk,
        json!({"worker": "0xnobody", "score": 0, "jobs_completed": 0, "status": "unknown"})
    );

    let recalculated: Value = client
        .post(server.url("/risk/calculate/0xnobody"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(recalculated, json!({"worker": "0xnobody", "new_score": 0}));
}

#[tokio::test]
async fn list_filters_by_employer_and_status() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let a = create_job(&client, &server, "E1").await;
    create_job(&client, &server, "E2").await;

    let listed: Vec<Value> = client
        .get(server.url("/jobs?employer=E1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], a["id"]);

    let listed: Vec<Value> = client
        .get(server.url("/jobs?status=in_progress"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    let res = client
        .get(server.url("/jobs?status=FUNDED"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_registration_keeps_role_fixed() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/users"))
        .json(&json!({"wallet_address": "0xw", "role": "WORKER", "email": "w@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.url("/users"))
        .json(&json!({"wallet_address": "0xw", "role": "WORKER"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let again: Value = res.json().await.unwrap();
    assert_eq!(again["email"], "w@example.com");

    let res = client
        .post(server.url("/users"))
        .json(&json!({"wallet_address": "0xw", "role": "EMPLOYER"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let user: Value = client
        .get(server.url("/users/0xw"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(user["role"], "WORKER");
    assert_eq!(user["email"], "w@example.com");
    assert_eq!(user["total_jobs_completed"], 0);

    let res = client.get(server.url("/users/0xghost")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deposit_webhook_acknowledges_transaction() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let ack: Value = client
        .post(server.url("/webhooks/deposit"))
        .json(&json!({
            "transaction_hash": "0xdeadbeef",
            "amount": 0.05,
            "sender": "0xemployer",
            "job_id": "42",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ack, json!({"received": true, "tx": "0xdeadbeef"}));
}
