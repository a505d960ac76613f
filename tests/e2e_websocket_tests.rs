//! End-to-end tests for the scheduler's websocket endpoint: outbound
//! lifecycle broadcasts and inbound event ingestion over the same socket.

mod common;

use common::{SchedulerServer, TestClient};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(port: u16) -> WsStream {
    let url = format!("ws://127.0.0.1:{}/v1/ws", port);
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect websocket");
    stream
}

/// Next text frame as JSON, failing the test after a timeout.
async fn next_json(stream: &mut WsStream) -> Value {
    let deadline = Duration::from_secs(3);
    loop {
        let msg = tokio::time::timeout(deadline, stream.next())
            .await
            .expect("Timed out waiting for websocket message")
            .expect("Websocket closed unexpectedly")
            .expect("Websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Non-JSON websocket message");
        }
    }
}

fn future_timestamp() -> String {
    (chrono::Utc::now() + chrono::Duration::minutes(5)).to_rfc3339()
}

#[tokio::test]
async fn job_creation_is_broadcast() {
    let server = SchedulerServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut ws = connect(server.port).await;

    let job: Value = client
        .create_job("task-1", &future_timestamp())
        .await
        .json()
        .await
        .unwrap();

    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "job.created");
    assert_eq!(msg["payload"]["id"], job["id"]);
    assert_eq!(msg["payload"]["taskId"], "task-1");
}

#[tokio::test]
async fn execution_broadcasts_executed_then_completed() {
    let server = SchedulerServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let job: Value = client
        .create_job("task-1", &future_timestamp())
        .await
        .json()
        .await
        .unwrap();
    let id = job["id"].as_str().unwrap();

    let mut ws = connect(server.port).await;
    client.execute_job(id).await;

    let executed = next_json(&mut ws).await;
    assert_eq!(executed["type"], "job.executed");
    assert_eq!(executed["payload"]["id"], job["id"]);
    assert_eq!(executed["payload"]["status"], "success");

    let completed = next_json(&mut ws).await;
    assert_eq!(completed["type"], "job.completed");
    assert!(completed["payload"]["durationMs"].is_number());
}

#[tokio::test]
async fn inbound_task_event_schedules_a_job() {
    let server = SchedulerServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut ws = connect(server.port).await;

    let envelope = json!({
        "type": "task.event",
        "payload": {
            "type": "task.created",
            "taskId": "task-ws",
            "data": { "title": "t" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }
    });
    ws.send(Message::text(envelope.to_string())).await.unwrap();

    // The duplex socket also receives the resulting broadcast.
    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "job.created");
    assert_eq!(msg["payload"]["taskId"], "task-ws");

    let jobs: Value = client.jobs_for_task("task-ws").await.json().await.unwrap();
    assert_eq!(jobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn non_event_messages_are_ignored() {
    let server = SchedulerServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let mut ws = connect(server.port).await;

    ws.send(Message::text(json!({ "type": "ping" }).to_string()))
        .await
        .unwrap();
    ws.send(Message::text("not json".to_string())).await.unwrap();

    // Connection stays usable: a broadcast still arrives.
    client.create_job("task-1", &future_timestamp()).await;
    let msg = next_json(&mut ws).await;
    assert_eq!(msg["type"], "job.created");
}
