//! End-to-end tests for the Cloelia node API.
//!
//! Each test spawns an ephemeral in-process node (real TCP, real HTTP) via
//! [`cloelia_conformance::spawn_node`] and exercises it with a `reqwest`
//! client. Text generation and speech synthesis are stubbed.
//!
//! # Coverage
//!
//! | Test | Area |
//! |------|------|
//! | `root_and_router_health` | health |
//! | `db_test_reports_connected` | health |
//! | `log_emotion_validates_input` | emotions |
//! | `analyze_with_no_history_is_no_pattern` | detection |
//! | `majority_emotion_yields_virtue` | detection |
//! | `tie_goes_to_most_recent_first_occurrence` | detection |
//! | `trigger_reads_back_through_feed` | detection + feed |
//! | `stored_triggers_decode_as_api_types` | trigger lookups |
//! | `n_requests_produce_n_firewall_entries` | firewall log |
//! | `eleventh_request_is_rejected` | firewall |
//! | `malformed_body_is_invalid_json` | errors |
//! | `reply_generates_and_serves_audio` | replies |
//! | `knowledge_fact_reaches_generator` | replies |
//! | `malformed_generator_output_is_500_and_writes_nothing` | replies |
//! | `audio_traversal_is_404` | replies |
//! | `graph_virtues_and_path` | graph |

use std::sync::Arc;

use cloelia::{ActionType, SymbolicTrigger};
use cloelia_conformance::{spawn_node, spawn_node_with, CannedGenerator, StubGenerator, STUB_AUDIO};
use cloelia_node::Storage;
use cloelia_node_api::{ErrorResponse, TriggerListResponse};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap()
}

async fn post(client: &reqwest::Client, url: &str, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

async fn get(client: &reqwest::Client, url: &str) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

async fn log_all(client: &reqwest::Client, base: &str, user_id: i64, emotions: &[&str]) {
    for emotion in emotions {
        let (status, _) = post(
            client,
            &format!("{base}/log-emotion"),
            json!({"user_id": user_id, "emotion": emotion}),
        )
        .await;
        assert_eq!(status, 200, "logging {emotion}");
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_and_router_health() {
    let node = spawn_node().await;
    let client = make_client();

    let (status, body) = get(&client, &node.url("/")).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Cloelia AI Agent System is online and operational.");

    let (status, body) = get(&client, &node.url("/cloelia/")).await;
    assert_eq!(status, 200);
    assert!(body["status"].is_string());
}

#[tokio::test]
async fn db_test_reports_connected() {
    let node = spawn_node().await;
    let (status, body) = get(&make_client(), &node.url("/db/test")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "connected");
}

// ---------------------------------------------------------------------------
// Emotions and detection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn log_emotion_validates_input() {
    let node = spawn_node().await;
    let client = make_client();

    let (status, body) = post(
        &client,
        &node.url("/log-emotion"),
        json!({"user_id": 3, "emotion": "  Fear ", "context_note": "dark alley"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Emotion logged successfully.");
    let stored = node.storage.recent_emotions(3, 5).await.unwrap();
    assert_eq!(stored[0].emotion, "fear");
    assert_eq!(stored[0].context_note.as_deref(), Some("dark alley"));

    for bad in [
        json!({"user_id": -1, "emotion": "fear"}),
        json!({"user_id": 3, "emotion": ""}),
        json!({"user_id": 3, "emotion": "<script>"}),
        json!({"user_id": 3, "emotion": "fear", "context_note": "x".repeat(2001)}),
    ] {
        let (status, body) = post(&client, &node.url("/log-emotion"), bad.clone()).await;
        assert_eq!(status, 400, "{bad}");
        assert_eq!(body["code"], "invalid_parameter");
    }
}

#[tokio::test]
async fn analyze_with_no_history_is_no_pattern() {
    let node = spawn_node().await;
    let (status, body) = post(
        &make_client(),
        &node.url("/analyze-emotion"),
        json!({"user_id": 41, "emotion": "fear"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({"message": "No symbolic pattern detected."}));
}

#[tokio::test]
async fn majority_emotion_yields_virtue() {
    let node = spawn_node().await;
    let client = make_client();
    // Chronological; most recent first this is happiness, anger, fear, anger, anger.
    log_all(&client, &node.base_url, 5, &["anger", "anger", "fear", "anger", "happiness"]).await;

    let (status, body) = post(
        &client,
        &node.url("/analyze-emotion"),
        json!({"user_id": 5, "emotion": "anger"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["emotion_detected"], "anger");
    assert_eq!(body["suggested_virtue"], "Patience");
    assert_eq!(body["action"], "reflection_prompt");
    assert!(body["trigger_id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn tie_goes_to_most_recent_first_occurrence() {
    let node = spawn_node().await;
    let client = make_client();
    // Most recent first: fear, anger, fear, anger, sadness.
    log_all(&client, &node.base_url, 6, &["sadness", "anger", "fear", "anger", "fear"]).await;

    let (_, body) = post(
        &client,
        &node.url("/analyze-emotion"),
        json!({"user_id": 6, "emotion": "fear"}),
    )
    .await;
    assert_eq!(body["emotion_detected"], "fear");
    assert_eq!(body["suggested_virtue"], "Courage");
}

#[tokio::test]
async fn trigger_reads_back_through_feed() {
    let node = spawn_node().await;
    let client = make_client();
    log_all(&client, &node.base_url, 8, &["disgust", "disgust", "surprise"]).await;

    let (_, detected) = post(
        &client,
        &node.url("/analyze-emotion"),
        json!({"user_id": 8, "emotion": "disgust"}),
    )
    .await;
    let trigger_id = detected["trigger_id"].as_i64().unwrap();

    let (status, feed) = get(&client, &node.url("/trigger-feed")).await;
    assert_eq!(status, 200);
    let entries = feed["log"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry["trigger_id"], trigger_id);
    assert_eq!(entry["user_id"], 8);
    assert_eq!(entry["emotion"], detected["emotion_detected"]);
    assert_eq!(entry["virtue"], detected["suggested_virtue"]);
    assert_eq!(entry["action"], detected["action"]);

    let stored = node.storage.get_trigger(trigger_id).await.unwrap().unwrap();
    assert_eq!(entry["timestamp"], stored.created_at.to_rfc3339());
    assert_eq!(stored.narration_file, "narration_empathy.mp3");
}

#[tokio::test]
async fn stored_triggers_decode_as_api_types() {
    let node = spawn_node().await;
    let client = make_client();
    log_all(&client, &node.base_url, 12, &["happiness"]).await;
    let (_, detected) = post(
        &client,
        &node.url("/analyze-emotion"),
        json!({"user_id": 12, "emotion": "happiness"}),
    )
    .await;
    let trigger_id = detected["trigger_id"].as_i64().unwrap();

    let trigger: SymbolicTrigger = client
        .get(node.url(&format!("/triggers/{trigger_id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trigger.user_id, 12);
    assert_eq!(trigger.symbol, "Compassion");
    assert_eq!(trigger.action_type, ActionType::ReflectionPrompt);
    assert_eq!(trigger.narration_file, "narration_compassion.mp3");

    let listed: TriggerListResponse = client
        .get(node.url("/users/12/triggers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.triggers, vec![trigger]);

    let resp = client.get(node.url("/triggers/424242")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.code, "not_found");
}

// ---------------------------------------------------------------------------
// Firewall
// ---------------------------------------------------------------------------

#[tokio::test]
async fn n_requests_produce_n_firewall_entries() {
    let node = spawn_node().await;
    let client = make_client();
    let n = 7;
    for i in 0..n {
        let (status, _) = get(&client, &node.url(&format!("/graph/virtues/anger?i={i}"))).await;
        assert_eq!(status, 200);
    }

    let (status, body) = get(&client, &node.url("/firewall-log")).await;
    assert_eq!(status, 200);
    let log = body["log"].as_array().unwrap();
    // The feed request logs itself before it reads.
    assert_eq!(log.len(), n + 1);
    for entry in &log[..n] {
        assert_eq!(entry["ip"], "127.0.0.1");
        assert_eq!(entry["path"], "/graph/virtues/anger");
        assert_eq!(entry["threat_detected"], false);
        assert!(entry["timestamp"].as_str().unwrap().contains('T'));
    }
    assert_eq!(log[n]["path"], "/firewall-log");
}

#[tokio::test]
async fn eleventh_request_is_rejected() {
    let node = spawn_node_with(10, Arc::new(StubGenerator)).await;
    let client = make_client();

    for i in 0..10 {
        let resp = client.get(node.url("/")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200, "request {i}");
    }
    let resp = client.get(node.url("/")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 429);
    let retry_after: u64 = resp.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "rate_limit_exceeded");
    assert_eq!(
        body["error"],
        "Cloelia has sensed an unnatural rhythm. Delay your inquiry."
    );
}

#[tokio::test]
async fn malformed_body_is_invalid_json() {
    let node = spawn_node().await;
    let resp = make_client()
        .post(node.url("/analyze-emotion"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "invalid_json");
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reply_generates_and_serves_audio() {
    let node = spawn_node().await;
    let client = make_client();

    let (status, body) = post(
        &client,
        &node.url("/gpt/generate-response"),
        json!({"message": "I keep losing my temper"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["response"]["text"], "Reflect: I keep losing my temper");
    let audio_url = body["response"]["audio_url"].as_str().unwrap();
    assert!(audio_url.starts_with("/gpt/audio/reply_"));
    assert!(audio_url.ends_with(".mp3"));

    let resp = client.get(node.url(audio_url)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers()["content-type"], "audio/mpeg");
    assert_eq!(&resp.bytes().await.unwrap()[..], STUB_AUDIO);
}

#[tokio::test]
async fn knowledge_fact_reaches_generator() {
    let node = spawn_node().await;
    node.storage
        .add_knowledge_fact("Patience is a form of action.")
        .await
        .unwrap();

    // The stub echoes only the first prompt line, so the reply is unchanged
    // while the audio is still produced.
    let (status, body) = post(
        &make_client(),
        &node.url("/gpt/generate-response"),
        json!({"message": "help"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["response"]["text"], "Reflect: help");
}

#[tokio::test]
async fn malformed_generator_output_is_500_and_writes_nothing() {
    let node = spawn_node_with(0, Arc::new(CannedGenerator(json!({"content": ""})))).await;
    let (status, body) = post(
        &make_client(),
        &node.url("/gpt/generate-response"),
        json!({"message": "hello"}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "upstream_error");

    let written = std::fs::read_dir(node.audio_dir())
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(written, 0);
}

#[tokio::test]
async fn audio_traversal_is_404() {
    let node = spawn_node().await;
    let client = make_client();
    for name in ["reply_deadbeef.mp3", "..%2F..%2Fetc%2Fpasswd", ".hidden.mp3"] {
        let resp = client
            .get(node.url(&format!("/gpt/audio/{name}")))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404, "{name}");
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[tokio::test]
async fn graph_virtues_and_path() {
    let node = spawn_node().await;
    let client = make_client();

    let (_, body) = get(&client, &node.url("/graph/virtues/surprise")).await;
    assert_eq!(body, json!({"emotion": "surprise", "virtues": ["focus"]}));

    let (_, body) = get(&client, &node.url("/graph/virtues/boredom")).await;
    assert_eq!(body["virtues"], json!([]));

    let (_, body) = get(&client, &node.url("/graph/path?from=fear&to=surprise")).await;
    assert_eq!(body["path"], json!(["fear", "courage", "focus", "surprise"]));

    let (_, body) = get(&client, &node.url("/graph/path?from=fear&to=nowhere")).await;
    assert_eq!(body["path"], json!([]));
}
