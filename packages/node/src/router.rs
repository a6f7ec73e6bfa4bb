//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use cloelia::SymbolicGraph;
use tower_http::trace::TraceLayer;

use crate::{
    config::NodeConfig,
    engine::SymbolicEngine,
    handlers::{emotions, graph, health, logs, reply, triggers, AppState},
    middleware::firewall::{firewall_middleware, Firewall, RateTracker},
    reply::{ReplyPipeline, SpeechSynthesizer, TextGenerator},
    request_log::JsonlLog,
    storage::Storage,
};

/// A ready-to-serve router plus the handles the caller must keep alive.
pub struct App {
    pub router: Router,
    /// Shared with the firewall layer; hand it to
    /// [`spawn_sweeper`](crate::middleware::firewall::spawn_sweeper).
    pub tracker: Arc<RateTracker>,
}

/// Wire storage, logs, the reply pipeline and the firewall into a router.
///
/// Opens (creating if needed) the firewall and symbolic logs under
/// `config.log_dir`.
pub fn build_app(
    config: NodeConfig,
    storage: Arc<dyn Storage>,
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> std::io::Result<App> {
    let firewall_log = JsonlLog::open(config.firewall_log_path())?;
    let memory_log = JsonlLog::open(config.symbolic_log_path())?;

    let tracker = Arc::new(RateTracker::new(
        config.rate_limit_per_minute,
        config.rate_window(),
    ));
    let firewall = Firewall {
        tracker: Arc::clone(&tracker),
        log: firewall_log.clone(),
        trust_proxy: config.trust_proxy,
    };

    let replies = ReplyPipeline::new(
        generator,
        synthesizer,
        Arc::clone(&storage),
        config.audio_dir.clone(),
        config.external_timeout(),
    );

    let state = AppState {
        engine: SymbolicEngine::new(Arc::clone(&storage), memory_log),
        storage,
        replies: Arc::new(replies),
        firewall_log,
        graph: Arc::new(SymbolicGraph::new()),
    };

    Ok(App {
        router: build_router(state, firewall),
        tracker,
    })
}

/// Build the complete application router with shared state.
pub fn build_router(state: AppState, firewall: Firewall) -> Router {
    Router::new()
        // Health
        .route("/", get(health::root))
        .route("/cloelia/", get(health::cloelia_status))
        .route("/db/test", get(health::db_test))
        // Emotions
        .route("/log-emotion", post(emotions::log_emotion))
        .route("/analyze-emotion", post(emotions::analyze_emotion))
        // Feeds
        .route("/firewall-log", get(logs::firewall_log))
        .route("/trigger-feed", get(logs::trigger_feed))
        // Stored triggers
        .route("/triggers/{trigger_id}", get(triggers::get_trigger))
        .route("/users/{user_id}/triggers", get(triggers::list_user_triggers))
        // Narrated replies
        .route("/gpt/generate-response", post(reply::generate_response))
        .route("/gpt/audio/{filename}", get(reply::serve_audio))
        // Symbolic graph
        .route("/graph/virtues/{emotion}", get(graph::virtues))
        .route("/graph/path", get(graph::path))
        .with_state(state)
        // Firewall wraps every route, including unknown paths.
        .layer(axum::middleware::from_fn(move |req, next| {
            firewall_middleware(firewall.clone(), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::Path;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::reply::test_support::{FixedGenerator, FixedSynthesizer};
    use crate::storage::{memory::MemoryStorage, seed_default_virtues};

    async fn test_app(dir: &Path, limit: u32, generator_output: Value) -> App {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        seed_default_virtues(storage.as_ref()).await.unwrap();
        let mut config = NodeConfig::for_data_dir(dir);
        config.rate_limit_per_minute = limit;
        build_app(
            config,
            storage,
            Arc::new(FixedGenerator::new(generator_output)),
            Arc::new(FixedSynthesizer(b"ID3narration".to_vec())),
        )
        .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;

        let resp = app.router.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(json_body(resp).await["message"].as_str().unwrap().contains("online"));

        let resp = app.router.clone().oneshot(get("/db/test")).await.unwrap();
        assert_eq!(json_body(resp).await, json!({"status": "connected"}));

        let resp = app.router.clone().oneshot(get("/cloelia/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn log_then_analyze_then_feed() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;

        for emotion in ["happiness", "anger", "fear", "anger", "Anger "] {
            let resp = app
                .router
                .clone()
                .oneshot(post_json("/log-emotion", json!({"user_id": 7, "emotion": emotion})))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = app
            .router
            .clone()
            .oneshot(post_json("/analyze-emotion", json!({"user_id": 7, "emotion": "anger"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["emotion_detected"], "anger");
        assert_eq!(body["suggested_virtue"], "Patience");
        assert_eq!(body["action"], "reflection_prompt");
        let trigger_id = body["trigger_id"].as_i64().unwrap();

        let resp = app.router.clone().oneshot(get("/trigger-feed")).await.unwrap();
        let feed = json_body(resp).await;
        let entry = &feed["log"][0];
        assert_eq!(entry["trigger_id"], trigger_id);
        assert_eq!(entry["user_id"], 7);
        assert_eq!(entry["emotion"], "anger");
        assert_eq!(entry["virtue"], "Patience");
    }

    #[tokio::test]
    async fn analyze_without_history_is_no_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;
        let resp = app
            .router
            .oneshot(post_json("/analyze-emotion", json!({"user_id": 99, "emotion": "fear"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            json_body(resp).await,
            json!({"message": "No symbolic pattern detected."})
        );
    }

    #[tokio::test]
    async fn invalid_input_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;

        let resp = app
            .router
            .clone()
            .oneshot(post_json("/log-emotion", json!({"user_id": 0, "emotion": "fear"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["code"], "invalid_parameter");

        let resp = app
            .router
            .clone()
            .oneshot(post_json("/log-emotion", json!({"user_id": 1})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["code"], "invalid_json");

        let resp = app
            .router
            .oneshot(post_json("/gpt/generate-response", json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn eleventh_request_is_rate_limited_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 10, json!({"content": "ok"})).await;

        for _ in 0..10 {
            let resp = app.router.clone().oneshot(get("/")).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = app.router.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key("retry-after"));
        let body = json_body(resp).await;
        assert_eq!(body["code"], "rate_limit_exceeded");
        assert_eq!(
            body["error"],
            "Cloelia has sensed an unnatural rhythm. Delay your inquiry."
        );

        // A different client is still admitted and sees all eleven lines.
        let req = Request::builder()
            .uri("/firewall-log")
            .header("x-forwarded-for", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        let resp = app.router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let entries = body["log"].as_array().unwrap();
        assert_eq!(entries.len(), 12);
        assert!(entries[..10].iter().all(|e| e["threat_detected"] == false));
        assert_eq!(entries[10]["threat_detected"], true);
        assert_eq!(entries[10]["ip"], "unknown");
        assert_eq!(entries[10]["path"], "/");
    }

    #[tokio::test]
    async fn firewall_log_includes_every_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;
        for path in ["/", "/cloelia/", "/does-not-exist"] {
            app.router.clone().oneshot(get(path)).await.unwrap();
        }
        let resp = app.router.oneshot(get("/firewall-log")).await.unwrap();
        let body = json_body(resp).await;
        let paths: Vec<&str> = body["log"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/", "/cloelia/", "/does-not-exist", "/firewall-log"]);
    }

    #[tokio::test]
    async fn reply_round_trip_serves_audio() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "Stand firm."})).await;

        let resp = app
            .router
            .clone()
            .oneshot(post_json("/gpt/generate-response", json!({"message": "I am scared"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["response"]["text"], "Stand firm.");
        let url = body["response"]["audio_url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/gpt/audio/reply_"));

        let resp = app.router.clone().oneshot(get(&url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "audio/mpeg");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ID3narration");

        let resp = app
            .router
            .oneshot(get("/gpt/audio/reply_00000000.mp3"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_generator_output_is_500_without_audio() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"refusal": "Empty response."})).await;
        let resp = app
            .router
            .oneshot(post_json("/gpt/generate-response", json!({"message": "hello"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let audio_dir = dir.path().join("audio");
        let count = std::fs::read_dir(&audio_dir).map(|d| d.count()).unwrap_or(0);
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn graph_queries() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;

        let resp = app
            .router
            .clone()
            .oneshot(get("/graph/virtues/Fear"))
            .await
            .unwrap();
        assert_eq!(
            json_body(resp).await,
            json!({"emotion": "fear", "virtues": ["courage"]})
        );

        let resp = app
            .router
            .clone()
            .oneshot(get("/graph/path?from=anger&to=resilience"))
            .await
            .unwrap();
        assert_eq!(
            json_body(resp).await,
            json!({"path": ["anger", "patience", "resilience"]})
        );

        let resp = app.router.oneshot(get("/graph/path?from=anger")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stored_triggers_by_id_and_by_user() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(dir.path(), 0, json!({"content": "ok"})).await;

        let mut ids = Vec::new();
        for emotion in ["fear", "sadness"] {
            let resp = app
                .router
                .clone()
                .oneshot(post_json("/log-emotion", json!({"user_id": 4, "emotion": emotion})))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let resp = app
                .router
                .clone()
                .oneshot(post_json("/analyze-emotion", json!({"user_id": 4, "emotion": emotion})))
                .await
                .unwrap();
            ids.push(json_body(resp).await["trigger_id"].as_i64().unwrap());
        }

        let resp = app
            .router
            .clone()
            .oneshot(get(&format!("/triggers/{}", ids[0])))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let trigger = json_body(resp).await;
        assert_eq!(trigger["user_id"], 4);
        assert_eq!(trigger["symbol"], "Courage");
        assert_eq!(trigger["emotion_match"], "fear");
        assert_eq!(trigger["action_type"], "reflection_prompt");
        assert_eq!(trigger["narration_file"], "narration_courage.mp3");

        // Most recent first: sadness after fear, then the cap applies.
        let resp = app
            .router
            .clone()
            .oneshot(get("/users/4/triggers?limit=1"))
            .await
            .unwrap();
        let body = json_body(resp).await;
        assert_eq!(body["user_id"], 4);
        let listed = body["triggers"].as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["trigger_id"], ids[1]);
        assert_eq!(listed[0]["symbol"], "Resilience");

        let resp = app.router.clone().oneshot(get("/triggers/9999")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["code"], "not_found");

        for bad in ["/triggers/abc", "/users/0/triggers", "/users/4/triggers?limit=x"] {
            let resp = app.router.clone().oneshot(get(bad)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{bad}");
            assert_eq!(json_body(resp).await["code"], "invalid_parameter", "{bad}");
        }
    }
}
