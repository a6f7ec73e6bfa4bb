//! Text generation.
//!
//! A [`TextGenerator`] turns a prompt into a JSON object. The pipeline only
//! accepts an object carrying a non-empty string `content`; anything else is
//! [`ReplyError::MalformedOutput`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ReplyError;

/// Token cap for a single reply.
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.7;

#[async_trait]
pub trait TextGenerator: Send + Sync + 'static {
    /// Produce the raw generator output for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Value, ReplyError>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Extract the reply text from generator output.
pub fn parse_generator_output(output: &Value) -> Result<String, ReplyError> {
    let Some(obj) = output.as_object() else {
        return Err(ReplyError::MalformedOutput("output is not a JSON object".into()));
    };
    match obj.get("content") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(ReplyError::MalformedOutput("content is empty".into())),
        Some(_) => Err(ReplyError::MalformedOutput("content is not a string".into())),
        None => Err(ReplyError::MalformedOutput("content is missing".into())),
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/chat/completions` endpoint directly.
pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("cloelia-node/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<Value, ReplyError> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ReplyError::Generation(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReplyError::Generation(format!(
                "chat completions returned {status}"
            )));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ReplyError::MalformedOutput(e.to_string()))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(json!({ "role": "assistant", "content": content.trim() }))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ---------------------------------------------------------------------------
// External bridge process
// ---------------------------------------------------------------------------

/// Runs an external command with the prompt as its final argument. Its
/// stdout must be exactly one JSON object.
///
/// The child is killed if the caller's timeout drops the future.
pub struct BridgeGenerator {
    program: String,
    args: Vec<String>,
}

impl BridgeGenerator {
    /// `command` is split on whitespace, e.g. `"node node_clients/gpt_bridge.mjs"`.
    /// Returns `None` for a blank command.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl TextGenerator for BridgeGenerator {
    async fn generate(&self, prompt: &str) -> Result<Value, ReplyError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ReplyError::Generation(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReplyError::Generation(format!(
                "bridge exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_bridge_stdout(&stdout)
    }

    fn name(&self) -> &'static str {
        "bridge"
    }
}

/// The whole of stdout, trimmed, must be one JSON object. Progress output or
/// anything else around it is rejected.
fn parse_bridge_stdout(stdout: &str) -> Result<Value, ReplyError> {
    let trimmed = stdout.trim();
    if !trimmed.starts_with('{') {
        return Err(ReplyError::MalformedOutput(
            "bridge output is not a JSON object".into(),
        ));
    }
    serde_json::from_str(trimmed)
        .map_err(|e| ReplyError::MalformedOutput(format!("bridge output is not valid JSON: {e}")))
}
