//! Speech synthesis.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::ReplyError;

const MODEL_ID: &str = "eleven_monolingual_v1";

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + 'static {
    /// MP3 bytes for `text`.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ReplyError>;
}

/// ElevenLabs text-to-speech client.
pub struct ElevenLabsClient {
    http: reqwest::Client,
    api_key: String,
    voice_id: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: impl Into<String>,
        voice_id: impl Into<String>,
        base_url: impl Into<String>,
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
            voice_id: voice_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/text-to-speech/{}", self.base_url, self.voice_id)
    }
}

#[derive(Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ReplyError> {
        if text.trim().is_empty() {
            return Err(ReplyError::Synthesis("no text provided".into()));
        }

        let resp = self
            .http
            .post(self.endpoint())
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&SynthesisRequest {
                text,
                model_id: MODEL_ID,
            })
            .send()
            .await
            .map_err(|e| ReplyError::Synthesis(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ReplyError::Synthesis(format!(
                "text-to-speech returned {status}"
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ReplyError::Synthesis(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ReplyError::Synthesis("empty audio".into()));
        }
        Ok(bytes.to_vec())
    }
}
