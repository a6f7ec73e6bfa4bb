//! Narrated reply pipeline: message → text generator → speech → MP3 on disk.
//!
//! | Step | Failure |
//! |------|---------|
//! | Enrich the prompt with a stored knowledge fact | ignored (logged) |
//! | [`TextGenerator::generate`] | [`ReplyError::Generation`] / [`ReplyError::Timeout`] |
//! | [`parse_generator_output`] | [`ReplyError::MalformedOutput`] |
//! | [`SpeechSynthesizer::synthesize`] | [`ReplyError::Synthesis`] / [`ReplyError::Timeout`] |
//! | Write `reply_XXXXXXXX.mp3` | [`ReplyError::Io`] |
//!
//! Audio is written to a temporary name and renamed into place, so a failed
//! request never leaves a partial file under the audio directory.

pub mod llm;
pub mod tts;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use llm::{parse_generator_output, BridgeGenerator, OpenAiGenerator, TextGenerator};
pub use tts::{ElevenLabsClient, SpeechSynthesizer};

use crate::config::NodeConfig;
use crate::storage::Storage;

/// URL prefix under which generated audio is served.
pub const AUDIO_ROUTE: &str = "/gpt/audio";

#[derive(Debug, thiserror::Error)]
pub enum ReplyError {
    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("text generator returned malformed output: {0}")]
    MalformedOutput(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("audio file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A generated reply and the file holding its narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub audio_file: String,
}

impl Reply {
    pub fn audio_url(&self) -> String {
        format!("{AUDIO_ROUTE}/{}", self.audio_file)
    }
}

pub struct ReplyPipeline {
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    storage: Arc<dyn Storage>,
    audio_dir: PathBuf,
    timeout: Duration,
}

impl ReplyPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        storage: Arc<dyn Storage>,
        audio_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            storage,
            audio_dir: audio_dir.into(),
            timeout,
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Run the full pipeline for an already-validated `message`.
    pub async fn generate(&self, message: &str) -> Result<Reply, ReplyError> {
        let prompt = self.enrich(message).await;

        let output = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| ReplyError::Timeout("text generation"))??;
        let text = parse_generator_output(&output)?;
        tracing::debug!(generator = self.generator.name(), chars = text.len(), "reply text generated");

        let audio = tokio::time::timeout(self.timeout, self.synthesizer.synthesize(&text))
            .await
            .map_err(|_| ReplyError::Timeout("speech synthesis"))??;

        let audio_file = self.store_audio(&audio).await?;
        tracing::info!(%audio_file, bytes = audio.len(), "narrated reply written");

        Ok(Reply { text, audio_file })
    }

    async fn enrich(&self, message: &str) -> String {
        match self.storage.knowledge_fact().await {
            Ok(Some(fact)) if !fact.trim().is_empty() => {
                format!("{message}\n\n[Consider this fact: {}]", fact.trim())
            }
            Ok(_) => message.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "knowledge lookup failed; using the bare message");
                message.to_string()
            }
        }
    }

    async fn store_audio(&self, audio: &[u8]) -> Result<String, ReplyError> {
        tokio::fs::create_dir_all(&self.audio_dir).await?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("reply_{}.mp3", &id[..8]);
        let final_path = self.audio_dir.join(&name);
        let tmp_path = self.audio_dir.join(format!(".{name}.tmp"));

        if let Err(e) = write_then_rename(&tmp_path, &final_path, audio).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(name)
    }

    /// Resolve a client-supplied audio file name, or `None` if it is not a
    /// plain `.mp3` file name inside the audio directory.
    pub fn audio_path(&self, filename: &str) -> Option<PathBuf> {
        is_plain_audio_name(filename).then(|| self.audio_dir.join(filename))
    }
}

/// The configured text generator: the bridge process when
/// `CLOELIA_LLM_BRIDGE` is set, otherwise the chat completions client.
pub fn generator_from_config(config: &NodeConfig) -> Result<Arc<dyn TextGenerator>, ReplyError> {
    if let Some(command) = &config.llm_bridge {
        let bridge = BridgeGenerator::from_command_line(command)
            .ok_or_else(|| ReplyError::Generation("CLOELIA_LLM_BRIDGE is blank".into()))?;
        return Ok(Arc::new(bridge));
    }
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ReplyError::Generation("no chat completions API key".into()))?;
    let client = OpenAiGenerator::new(
        api_key,
        config.openai_base_url.clone(),
        config.llm_model.clone(),
        config.external_timeout(),
    )
    .map_err(|e| ReplyError::Generation(e.to_string()))?;
    Ok(Arc::new(client))
}

pub fn synthesizer_from_config(
    config: &NodeConfig,
) -> Result<Arc<dyn SpeechSynthesizer>, ReplyError> {
    let client = ElevenLabsClient::new(
        config.elevenlabs_api_key.clone(),
        config.elevenlabs_voice_id.clone(),
        config.elevenlabs_base_url.clone(),
        config.external_timeout(),
    )
    .map_err(|e| ReplyError::Synthesis(e.to_string()))?;
    Ok(Arc::new(client))
}

async fn write_then_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(tmp, bytes).await?;
    tokio::fs::rename(tmp, dest).await
}

fn is_plain_audio_name(name: &str) -> bool {
    !name.starts_with('.')
        && name.ends_with(".mp3")
        && name.len() > ".mp3".len()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Deterministic generator and synthesizer doubles.

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;

    /// Returns the same output for every prompt and remembers the prompts.
    pub struct FixedGenerator {
        pub output: Value,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FixedGenerator {
        pub fn new(output: Value) -> Self {
            Self {
                output,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, prompt: &str) -> Result<Value, ReplyError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.output.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    pub struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<Value, ReplyError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    pub struct FixedSynthesizer(pub Vec<u8>);

    #[async_trait]
    impl SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ReplyError> {
            Ok(self.0.clone())
        }
    }

    pub struct FailingSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for FailingSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ReplyError> {
            Err(ReplyError::Synthesis("text-to-speech returned 401 Unauthorized".into()))
        }
    }
}
