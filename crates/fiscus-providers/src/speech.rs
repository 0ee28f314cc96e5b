//! Text-to-speech client.
//!
//! Synthesizes assistant replies via the OpenAI speech endpoint. The
//! speaking flag is per-instance state, not process-global, so multiple
//! clients never interfere.

use fiscus_core::config::SpeechConfig;
use fiscus_core::error::FiscusError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const SPEECH_MODEL: &str = "tts-1";

/// Text-to-speech client. Holds the "currently speaking" flag as
/// instance state.
pub struct SpeechClient {
    client: reqwest::Client,
    api_key: String,
    voice: String,
    speaking: AtomicBool,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

impl SpeechClient {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            voice: config.voice.clone(),
            speaking: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Stop the current utterance. In-flight synthesis requests are not
    /// aborted; only the speaking flag is cleared.
    pub fn stop(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    /// Synthesize `text` and return the audio bytes (mp3).
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, FiscusError> {
        if !self.is_configured() {
            return Err(FiscusError::Provider(
                "speech: no API key configured".to_string(),
            ));
        }

        // A new utterance supersedes the previous one.
        self.speaking.store(true, Ordering::SeqCst);

        let body = SpeechRequest {
            model: SPEECH_MODEL,
            input: text,
            voice: &self.voice,
        };

        debug!("speech: POST /audio/speech voice={}", self.voice);

        let result = async {
            let resp = self
                .client
                .post(SPEECH_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .map_err(|e| FiscusError::Provider(format!("speech request failed: {e}")))?;

            if !resp.status().is_success() {
                let status = resp.status();
                return Err(FiscusError::Provider(format!(
                    "speech returned {status}"
                )));
            }

            let bytes = resp
                .bytes()
                .await
                .map_err(|e| FiscusError::Provider(format!("speech: failed to read audio: {e}")))?;
            Ok(bytes.to_vec())
        }
        .await;

        self.speaking.store(false, Ordering::SeqCst);
        result
    }
}
