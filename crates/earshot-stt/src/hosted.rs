//! Providers served by the platform's own hosted API.

use std::sync::Arc;

use async_trait::async_trait;
use earshot_audio::AudioSource;
use earshot_core::ServerConfig;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::recognizer::RECOGNITION_SAMPLE_RATE;
use crate::settings::{ProviderConfig, ensure_english};
use crate::{Result, TranscribeError, Transcriber};

/// Client for the hosted `/stt` and `/deepspeech` endpoints.
#[derive(Debug, Clone)]
pub struct HostedApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HostedApi {
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!(
                "{}/{}",
                server.url.trim_end_matches('/'),
                server.version.trim_matches('/')
            ),
            token: server.token.clone(),
        }
    }

    /// POST encoded audio and return up to `limit` hypotheses.
    pub async fn stt(
        &self,
        path: &str,
        audio: Vec<u8>,
        content_type: &str,
        language: &str,
        limit: u32,
    ) -> Result<Vec<String>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(
            url = %url,
            audio_bytes = audio.len(),
            language,
            "Sending audio to hosted stt"
        );

        let mut request = self
            .client
            .post(&url)
            .query(&[("lang", language), ("limit", &limit.to_string())])
            .header(CONTENT_TYPE, content_type)
            .body(audio);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Api(format!(
                "Hosted stt returned {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            TranscribeError::Api(format!("Hosted stt response ({e}): {body}"))
        })
    }
}

fn first_hypothesis(hypotheses: Vec<String>) -> Result<Option<String>> {
    hypotheses
        .into_iter()
        .next()
        .map(Some)
        .ok_or(TranscribeError::Unintelligible)
}

/// The platform's default hosted speech recognition.
pub struct MycroftStt {
    config: ProviderConfig,
    api: Arc<HostedApi>,
}

impl MycroftStt {
    pub fn new(config: ProviderConfig, api: Arc<HostedApi>) -> Self {
        Self { config, api }
    }
}

#[async_trait]
impl Transcriber for MycroftStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let language = self.config.language_for(language);

        let flac = match audio.flac_data(Some(RECOGNITION_SAMPLE_RATE)) {
            Ok(flac) => flac,
            Err(e) => {
                warn!(error = %e, "Resampled FLAC unavailable, sending native rate");
                audio.flac_data(None)?
            }
        };

        let hypotheses = self.api.stt("stt", flac, "audio/x-flac", language, 1).await?;
        first_hypothesis(hypotheses)
    }

    fn name(&self) -> &str {
        "mycroft"
    }
}

/// Hosted DeepSpeech. English only.
pub struct MycroftDeepSpeechStt {
    config: ProviderConfig,
    api: Arc<HostedApi>,
}

impl MycroftDeepSpeechStt {
    pub fn new(config: ProviderConfig, api: Arc<HostedApi>) -> Self {
        Self { config, api }
    }
}

#[async_trait]
impl Transcriber for MycroftDeepSpeechStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let language = self.config.language_for(language);
        ensure_english("DeepSpeech", language)?;

        let wav = audio.wav_data(None)?;
        let hypotheses = self.api.stt("deepspeech", wav, "audio/wav", language, 1).await?;
        first_hypothesis(hypotheses)
    }

    fn name(&self) -> &str {
        "mycroft_deepspeech"
    }
}
