//! Providers for self-hosted recognition servers reached over plain HTTP POST.

use std::sync::LazyLock;

use async_trait::async_trait;
use earshot_audio::AudioSource;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::settings::{ProviderConfig, ensure_english, http_client};
use crate::{Result, TranscribeError, Transcriber};

static NOISE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[noise\]\s*").unwrap());

/// A self-hosted DeepSpeech server. English only.
pub struct DeepSpeechServerStt {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl DeepSpeechServerStt {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transcriber for DeepSpeechServerStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let language = self.config.language_for(language);
        ensure_english("DeepSpeech", language)?;

        let uri = self.config.uri().ok_or(TranscribeError::MissingSetting {
            module: "deepspeech_server",
            setting: "uri",
        })?;
        let wav = audio.wav_data(None)?;
        debug!(uri, audio_bytes = wav.len(), "Posting audio to DeepSpeech server");

        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "audio/wav")
            .body(wav)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TranscribeError::Api(format!(
                "DeepSpeech server returned {}: {}",
                status, body
            )));
        }

        Ok(Some(body))
    }

    fn name(&self) -> &str {
        "deepspeech_server"
    }
}

/// A Kaldi gstreamer server.
///
/// A response that cannot be read as `{"hypotheses": [{"utterance": ...}]}`
/// yields `Ok(None)` rather than an error. Failures to send the request still
/// propagate.
pub struct KaldiStt {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl KaldiStt {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

/// Best utterance with `[noise]` markers collapsed, or `None`.
///
/// Only `hypotheses[0].utterance` is read; later hypotheses may have any shape.
fn parse_hypotheses(body: &str) -> Option<String> {
    let response: serde_json::Value = serde_json::from_str(body).ok()?;
    let utterance = response["hypotheses"][0]["utterance"].as_str()?;
    Some(NOISE_MARKER.replace_all(utterance, " ").trim().to_string())
}

#[async_trait]
impl Transcriber for KaldiStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let language = self.config.language_for(language);
        let uri = self.config.uri().ok_or(TranscribeError::MissingSetting {
            module: "kaldi",
            setting: "uri",
        })?;
        let wav = audio.wav_data(None)?;
        debug!(uri, language, audio_bytes = wav.len(), "Posting audio to Kaldi server");

        let response = self
            .client
            .post(uri)
            .header(CONTENT_TYPE, "audio/wav")
            .body(wav)
            .send()
            .await?;

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to read Kaldi response, returning no transcript");
                return Ok(None);
            }
        };

        let transcript = parse_hypotheses(&body);
        if transcript.is_none() {
            warn!(body = %body, "Unexpected Kaldi response, returning no transcript");
        }
        Ok(transcript)
    }

    fn name(&self) -> &str {
        "kaldi"
    }
}

#[cfg(test)]
mod tests {
    use earshot_audio::PcmAudio;
    use earshot_core::ModuleConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credential::Credential;

    fn config(uri: Option<String>) -> ProviderConfig {
        ProviderConfig::new(
            "en-US",
            Credential::None,
            ModuleConfig {
                uri,
                ..Default::default()
            },
        )
    }

    fn audio() -> PcmAudio {
        PcmAudio::new(vec![10, -10].repeat(800), 16000, 1).unwrap()
    }

    #[test]
    fn test_noise_marker_is_collapsed() {
        let body = r#"{"hypotheses":[{"utterance":"hello [noise] world"}]}"#;
        assert_eq!(parse_hypotheses(body).as_deref(), Some("hello world"));

        let body = r#"{"hypotheses":[{"utterance":"[noise] turn on the lights [noise]"},{"utterance":"other"}]}"#;
        assert_eq!(parse_hypotheses(body).as_deref(), Some("turn on the lights"));
    }

    #[test]
    fn test_only_first_hypothesis_must_be_well_formed() {
        let body = r#"{"status":0,"hypotheses":[{"utterance":"hello [noise] world"},{"likelihood":-3.2}]}"#;
        assert_eq!(parse_hypotheses(body).as_deref(), Some("hello world"));

        let body = r#"{"hypotheses":[{"likelihood":-3.2},{"utterance":"second"}]}"#;
        assert_eq!(parse_hypotheses(body), None);
    }

    #[test]
    fn test_unexpected_shapes_yield_none() {
        assert_eq!(parse_hypotheses(r#"{"status":0}"#), None);
        assert_eq!(parse_hypotheses(r#"{"hypotheses":[]}"#), None);
        assert_eq!(parse_hypotheses("<html>502</html>"), None);
    }

    #[tokio::test]
    async fn test_kaldi_roundtrip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/client/dynamic/recognize"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"status":0,"hypotheses":[{"utterance":"hello [noise] world"}],"id":"abc"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let stt = KaldiStt::new(config(Some(format!(
            "{}/client/dynamic/recognize",
            server.uri()
        ))))
        .unwrap();
        let text = stt.execute(&audio(), None).await.unwrap();
        assert_eq!(text.as_deref(), Some("hello world"));
    }

    #[tokio::test]
    async fn test_kaldi_missing_hypotheses_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("decoder crashed"))
            .mount(&server)
            .await;

        let stt = KaldiStt::new(config(Some(server.uri()))).unwrap();
        assert_eq!(stt.execute(&audio(), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deepspeech_server_returns_raw_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/stt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("set a timer"))
            .expect(1)
            .mount(&server)
            .await;

        let stt = DeepSpeechServerStt::new(config(Some(format!("{}/stt", server.uri())))).unwrap();
        let text = stt.execute(&audio(), Some("en")).await.unwrap();
        assert_eq!(text.as_deref(), Some("set a timer"));
    }

    #[tokio::test]
    async fn test_deepspeech_server_is_english_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let stt = DeepSpeechServerStt::new(config(Some(server.uri()))).unwrap();
        let err = stt.execute(&audio(), Some("fr-FR")).await.unwrap_err();
        assert!(matches!(err, TranscribeError::UnsupportedLanguage { .. }));
    }

    #[tokio::test]
    async fn test_missing_uri_is_reported() {
        let stt = DeepSpeechServerStt::new(config(None)).unwrap();
        let err = stt.execute(&audio(), None).await.unwrap_err();
        assert!(matches!(
            err,
            TranscribeError::MissingSetting { setting: "uri", .. }
        ));
    }
}
