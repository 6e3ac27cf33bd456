//! Yandex SpeechKit over a hand-framed chunked HTTP upload.
//!
//! The `asr_xml` endpoint takes the WAV body with chunked transfer encoding
//! and answers with an XML document of scored variants:
//!
//! ```xml
//! <recognitionResults success="1">
//!     <variant confidence="0.9">turn on the lights</variant>
//! </recognitionResults>
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use earshot_audio::AudioSource;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::chunked::{CHUNK_SIZE, HttpResponse, encode_chunked, request_head};
use crate::settings::ProviderConfig;
use crate::{Result, TranscribeError, Transcriber};

const HOST: &str = "asr.yandex.net";
const PORT: u16 = 80;
const PATH: &str = "/asr_xml";
const DEFAULT_TOPIC: &str = "notes";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the audio for a request comes from.
#[derive(Debug, Clone)]
pub enum SpeechSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// One recognition call.
#[derive(Debug, Clone)]
pub struct SpeechRequest<'a> {
    pub key: &'a str,
    pub source: SpeechSource,
    /// Generated when absent.
    pub request_id: Option<String>,
    pub topic: &'a str,
    pub language: &'a str,
}

pub struct YandexStt {
    config: ProviderConfig,
    host: String,
    port: u16,
    timeout: Duration,
}

impl YandexStt {
    pub fn new(config: ProviderConfig) -> Self {
        let timeout = config.timeout().unwrap_or(DEFAULT_TIMEOUT);
        Self {
            config,
            host: HOST.to_string(),
            port: PORT,
            timeout,
        }
    }

    /// Send requests to another host, e.g. a local test server.
    pub fn with_endpoint(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub async fn speech_to_text(&self, request: SpeechRequest<'_>) -> Result<String> {
        let audio = match request.source {
            SpeechSource::Path(path) => tokio::fs::read(&path).await?,
            SpeechSource::Bytes(bytes) => bytes,
        };
        if audio.is_empty() {
            return Err(TranscribeError::MissingAudio);
        }

        let request_id = request
            .request_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let path = format!(
            "{}?uuid={}&key={}&topic={}&lang={}",
            PATH,
            urlencoding::encode(&request_id),
            urlencoding::encode(request.key),
            urlencoding::encode(request.topic),
            urlencoding::encode(request.language),
        );
        debug!(
            host = %self.host,
            request_id = %request_id,
            audio_bytes = audio.len(),
            language = request.language,
            "Uploading audio to SpeechKit"
        );

        let raw = tokio::time::timeout(self.timeout, self.exchange(&path, &audio))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("{}:{} did not answer within {:?}", self.host, self.port, self.timeout),
                )
            })??;

        let response = HttpResponse::parse(&raw)?;
        let body = response.body_text();
        if response.status == 200 {
            select_transcript(&body)
        } else {
            Err(TranscribeError::Speech(format!(
                "Unknown error.\nCode: {}\n\n{}",
                response.status, body
            )))
        }
    }

    async fn exchange(&self, path: &str, audio: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream
            .write_all(request_head(&self.host, path, "audio/x-wav").as_bytes())
            .await?;
        stream.write_all(&encode_chunked(audio, CHUNK_SIZE)).await?;
        stream.flush().await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        Ok(raw)
    }
}

/// Text of the highest-confidence variant in an `asr_xml` response.
///
/// Ties keep the earliest variant.
pub fn select_transcript(body: &str) -> Result<String> {
    let document = roxmltree::Document::parse(body)
        .map_err(|e| TranscribeError::MalformedResponse(format!("{e}: {body}")))?;
    let root = document.root_element();

    let success = root
        .attribute("success")
        .and_then(|value| value.trim().parse::<i64>().ok());
    if success != Some(1) {
        return Err(TranscribeError::Speech(format!(
            "No text found.\n\nResponse:\n{body}"
        )));
    }

    let mut best: Option<String> = None;
    let mut max_confidence = f64::NEG_INFINITY;
    for variant in root.children().filter(|node| node.is_element()) {
        let confidence = variant
            .attribute("confidence")
            .unwrap_or_default()
            .trim()
            .parse::<f64>()
            .map_err(|_| {
                TranscribeError::MalformedResponse(format!(
                    "variant without numeric confidence: {body}"
                ))
            })?;
        if confidence > max_confidence {
            max_confidence = confidence;
            best = Some(variant.text().unwrap_or_default().to_string());
        }
    }

    best.ok_or_else(|| TranscribeError::Speech(format!("No text found.\n\nResponse:\n{body}")))
}

#[async_trait]
impl Transcriber for YandexStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let key = self.config.token().unwrap_or_default();
        let wav = audio.wav_data(None)?;

        let text = self
            .speech_to_text(SpeechRequest {
                key,
                source: SpeechSource::Bytes(wav),
                request_id: None,
                topic: self.config.topic().unwrap_or(DEFAULT_TOPIC),
                language: self.config.language_for(language),
            })
            .await?;
        Ok(Some(text))
    }

    fn name(&self) -> &str {
        "ya_cloud"
    }
}

#[cfg(test)]
mod tests {
    use earshot_audio::PcmAudio;
    use earshot_core::ModuleConfig;
    use tokio::net::TcpListener;

    use super::*;
    use crate::credential::Credential;

    const RESULTS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<recognitionResults success="1">
    <variant confidence="0.5">to the lights</variant>
    <variant confidence="0.9">turn on the lights</variant>
    <variant confidence="0.9">turn on the light</variant>
    <variant confidence="0.3">turn the lights</variant>
</recognitionResults>"#;

    fn provider(timeout: Option<u64>) -> YandexStt {
        YandexStt::new(ProviderConfig::new(
            "ru-RU",
            Credential::None,
            ModuleConfig {
                token: Some("secret key".to_string()),
                timeout,
                ..Default::default()
            },
        ))
    }

    /// Accept one connection, capture the request, answer with `response`.
    async fn serve_once(response: String) -> (u16, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !request.ends_with(b"0\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (port, handle)
    }

    #[test]
    fn test_highest_confidence_first_wins_ties() {
        assert_eq!(select_transcript(RESULTS).unwrap(), "turn on the lights");
    }

    #[test]
    fn test_unsuccessful_response_is_speech_error() {
        let body = r#"<recognitionResults success="0" />"#;
        let err = select_transcript(body).unwrap_err();
        assert!(matches!(err, TranscribeError::Speech(message) if message.starts_with("No text found")));
    }

    #[test]
    fn test_no_variants_is_speech_error() {
        let body = r#"<recognitionResults success="1"></recognitionResults>"#;
        assert!(matches!(
            select_transcript(body),
            Err(TranscribeError::Speech(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_bytes_are_rejected() {
        let err = provider(None)
            .speech_to_text(SpeechRequest {
                key: "k",
                source: SpeechSource::Bytes(Vec::new()),
                request_id: None,
                topic: DEFAULT_TOPIC,
                language: "ru-RU",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::MissingAudio));
    }

    #[tokio::test]
    async fn test_uploads_chunked_wav_and_parses_xml() {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: {}\r\n\r\n{}",
            RESULTS.len(),
            RESULTS
        );
        let (port, server) = serve_once(response).await;

        let stt = provider(Some(5)).with_endpoint("127.0.0.1", port);
        let audio = PcmAudio::new(vec![1, -1].repeat(1000), 16000, 1).unwrap();
        let text = stt.execute(&audio, None).await.unwrap();
        assert_eq!(text.as_deref(), Some("turn on the lights"));

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("POST /asr_xml?uuid="));
        assert!(request.contains("&key=secret%20key&topic=notes&lang=ru-RU HTTP/1.1\r\n"));
        assert!(request.contains("Transfer-Encoding: chunked\r\n"));
        assert!(request.contains("Content-Type: audio/x-wav\r\n"));
        assert!(request.contains("RIFF"));
        assert!(request.ends_with("\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_error_status_carries_code_and_body() {
        let response =
            "HTTP/1.1 403 Forbidden\r\nContent-Length: 11\r\n\r\ninvalid key".to_string();
        let (port, _server) = serve_once(response).await;

        let stt = provider(Some(5)).with_endpoint("127.0.0.1", port);
        let err = stt
            .speech_to_text(SpeechRequest {
                key: "k",
                source: SpeechSource::Bytes(b"RIFF".to_vec()),
                request_id: Some("abc".to_string()),
                topic: "queries",
                language: "en-US",
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TranscribeError::Speech(message) if message == "Unknown error.\nCode: 403\n\ninvalid key"
        ));
    }

    #[tokio::test]
    async fn test_missing_token_is_sent_empty() {
        let response = format!(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: {}\r\n\r\n{}",
            "no key".len(),
            "no key"
        );
        let (port, server) = serve_once(response).await;

        let stt = YandexStt::new(ProviderConfig::new(
            "ru-RU",
            Credential::None,
            ModuleConfig {
                timeout: Some(5),
                ..Default::default()
            },
        ))
        .with_endpoint("127.0.0.1", port);
        let audio = PcmAudio::new(vec![0; 160], 16000, 1).unwrap();
        let err = stt.execute(&audio, None).await.unwrap_err();
        assert!(matches!(err, TranscribeError::Speech(message) if message.contains("Code: 401")));

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.contains("&key=&topic=notes&lang=ru-RU HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn test_reads_audio_from_path_with_caller_request_id() {
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
            RESULTS.len(),
            RESULTS
        );
        let (port, server) = serve_once(response).await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("command.wav");
        std::fs::write(&path, b"RIFF-recorded-command-WAVE").unwrap();

        let stt = provider(Some(5)).with_endpoint("127.0.0.1", port);
        let text = stt
            .speech_to_text(SpeechRequest {
                key: "k",
                source: SpeechSource::Path(path),
                request_id: Some("abc".to_string()),
                topic: DEFAULT_TOPIC,
                language: "ru-RU",
            })
            .await
            .unwrap();
        assert_eq!(text, "turn on the lights");

        let request = String::from_utf8_lossy(&server.await.unwrap()).into_owned();
        assert!(request.starts_with("POST /asr_xml?uuid=abc&key=k&"));
        assert!(request.contains("\r\n1a\r\nRIFF-recorded-command-WAVE\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        std::fs::write(&path, b"").unwrap();

        let err = provider(None)
            .speech_to_text(SpeechRequest {
                key: "k",
                source: SpeechSource::Path(path),
                request_id: None,
                topic: DEFAULT_TOPIC,
                language: "ru-RU",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::MissingAudio));
    }
}
