//! Speech-to-text providers for earshot.
//!
//! Every backend sits behind the [`Transcriber`] trait. The provider is picked
//! at runtime from configuration by [`SttFactory`], which resolves the
//! module's credentials and language into a [`ProviderConfig`] and hands it to
//! the matching constructor.

mod chunked;
mod cloud;
mod credential;
mod factory;
mod hosted;
mod http_recognizer;
mod provider;
mod recognizer;
mod server;
mod settings;
mod yandex;

use async_trait::async_trait;
pub use chunked::{CHUNK_SIZE, HttpResponse, encode_chunked};
pub use cloud::CloudStt;
pub use credential::{Credential, CredentialKind};
pub use earshot_audio::{AudioError, AudioSource};
pub use factory::{Backends, SttFactory};
pub use hosted::{HostedApi, MycroftDeepSpeechStt, MycroftStt};
pub use http_recognizer::{Endpoints, HttpRecognizer};
pub use provider::ProviderId;
pub use recognizer::{AudioFormat, Backend, RecognitionRequest, Recognizer};
pub use server::{DeepSpeechServerStt, KaldiStt};
pub use settings::ProviderConfig;
use thiserror::Error;
pub use yandex::{SpeechRequest, SpeechSource, YandexStt, select_transcript};

/// Errors that can occur during transcription.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Unknown stt module: {0}")]
    UnknownProvider(String),

    #[error("{provider} is currently English only, got language {language}")]
    UnsupportedLanguage {
        provider: &'static str,
        language: String,
    },

    #[error("stt module {module} has no {setting} configured")]
    MissingSetting {
        module: &'static str,
        setting: &'static str,
    },

    #[error("Invalid credential: {0}")]
    Credential(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Speech was not recognized")]
    Unintelligible,

    #[error("Speech recognition failed: {0}")]
    Speech(String),

    #[error("Neither file name nor bytes provided")]
    MissingAudio,

    #[error("Audio encoding failed: {0}")]
    Audio(#[from] AudioError),
}

/// Result type for transcription operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// Trait for transcription backends.
///
/// Implementations are stateless across calls, so one instance may serve
/// many sequential requests.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe audio to text.
    ///
    /// # Arguments
    /// * `audio` - Captured audio; the provider asks it for the encoding its
    ///   backend accepts.
    /// * `language` - Overrides the configured language for this call only.
    ///
    /// Returns `Ok(None)` only for backends that report "no usable result"
    /// instead of failing.
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>>;

    /// Returns the name of this transcriber for logging/debugging.
    fn name(&self) -> &str;
}
