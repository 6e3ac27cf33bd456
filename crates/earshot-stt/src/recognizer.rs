//! Shared recognition client abstraction.
//!
//! The hosted-recognition family of providers does no protocol work of its
//! own. Each one encodes the audio the way its backend wants it and forwards
//! the bytes, its credential and the language through [`Recognizer`].

use async_trait::async_trait;
use earshot_audio::AudioSource;

use crate::Result;
use crate::credential::{Credential, CredentialKind};

/// Sample rate requested from the audio source for backends that need one.
pub const RECOGNITION_SAMPLE_RATE: u32 = 16_000;

/// Hosted recognition services reachable through a [`Recognizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Google,
    GoogleCloud,
    Wit,
    Ibm,
    Bing,
    Houndify,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Google => "Google",
            Backend::GoogleCloud => "Google Cloud",
            Backend::Wit => "Wit.ai",
            Backend::Ibm => "IBM Watson",
            Backend::Bing => "Bing",
            Backend::Houndify => "Houndify",
        }
    }

    /// Encoding the backend accepts.
    pub fn audio_format(&self) -> AudioFormat {
        match self {
            Backend::Google | Backend::GoogleCloud | Backend::Ibm => AudioFormat::Flac {
                rate: Some(RECOGNITION_SAMPLE_RATE),
            },
            Backend::Wit => AudioFormat::Wav { rate: None },
            Backend::Bing | Backend::Houndify => AudioFormat::Wav {
                rate: Some(RECOGNITION_SAMPLE_RATE),
            },
        }
    }

    /// Credential shape the backend authenticates with.
    pub fn credential_kind(&self) -> CredentialKind {
        match self {
            Backend::Google | Backend::Wit | Backend::Bing => CredentialKind::Token,
            Backend::GoogleCloud => CredentialKind::Json,
            Backend::Ibm => CredentialKind::Basic,
            Backend::Houndify => CredentialKind::KeyPair,
        }
    }

    /// Whether the request carries a language. Wit.ai and Houndify take the
    /// language from the account's settings instead.
    pub fn takes_language(&self) -> bool {
        !matches!(self, Backend::Wit | Backend::Houndify)
    }
}

/// Audio encoding requested from an [`AudioSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Flac { rate: Option<u32> },
    Wav { rate: Option<u32> },
}

impl AudioFormat {
    pub fn encode(&self, audio: &dyn AudioSource) -> Result<Vec<u8>> {
        let data = match *self {
            AudioFormat::Flac { rate } => audio.flac_data(rate)?,
            AudioFormat::Wav { rate } => audio.wav_data(rate)?,
        };
        Ok(data)
    }
}

/// One call into the shared recognition client.
#[derive(Debug)]
pub struct RecognitionRequest<'a> {
    pub backend: Backend,
    /// Audio already encoded per [`Backend::audio_format`]
    pub audio: Vec<u8>,
    pub credential: &'a Credential,
    pub language: Option<&'a str>,
}

/// Client able to send audio to any hosted [`Backend`].
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, request: RecognitionRequest<'_>) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_free_backends() {
        assert!(!Backend::Wit.takes_language());
        assert!(!Backend::Houndify.takes_language());
        assert!(Backend::Ibm.takes_language());
        assert!(Backend::Google.takes_language());
    }

    #[test]
    fn test_flac_backends_request_16k() {
        for backend in [Backend::Google, Backend::GoogleCloud, Backend::Ibm] {
            assert_eq!(backend.audio_format(), AudioFormat::Flac { rate: Some(16_000) });
        }
        assert_eq!(Backend::Wit.audio_format(), AudioFormat::Wav { rate: None });
    }
}
