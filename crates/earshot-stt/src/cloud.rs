//! Providers backed by hosted recognition services.

use std::sync::Arc;

use async_trait::async_trait;
use earshot_audio::AudioSource;
use tracing::{debug, warn};

use crate::recognizer::{Backend, RecognitionRequest, Recognizer};
use crate::settings::ProviderConfig;
use crate::{Result, Transcriber};

/// A provider that delegates to the shared [`Recognizer`] for one backend.
pub struct CloudStt {
    backend: Backend,
    config: ProviderConfig,
    recognizer: Arc<dyn Recognizer>,
}

impl CloudStt {
    pub fn new(backend: Backend, config: ProviderConfig, recognizer: Arc<dyn Recognizer>) -> Self {
        Self {
            backend,
            config,
            recognizer,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }
}

#[async_trait]
impl Transcriber for CloudStt {
    async fn execute(
        &self,
        audio: &dyn AudioSource,
        language: Option<&str>,
    ) -> Result<Option<String>> {
        let language = self.config.language_for(language);
        if self.backend == Backend::Wit {
            warn!("Wit.ai language should be configured in the wit.ai app settings");
        }

        let audio = self.backend.audio_format().encode(audio)?;
        debug!(
            backend = self.backend.name(),
            audio_bytes = audio.len(),
            language,
            "Sending audio to recognizer"
        );

        let text = self
            .recognizer
            .recognize(RecognitionRequest {
                backend: self.backend,
                audio,
                credential: self.config.credential(),
                language: self.backend.takes_language().then_some(language),
            })
            .await?;

        Ok(Some(text))
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}
