//! Builds the configured provider from its `stt.module` key.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use earshot_core::Config;
use tracing::info;

use crate::cloud::CloudStt;
use crate::hosted::{HostedApi, MycroftDeepSpeechStt, MycroftStt};
use crate::http_recognizer::HttpRecognizer;
use crate::provider::ProviderId;
use crate::recognizer::{Backend, Recognizer};
use crate::server::{DeepSpeechServerStt, KaldiStt};
use crate::settings::ProviderConfig;
use crate::yandex::YandexStt;
use crate::{Result, TranscribeError, Transcriber};

/// Clients shared by every provider a factory builds.
#[derive(Clone)]
pub struct Backends {
    pub recognizer: Arc<dyn Recognizer>,
    pub hosted: Arc<HostedApi>,
}

impl Backends {
    pub fn new(recognizer: Arc<dyn Recognizer>, hosted: Arc<HostedApi>) -> Self {
        Self { recognizer, hosted }
    }

    /// Production clients: the HTTP recognizer and the configured hosted API.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(HttpRecognizer::new()),
            Arc::new(HostedApi::new(&config.server)),
        )
    }
}

type Constructor = fn(ProviderConfig, &Backends) -> Result<Box<dyn Transcriber>>;

fn cloud(backend: Backend, config: ProviderConfig, backends: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(CloudStt::new(
        backend,
        config,
        backends.recognizer.clone(),
    )))
}

fn mycroft(config: ProviderConfig, backends: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(MycroftStt::new(config, backends.hosted.clone())))
}

fn mycroft_deepspeech(config: ProviderConfig, backends: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(MycroftDeepSpeechStt::new(
        config,
        backends.hosted.clone(),
    )))
}

fn deepspeech_server(config: ProviderConfig, _: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(DeepSpeechServerStt::new(config)?))
}

fn kaldi(config: ProviderConfig, _: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(KaldiStt::new(config)?))
}

fn ya_cloud(config: ProviderConfig, _: &Backends) -> Result<Box<dyn Transcriber>> {
    Ok(Box::new(YandexStt::new(config)))
}

static REGISTRY: LazyLock<HashMap<ProviderId, Constructor>> = LazyLock::new(|| {
    let mut registry: HashMap<ProviderId, Constructor> = HashMap::new();
    registry.insert(ProviderId::Mycroft, mycroft);
    registry.insert(ProviderId::MycroftDeepSpeech, mycroft_deepspeech);
    registry.insert(ProviderId::Google, |config, backends| {
        cloud(Backend::Google, config, backends)
    });
    registry.insert(ProviderId::GoogleCloud, |config, backends| {
        cloud(Backend::GoogleCloud, config, backends)
    });
    registry.insert(ProviderId::Wit, |config, backends| {
        cloud(Backend::Wit, config, backends)
    });
    registry.insert(ProviderId::Ibm, |config, backends| {
        cloud(Backend::Ibm, config, backends)
    });
    registry.insert(ProviderId::Bing, |config, backends| {
        cloud(Backend::Bing, config, backends)
    });
    registry.insert(ProviderId::Houndify, |config, backends| {
        cloud(Backend::Houndify, config, backends)
    });
    registry.insert(ProviderId::DeepSpeechServer, deepspeech_server);
    registry.insert(ProviderId::Kaldi, kaldi);
    registry.insert(ProviderId::YaCloud, ya_cloud);
    registry
});

/// Creates transcribers by module name.
pub struct SttFactory {
    backends: Backends,
}

impl SttFactory {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Backends::from_config(config))
    }

    /// Build the provider selected by `stt.module`.
    pub fn create(&self, config: &Config) -> Result<Box<dyn Transcriber>> {
        self.create_named(config, config.module())
    }

    /// Build the provider registered under `name`.
    pub fn create_named(&self, config: &Config, name: &str) -> Result<Box<dyn Transcriber>> {
        let provider = ProviderId::from_id(name)
            .ok_or_else(|| TranscribeError::UnknownProvider(name.to_string()))?;
        let constructor = REGISTRY
            .get(&provider)
            .ok_or_else(|| TranscribeError::UnknownProvider(name.to_string()))?;

        let settings = ProviderConfig::resolve(config, provider);
        info!(
            module = provider.id(),
            provider = provider.name(),
            language = settings.language(),
            "Creating stt provider"
        );
        constructor(settings, &self.backends)
    }
}
