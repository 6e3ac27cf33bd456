//! Speech-to-text module identifiers.

use crate::credential::CredentialKind;

/// A configurable speech-to-text module, keyed by its `stt.module` name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Mycroft,
    MycroftDeepSpeech,
    Google,
    GoogleCloud,
    Wit,
    Ibm,
    Bing,
    Houndify,
    DeepSpeechServer,
    Kaldi,
    YaCloud,
}

impl ProviderId {
    /// Configuration key
    pub fn id(&self) -> &'static str {
        match self {
            ProviderId::Mycroft => "mycroft",
            ProviderId::MycroftDeepSpeech => "mycroft_deepspeech",
            ProviderId::Google => "google",
            ProviderId::GoogleCloud => "google_cloud",
            ProviderId::Wit => "wit",
            ProviderId::Ibm => "ibm",
            ProviderId::Bing => "bing",
            ProviderId::Houndify => "houndify",
            ProviderId::DeepSpeechServer => "deepspeech_server",
            ProviderId::Kaldi => "kaldi",
            ProviderId::YaCloud => "ya_cloud",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ProviderId::Mycroft => "Mycroft",
            ProviderId::MycroftDeepSpeech => "Mycroft DeepSpeech",
            ProviderId::Google => "Google",
            ProviderId::GoogleCloud => "Google Cloud",
            ProviderId::Wit => "Wit.ai",
            ProviderId::Ibm => "IBM Watson",
            ProviderId::Bing => "Bing",
            ProviderId::Houndify => "Houndify",
            ProviderId::DeepSpeechServer => "DeepSpeech server",
            ProviderId::Kaldi => "Kaldi",
            ProviderId::YaCloud => "Yandex SpeechKit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().iter().copied().find(|provider| provider.id() == id)
    }

    /// Credential shape read from `stt.<module>.credential`.
    pub fn credential_kind(&self) -> CredentialKind {
        match self {
            ProviderId::Google | ProviderId::Wit | ProviderId::Bing => CredentialKind::Token,
            ProviderId::GoogleCloud => CredentialKind::Json,
            ProviderId::Ibm => CredentialKind::Basic,
            ProviderId::Houndify => CredentialKind::KeyPair,
            ProviderId::Mycroft
            | ProviderId::MycroftDeepSpeech
            | ProviderId::DeepSpeechServer
            | ProviderId::Kaldi
            | ProviderId::YaCloud => CredentialKind::None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            ProviderId::Mycroft,
            ProviderId::MycroftDeepSpeech,
            ProviderId::Google,
            ProviderId::GoogleCloud,
            ProviderId::Wit,
            ProviderId::Ibm,
            ProviderId::Bing,
            ProviderId::Houndify,
            ProviderId::DeepSpeechServer,
            ProviderId::Kaldi,
            ProviderId::YaCloud,
        ]
    }
}
