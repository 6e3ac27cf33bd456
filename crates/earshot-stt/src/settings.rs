//! Per-provider settings resolved from the global configuration.

use std::time::Duration;

use earshot_core::{Config, ModuleConfig};

use crate::credential::Credential;
use crate::provider::ProviderId;
use crate::{Result, TranscribeError};

/// Everything a provider needs from configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    language: String,
    credential: Credential,
    settings: ModuleConfig,
}

impl ProviderConfig {
    pub fn new(language: impl Into<String>, credential: Credential, settings: ModuleConfig) -> Self {
        Self {
            language: language.into(),
            credential,
            settings,
        }
    }

    /// Read `stt.<module>` and the process-wide language for `provider`.
    pub fn resolve(config: &Config, provider: ProviderId) -> Self {
        let settings = config
            .module_config(provider.id())
            .cloned()
            .unwrap_or_default();
        let credential = Credential::resolve(provider.credential_kind(), &settings.credential);

        Self::new(config.language(), credential, settings)
    }

    /// Configured language.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Language for one call: the override if given and non-empty, the
    /// configured one otherwise.
    pub fn language_for<'a>(&'a self, language: Option<&'a str>) -> &'a str {
        language
            .filter(|language| !language.is_empty())
            .unwrap_or(&self.language)
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn uri(&self) -> Option<&str> {
        self.settings.uri.as_deref()
    }

    /// Module-level token, falling back to `credential.token`.
    pub fn token(&self) -> Option<&str> {
        self.settings
            .token
            .as_deref()
            .or(self.settings.credential.token.as_deref())
    }

    pub fn topic(&self) -> Option<&str> {
        self.settings.topic.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.settings.timeout.map(Duration::from_secs)
    }
}

/// Reject languages other than English before any work is done.
pub(crate) fn ensure_english(provider: &'static str, language: &str) -> Result<()> {
    if language.starts_with("en") {
        Ok(())
    } else {
        Err(TranscribeError::UnsupportedLanguage {
            provider,
            language: language.to_string(),
        })
    }
}

/// Build a reqwest client honoring the module's timeout.
pub(crate) fn http_client(config: &ProviderConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use earshot_core::CredentialConfig;

    use super::*;

    fn config(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_resolve_ibm_basic_credential() {
        let config = config(
            r#"
lang = "en-gb"
[stt]
module = "ibm"
[stt.ibm.credential]
username = "alice"
password = "secret"
"#,
        );

        let resolved = ProviderConfig::resolve(&config, ProviderId::Ibm);
        assert_eq!(resolved.language(), "en-GB");
        assert_eq!(
            resolved.credential(),
            &Credential::Basic {
                username: "alice".to_string(),
                password: "secret".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_without_module_table() {
        let resolved = ProviderConfig::resolve(&Config::default(), ProviderId::Wit);
        assert_eq!(resolved.language(), "en-US");
        assert_eq!(resolved.credential(), &Credential::Token(String::new()));
        assert!(resolved.uri().is_none());
        assert!(resolved.timeout().is_none());
    }

    #[test]
    fn test_language_override_is_per_call() {
        let resolved = ProviderConfig::new("en-US", Credential::None, ModuleConfig::default());
        assert_eq!(resolved.language_for(Some("de-DE")), "de-DE");
        assert_eq!(resolved.language_for(None), "en-US");
        assert_eq!(resolved.language_for(Some("")), "en-US");
        assert_eq!(resolved.language(), "en-US");
    }

    #[test]
    fn test_token_prefers_module_setting() {
        let settings = ModuleConfig {
            token: Some("module".to_string()),
            credential: CredentialConfig {
                token: Some("credential".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = ProviderConfig::new("ru-RU", Credential::None, settings.clone());
        assert_eq!(resolved.token(), Some("module"));

        let fallback = ModuleConfig {
            token: None,
            ..settings
        };
        let resolved = ProviderConfig::new("ru-RU", Credential::None, fallback);
        assert_eq!(resolved.token(), Some("credential"));
    }

    #[test]
    fn test_english_only_check() {
        for language in ["en", "en-US", "en-GB"] {
            assert!(ensure_english("DeepSpeech", language).is_ok());
        }
        let err = ensure_english("DeepSpeech", "fr-FR").unwrap_err();
        assert!(matches!(
            err,
            TranscribeError::UnsupportedLanguage { language, .. } if language == "fr-FR"
        ));
    }
}
