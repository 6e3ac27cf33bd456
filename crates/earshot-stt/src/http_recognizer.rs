//! reqwest-based [`Recognizer`] for the hosted recognition services.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::credential::Credential;
use crate::recognizer::{Backend, RECOGNITION_SAMPLE_RATE, RecognitionRequest, Recognizer};
use crate::{Result, TranscribeError};

const WIT_API_VERSION: &str = "20170307";
const GOOGLE_CLOUD_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_LANGUAGE: &str = "en-US";

/// Service URLs, overridable for testing or proxies.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub google: String,
    pub google_cloud: String,
    pub google_cloud_token: String,
    pub wit: String,
    pub ibm: String,
    pub bing: String,
    pub bing_token: String,
    pub houndify: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            google: "http://www.google.com/speech-api/v2/recognize".to_string(),
            google_cloud: "https://speech.googleapis.com/v1/speech:recognize".to_string(),
            google_cloud_token: "https://oauth2.googleapis.com/token".to_string(),
            wit: "https://api.wit.ai/speech".to_string(),
            ibm: "https://stream.watsonplatform.net/speech-to-text/api/v1/recognize".to_string(),
            bing: "https://speech.platform.bing.com/speech/recognition/interactive/cognitiveservices/v1"
                .to_string(),
            bing_token: "https://api.cognitive.microsoft.com/sts/v1.0/issueToken".to_string(),
            houndify: "https://api.houndify.com/v1/audio".to_string(),
        }
    }
}

/// Talks to each hosted backend over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl Default for HttpRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpRecognizer {
    pub fn new() -> Self {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
        }
    }

    async fn google(&self, key: &str, audio: Vec<u8>, language: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoints.google)
            .query(&[
                ("client", "chromium"),
                ("lang", language),
                ("key", key),
                ("pFilter", "0"),
            ])
            .header(
                CONTENT_TYPE,
                format!("audio/x-flac; rate={RECOGNITION_SAMPLE_RATE}"),
            )
            .body(audio)
            .send()
            .await?;

        let body = success_body(response, Backend::Google).await?;
        parse_google_v2(&body)
    }

    async fn google_cloud(&self, credential: &str, audio: Vec<u8>, language: &str) -> Result<String> {
        let access_token = self.google_cloud_token(credential).await?;

        let request = serde_json::json!({
            "config": {
                "encoding": "FLAC",
                "sampleRateHertz": RECOGNITION_SAMPLE_RATE,
                "languageCode": language,
            },
            "audio": { "content": STANDARD.encode(audio) },
        });

        let response = self
            .client
            .post(&self.endpoints.google_cloud)
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;

        let body = success_body(response, Backend::GoogleCloud).await?;
        parse_results(&body, " ")
    }

    /// Exchange a service-account document for an OAuth access token.
    async fn google_cloud_token(&self, credential: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ServiceAccount {
            client_email: String,
            private_key: String,
            token_uri: Option<String>,
        }

        #[derive(Serialize)]
        struct Claims<'a> {
            iss: &'a str,
            scope: &'a str,
            aud: &'a str,
            iat: u64,
            exp: u64,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        let account: ServiceAccount = serde_json::from_str(credential)
            .map_err(|e| TranscribeError::Credential(format!("service account JSON: {e}")))?;
        let token_uri = account
            .token_uri
            .as_deref()
            .unwrap_or(&self.endpoints.google_cloud_token);

        let now = unix_time();
        let claims = Claims {
            iss: &account.client_email,
            scope: GOOGLE_CLOUD_SCOPE,
            aud: token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| TranscribeError::Credential(format!("service account key: {e}")))?;
        let assertion = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &key,
        )
        .map_err(|e| TranscribeError::Credential(format!("signing token request: {e}")))?;

        let response = self
            .client
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let body = success_body(response, Backend::GoogleCloud).await?;
        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::Api(format!("Google Cloud token response: {e}")))?;

        Ok(token.access_token)
    }

    async fn wit(&self, token: &str, audio: Vec<u8>) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoints.wit)
            .query(&[("v", WIT_API_VERSION)])
            .bearer_auth(token)
            .header(CONTENT_TYPE, "audio/wav")
            .body(audio)
            .send()
            .await?;

        let body = success_body(response, Backend::Wit).await?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::Api(format!("Wit.ai response: {e}")))?;

        value
            .get("_text")
            .or_else(|| value.get("text"))
            .and_then(|text| text.as_str())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(TranscribeError::Unintelligible)
    }

    async fn ibm(
        &self,
        username: &str,
        password: &str,
        audio: Vec<u8>,
        language: &str,
    ) -> Result<String> {
        let model = format!("{language}_BroadbandModel");
        let response = self
            .client
            .post(&self.endpoints.ibm)
            .query(&[("profanity_filter", "false"), ("model", model.as_str())])
            .basic_auth(username, Some(password))
            .header(CONTENT_TYPE, "audio/x-flac")
            .body(audio)
            .send()
            .await?;

        let body = success_body(response, Backend::Ibm).await?;
        parse_results(&body, "\n")
    }

    async fn bing(&self, key: &str, audio: Vec<u8>, language: &str) -> Result<String> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct BingResponse {
            recognition_status: String,
            display_text: Option<String>,
        }

        let response = self
            .client
            .post(&self.endpoints.bing_token)
            .header("Ocp-Apim-Subscription-Key", key)
            .body("")
            .send()
            .await?;
        let access_token = success_body(response, Backend::Bing).await?;

        let request_id = Uuid::new_v4().to_string();
        let response = self
            .client
            .post(&self.endpoints.bing)
            .query(&[
                ("language", language),
                ("locale", language),
                ("requestid", request_id.as_str()),
            ])
            .bearer_auth(access_token.trim())
            .header(
                CONTENT_TYPE,
                format!("audio/wav; codec=\"audio/pcm\"; samplerate={RECOGNITION_SAMPLE_RATE}"),
            )
            .body(audio)
            .send()
            .await?;

        let body = success_body(response, Backend::Bing).await?;
        let result: BingResponse = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::Api(format!("Bing response: {e}")))?;

        match (result.recognition_status.as_str(), result.display_text) {
            ("Success", Some(text)) => Ok(text),
            _ => Err(TranscribeError::Unintelligible),
        }
    }

    async fn houndify(&self, client_id: &str, client_key: &str, audio: Vec<u8>) -> Result<String> {
        let user_id = Uuid::new_v4().to_string();
        let request_id = Uuid::new_v4().to_string();
        let request_time = unix_time();
        let signature = houndify_signature(client_key, &user_id, &request_id, request_time)?;
        let request_info = serde_json::json!({ "ClientID": client_id, "UserID": user_id });

        let response = self
            .client
            .post(&self.endpoints.houndify)
            .header(CONTENT_TYPE, "application/json")
            .header("Hound-Request-Info", request_info.to_string())
            .header(
                "Hound-Request-Authentication",
                format!("{user_id};{request_id}"),
            )
            .header(
                "Hound-Client-Authentication",
                format!("{client_id};{request_time};{signature}"),
            )
            .body(audio)
            .send()
            .await?;

        let body = success_body(response, Backend::Houndify).await?;
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::Api(format!("Houndify response: {e}")))?;

        value["Disambiguation"]["ChoiceData"][0]["Transcription"]
            .as_str()
            .map(str::to_string)
            .ok_or(TranscribeError::Unintelligible)
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    async fn recognize(&self, request: RecognitionRequest<'_>) -> Result<String> {
        let RecognitionRequest {
            backend,
            audio,
            credential,
            language,
        } = request;
        let language = language.unwrap_or(DEFAULT_LANGUAGE);

        debug!(
            backend = backend.name(),
            audio_bytes = audio.len(),
            language,
            "Sending recognition request"
        );

        match (backend, credential) {
            (Backend::Google, Credential::Token(key)) => self.google(key, audio, language).await,
            (Backend::GoogleCloud, Credential::Json(json)) => {
                self.google_cloud(json, audio, language).await
            }
            (Backend::Wit, Credential::Token(token)) => self.wit(token, audio).await,
            (Backend::Ibm, Credential::Basic { username, password }) => {
                self.ibm(username, password, audio, language).await
            }
            (Backend::Bing, Credential::Token(key)) => self.bing(key, audio, language).await,
            (
                Backend::Houndify,
                Credential::KeyPair {
                    client_id,
                    client_key,
                },
            ) => self.houndify(client_id, client_key, audio).await,
            (backend, credential) => Err(TranscribeError::Credential(format!(
                "{} expects a {:?} credential, got {:?}",
                backend.name(),
                backend.credential_kind(),
                credential.kind()
            ))),
        }
    }
}

async fn success_body(response: reqwest::Response, backend: Backend) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(TranscribeError::Api(format!(
            "{} returned {}: {}",
            backend.name(),
            status,
            body
        )));
    }
    Ok(body)
}

fn unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Sign a Houndify request with the base64url-encoded client key.
fn houndify_signature(
    client_key: &str,
    user_id: &str,
    request_id: &str,
    request_time: u64,
) -> Result<String> {
    let key = URL_SAFE
        .decode(client_key)
        .map_err(|e| TranscribeError::Credential(format!("Houndify client key: {e}")))?;
    let mut mac = Hmac::<Sha256>::new_from_slice(&key)
        .map_err(|e| TranscribeError::Credential(format!("Houndify client key: {e}")))?;
    mac.update(format!("{user_id};{request_id}{request_time}").as_bytes());
    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// Google's v2 endpoint streams one JSON object per line, the first usually
/// empty. Take the first result, preferring an alternative with a confidence.
fn parse_google_v2(body: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        result: Vec<Hypotheses>,
    }

    #[derive(Deserialize)]
    struct Hypotheses {
        #[serde(default)]
        alternative: Vec<Alternative>,
    }

    #[derive(Deserialize)]
    struct Alternative {
        transcript: String,
        confidence: Option<f64>,
    }

    for line in body.lines().filter(|line| !line.trim().is_empty()) {
        let response: Response = serde_json::from_str(line)
            .map_err(|e| TranscribeError::Api(format!("Google response: {e}")))?;
        let Some(hypotheses) = response.result.into_iter().next() else {
            continue;
        };
        let best = hypotheses
            .alternative
            .iter()
            .find(|alternative| alternative.confidence.is_some())
            .or(hypotheses.alternative.first());
        if let Some(alternative) = best {
            return Ok(alternative.transcript.clone());
        }
    }

    Err(TranscribeError::Unintelligible)
}

/// `{"results": [{"alternatives": [{"transcript": ...}]}]}`, shared by IBM
/// Watson and Google Cloud.
fn parse_results(body: &str, separator: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct Response {
        #[serde(default)]
        results: Vec<Utterance>,
    }

    #[derive(Deserialize)]
    struct Utterance {
        #[serde(default)]
        alternatives: Vec<Hypothesis>,
    }

    #[derive(Deserialize)]
    struct Hypothesis {
        transcript: Option<String>,
    }

    let response: Response = serde_json::from_str(body)
        .map_err(|e| TranscribeError::Api(format!("recognition response: {e}")))?;

    let transcripts: Vec<String> = response
        .results
        .into_iter()
        .flat_map(|utterance| utterance.alternatives)
        .filter_map(|hypothesis| hypothesis.transcript)
        .map(|transcript| transcript.trim().to_string())
        .collect();

    if transcripts.is_empty() {
        return Err(TranscribeError::Unintelligible);
    }
    Ok(transcripts.join(separator))
}
