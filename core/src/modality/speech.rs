//! Voice modality backed by a cloud speech service
//!
//! Listening records one utterance from the microphone and sends it to the
//! recognizer; replies are wrapped in SSML, synthesized and played back.

use super::{AudioDevice, Modality};
use crate::error::ModalityError;
use crate::session::GoodbyeMatcher;
use crate::util::sanitize_for_header;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client as HttpClient,
};
use serde::Deserialize;
use std::time::Duration;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const OUTPUT_FORMAT: &str = "riff-16khz-16bit-mono-pcm";
const RECOGNITION_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Speech-to-text and text-to-speech backend
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Transcribe a WAV utterance; `None` when no speech was recognized
    async fn recognize(&self, wav: &[u8]) -> Result<Option<String>, ModalityError>;

    /// Render SSML to WAV audio
    async fn synthesize(&self, ssml: &str) -> Result<Vec<u8>, ModalityError>;
}

/// Voice used for spoken replies
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub name: String,
    /// Prosody rate ("medium", "fast", "+10%", ...)
    pub rate: String,
    /// Speaking style, only honoured by voices that support it
    pub style: Option<String>,
    pub language: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            name: "en-US-JennyNeural".to_string(),
            rate: "medium".to_string(),
            style: None,
            language: "en-US".to_string(),
        }
    }
}

impl VoiceSettings {
    /// Wrap `text` in an SSML document for this voice
    pub fn build_ssml(&self, text: &str) -> String {
        let body = format!(
            "<prosody rate=\"{}\">{}</prosody>",
            html_escape::encode_double_quoted_attribute(&self.rate),
            html_escape::encode_text(text)
        );
        let body = match self.style.as_deref().map(str::trim) {
            Some(style) if !style.is_empty() => format!(
                "<mstts:express-as style=\"{}\">{}</mstts:express-as>",
                html_escape::encode_double_quoted_attribute(style),
                body
            ),
            _ => body,
        };

        format!(
            "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" \
             xmlns:mstts=\"https://www.w3.org/2001/mstts\" xml:lang=\"{}\">\
             <voice name=\"{}\">{}</voice></speak>",
            html_escape::encode_double_quoted_attribute(&self.language),
            html_escape::encode_double_quoted_attribute(&self.name),
            body
        )
    }
}

/// Azure Cognitive Services speech REST client
pub struct AzureSpeechClient {
    http_client: HttpClient,
    headers: HeaderMap,
    recognize_url: String,
    synthesize_url: String,
}

impl AzureSpeechClient {
    pub fn new(region: &str, key: &str, language: &str) -> Result<Self> {
        let region = region.trim();
        if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!("Invalid speech region: {:?}", region);
        }

        let key = sanitize_for_header(key, "Speech key")?;
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("ocp-apim-subscription-key"),
            HeaderValue::from_str(&key)
                .with_context(|| format!("Invalid {} header value", SUBSCRIPTION_KEY_HEADER))?,
        );

        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("consolegpt/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            headers,
            recognize_url: format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1?language={}&format=simple",
                region,
                language.trim()
            ),
            synthesize_url: format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", region),
        })
    }

    pub fn recognize_url(&self) -> &str {
        &self.recognize_url
    }

    pub fn synthesize_url(&self) -> &str {
        &self.synthesize_url
    }
}

/// Short-audio recognition result in `format=simple`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResult {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
}

impl RecognitionResult {
    fn into_text(self) -> Result<Option<String>, ModalityError> {
        match self.recognition_status.as_str() {
            "Success" => Ok(self
                .display_text
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())),
            "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => Ok(None),
            other => Err(ModalityError::Recognition {
                message: format!("recognition status {}", other),
            }),
        }
    }
}

fn request_failed(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}

#[async_trait]
impl SpeechService for AzureSpeechClient {
    async fn recognize(&self, wav: &[u8]) -> Result<Option<String>, ModalityError> {
        let response = self
            .http_client
            .post(&self.recognize_url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, RECOGNITION_CONTENT_TYPE)
            .body(wav.to_vec())
            .send()
            .await
            .map_err(|e| ModalityError::Recognition { message: e.to_string() })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ModalityError::Recognition { message: e.to_string() })?;
        if !status.is_success() {
            return Err(ModalityError::Recognition {
                message: request_failed(status, &body),
            });
        }

        let result: RecognitionResult =
            serde_json::from_str(&body).map_err(|e| ModalityError::Recognition {
                message: format!("unexpected recognition response: {}", e),
            })?;
        result.into_text()
    }

    async fn synthesize(&self, ssml: &str) -> Result<Vec<u8>, ModalityError> {
        let response = self
            .http_client
            .post(&self.synthesize_url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, OUTPUT_FORMAT)
            .body(ssml.to_string())
            .send()
            .await
            .map_err(|e| ModalityError::Synthesis { message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModalityError::Synthesis {
                message: request_failed(status, &body),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| ModalityError::Synthesis { message: e.to_string() })?;
        Ok(audio.to_vec())
    }
}

/// Microphone in, speaker out
pub struct SpeechModality<S, D> {
    service: S,
    device: D,
    voice: VoiceSettings,
    matcher: GoodbyeMatcher,
    last_was_goodbye: bool,
}

impl<S: SpeechService, D: AudioDevice> SpeechModality<S, D> {
    pub fn new(service: S, device: D, voice: VoiceSettings, matcher: GoodbyeMatcher) -> Self {
        Self {
            service,
            device,
            voice,
            matcher,
            last_was_goodbye: false,
        }
    }

    pub fn voice(&self) -> &VoiceSettings {
        &self.voice
    }
}

#[async_trait]
impl<S: SpeechService, D: AudioDevice> Modality for SpeechModality<S, D> {
    async fn listen(&mut self) -> Result<String, ModalityError> {
        crate::info_log!("Listening...");
        let wav = self.device.record().await?;

        let text = match self.service.recognize(&wav).await? {
            Some(text) => {
                crate::info_log!("Recognized: {}", text);
                text
            }
            None => {
                crate::debug_log!("No speech recognized");
                String::new()
            }
        };

        self.last_was_goodbye = self.matcher.is_goodbye(&text);
        Ok(text)
    }

    fn is_goodbye(&self) -> bool {
        self.last_was_goodbye
    }

    async fn respond(&mut self, text: &str) -> Result<(), ModalityError> {
        if text.trim().is_empty() {
            return Ok(());
        }

        crate::info_log!("Speaking: {}", text);
        let ssml = self.voice.build_ssml(text);
        crate::debug_log!("{}", ssml);

        let audio = self.service.synthesize(&ssml).await?;
        self.device.play(&audio).await
    }

    fn name(&self) -> &'static str {
        "speech"
    }
}
