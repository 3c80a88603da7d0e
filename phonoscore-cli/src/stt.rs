//! Remote speech-to-text over an OpenAI-compatible transcription endpoint.

use std::io::Cursor;
use std::time::Duration;

use phonoscore_core::{AudioWaveform, RecognitionError, SpeechRecognizer};
use reqwest::blocking::multipart;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpRecognizer {
    url: String,
    api_key: String,
    model: String,
    /// ISO-639-1 hint, or `None` to let the service detect.
    language: Option<String>,
    timeout: Duration,
}

impl HttpRecognizer {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: None,
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = (language != "auto").then(|| language.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SpeechRecognizer for HttpRecognizer {
    fn recognize(&self, audio: &AudioWaveform) -> Result<String, RecognitionError> {
        let wav_bytes = encode_pcm16_wav(audio).map_err(|e| {
            warn!(error = %e, "stt wav encode failed");
            RecognitionError::ServiceUnavailable(format!("wav encode: {e}"))
        })?;

        let file_part = multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| RecognitionError::ServiceUnavailable(e.to_string()))?;
        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .part("file", file_part);
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RecognitionError::ServiceUnavailable(e.to_string()))?;

        let response = client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| {
                warn!(error = %e, "stt request failed");
                RecognitionError::ServiceUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "stt request returned non-success status");
            return Err(RecognitionError::ServiceUnavailable(format!(
                "transcription endpoint returned {status}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| RecognitionError::ServiceUnavailable(format!("bad response: {e}")))?;
        let text = transcript_from_payload(&payload)?;
        debug!(text = %text, "stt transcript");
        Ok(text)
    }
}

fn transcript_from_payload(payload: &serde_json::Value) -> Result<String, RecognitionError> {
    let text = payload
        .get("text")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| RecognitionError::ServiceUnavailable("response has no text field".into()))?
        .trim();
    if text.is_empty() {
        Err(RecognitionError::Unrecognized)
    } else {
        Ok(text.to_string())
    }
}

/// 16-bit mono WAV in memory.
pub fn encode_pcm16_wav(audio: &AudioWaveform) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in &audio.samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
