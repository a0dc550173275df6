use super::{Season, SeasonClassifier};
use crate::codec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Fixed prompt demanding exactly one label word.
const CLASSIFY_PROMPT: &str = "Analyze the following image and determine which of the four seasons \
it best represents: Spring, Summer, Autumn, or Winter. Respond with only one word from the list: \
[Spring, Summer, Autumn, Winter].";

/// The answer is a single word; anything longer is already malformed.
const MAX_TOKENS: u32 = 10;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Season classifier backed by a chat-completions VLM endpoint.
///
/// The remote model is asked for a single season word; every failure mode is
/// logged with a cause-specific diagnostic and normalized to `None`. A 502
/// usually means the model itself crashed mid-inference, so it is reported
/// separately from transport errors and is not retried within the run; a
/// later pass over unclassified images picks the item up again.
pub struct VlmSeasonClassifier {
    model_id: String,
    base_url: String,
    max_image_dimension: u32,
    client: reqwest::Client,
}

impl VlmSeasonClassifier {
    pub fn new(
        model_id: &str,
        base_url: &str,
        timeout: Duration,
        max_image_dimension: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for the season classifier")?;

        Ok(Self {
            model_id: model_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_image_dimension,
            client,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request(&self, encoded: &codec::EncodedImage) -> ChatRequest {
        ChatRequest {
            model: self.model_id.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: CLASSIFY_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: encoded.to_data_url(),
                        },
                    },
                ],
            }],
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait::async_trait]
impl SeasonClassifier for VlmSeasonClassifier {
    async fn classify(&self, path: &Path) -> Option<Season> {
        let owned = path.to_path_buf();
        let max_dim = self.max_image_dimension;
        let encoded = match tokio::task::spawn_blocking(move || {
            codec::encode_for_transport(&owned, max_dim)
        })
        .await
        {
            Ok(Some(encoded)) => encoded,
            // The codec already logged the cause.
            Ok(None) => return None,
            Err(err) => {
                tracing::error!("Image encoding task failed for {}: {}", path.display(), err);
                return None;
            }
        };

        let request = self.build_request(&encoded);
        let response = match self.client.post(self.endpoint()).json(&request).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(
                    "Network error calling the inference endpoint for {}: {}",
                    path.display(),
                    err
                );
                return None;
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::BAD_GATEWAY {
            tracing::error!(
                "Inference server returned 502 Bad Gateway for {}; the model most likely \
                 crashed while processing this image. Check the model server logs.",
                path.display()
            );
            return None;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                "Unexpected status {} from the inference endpoint for {}: {}",
                status,
                path.display(),
                body
            );
            return None;
        }

        let parsed: ChatResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!(
                    "Failed to parse inference response for {}: {}",
                    path.display(),
                    err
                );
                return None;
            }
        };

        let raw = parsed
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default();
        match Season::parse_label(raw) {
            Some(season) => Some(season),
            None => {
                tracing::warn!(
                    "Model returned unknown label {:?} for {}",
                    raw.trim(),
                    path.display()
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> VlmSeasonClassifier {
        VlmSeasonClassifier::new("test-vlm", "http://localhost:1234/", DEFAULT_TIMEOUT, 1024)
            .unwrap()
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        assert_eq!(
            classifier().endpoint(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn request_payload_matches_wire_format() {
        let encoded = {
            let dir = tempfile::TempDir::new().unwrap();
            let path = dir.path().join("img.png");
            image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]))
                .save(&path)
                .unwrap();
            codec::encode_for_transport(&path, 1024).unwrap()
        };

        let request = classifier().build_request(&encoded);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "test-vlm");
        assert_eq!(value["max_tokens"], 10);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert_eq!(value["messages"][0]["content"][1]["type"], "image_url");
        let url = value["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn response_parsing_extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"content":" autumn \n"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let raw = parsed.choices.first().unwrap().message.content.as_str();
        assert_eq!(Season::parse_label(raw), Some(Season::Autumn));
    }

    #[tokio::test]
    async fn unreachable_endpoint_normalizes_to_none() {
        // Port 9 (discard) with a tiny timeout: the call must fail fast and
        // come back as None rather than an error.
        let classifier = VlmSeasonClassifier::new(
            "test-vlm",
            "http://127.0.0.1:9",
            Duration::from_millis(250),
            1024,
        )
        .unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("img.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3]))
            .save(&path)
            .unwrap();

        assert_eq!(classifier.classify(&path).await, None);
    }

    #[tokio::test]
    async fn undecodable_file_normalizes_to_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not a jpeg").unwrap();

        assert_eq!(classifier().classify(&path).await, None);
    }
}
