use crate::config::{AiConfig, AiProvider};
use crate::domain::nutrition::{normalize, NutritionEstimate};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPart,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ImageUrlArgs,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const NUTRITION_PROMPT: &str = r#"You are a nutrition expert specialising in Indian cuisine.
Look at the food in this image and estimate its nutrition for the portion shown.
Respond with ONLY a JSON object, no markdown and no extra text, using exactly these fields:
{
  "foodName": "name of the dish",
  "calories": number (kcal),
  "protein": number (grams),
  "carbs": number (grams),
  "fat": number (grams),
  "fiber": number (grams),
  "portionSize": "estimated portion, e.g. 1 bowl (250g)",
  "description": "one sentence describing the dish and main ingredients",
  "confidence": number between 0 and 1
}
If several items are on the plate, combine them into one estimate and name the meal."#;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI credential rejected: {0}")]
    Auth(String),
    #[error("AI quota exceeded: {0}")]
    Quota(String),
    #[error("AI request timed out after {0:?}")]
    Timeout(Duration),
    #[error("AI request failed: {0}")]
    Upstream(String),
}

impl AiError {
    /// Sorts a provider error message into auth, quota, or a generic failure.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if ["api key", "api_key", "unauthorized", "unauthenticated", "permission_denied"]
            .iter()
            .any(|k| lowered.contains(k))
        {
            Self::Auth(message)
        } else if ["quota", "rate limit", "rate_limit", "resource_exhausted", "too many requests"]
            .iter()
            .any(|k| lowered.contains(k))
        {
            Self::Quota(message)
        } else {
            Self::Upstream(message)
        }
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth(body),
            429 => Self::Quota(body),
            _ => Self::classify(body),
        }
    }
}

impl From<OpenAIError> for AiError {
    fn from(err: OpenAIError) -> Self {
        Self::classify(err.to_string())
    }
}

// reqwest renders the request URL into its message; drop it so nothing from
// the endpoint ends up in logs or response bodies.
impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Upstream(err.to_string()),
        }
    }
}

/// An image-understanding model: prompt plus inline image in, free text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn describe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, AiError>;
}

/// Builds the configured model, or `None` when no credential is set.
pub fn build_vision_model(config: &AiConfig) -> Option<Arc<dyn VisionModel>> {
    let api_key = config.api_key.clone()?;
    let model: Arc<dyn VisionModel> = match config.provider {
        AiProvider::Gemini => Arc::new(GeminiVision::new(api_key, config.model.clone())),
        AiProvider::OpenAi => Arc::new(OpenAiVision::new(api_key, config.model.clone())),
    };
    Some(model)
}

/// One model call, no retries. The reply is normalized into a complete
/// estimate; only transport-level failures surface as errors.
pub async fn estimate_nutrition(
    model: &dyn VisionModel,
    image_base64: &str,
    mime_type: &str,
    timeout: Option<Duration>,
) -> Result<NutritionEstimate, AiError> {
    let call = model.describe_image(NUTRITION_PROMPT, image_base64, mime_type);
    let raw = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| AiError::Timeout(limit))??,
        None => call.await?,
    };
    tracing::debug!("Model reply ({} chars): {}", raw.len(), raw);
    Ok(normalize(&raw))
}

#[derive(Clone)]
pub struct OpenAiVision {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiVision {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);
        Self { client, model }
    }
}

#[async_trait]
impl VisionModel for OpenAiVision {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn describe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, AiError> {
        let data_url = format!("data:{mime_type};base64,{image_base64}");
        let parts: Vec<ChatCompletionRequestMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(prompt)
                .build()?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(ImageUrlArgs::default().url(data_url).build()?)
                .build()?
                .into(),
        ];
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(parts)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .messages(vec![ChatCompletionRequestMessage::User(message)])
            .build()?;

        let resp = self.client.chat().create(request).await?;
        let content = resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(content)
    }
}

#[derive(Clone)]
pub struct GeminiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiVision {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    /// The credential travels in a header, never in the URL.
    fn request(&self, prompt: &str, image_base64: &str, mime_type: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{GEMINI_ENDPOINT}/{}:generateContent", self.model))
            .header(GEMINI_KEY_HEADER, self.api_key.as_str())
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": prompt },
                        { "inline_data": { "mime_type": mime_type, "data": image_base64 } }
                    ]
                }]
            }))
    }
}

#[async_trait]
impl VisionModel for GeminiVision {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn describe_image(
        &self,
        prompt: &str,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<String, AiError> {
        let response = self.request(prompt, image_base64, mime_type).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::from_status(status.as_u16(), body));
        }

        let response_json: Value = response.json().await?;
        gemini_text(&response_json).ok_or_else(|| AiError::Upstream("Gemini returned no text".to_string()))
    }
}

fn gemini_text(response: &Value) -> Option<String> {
    let parts = response["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Canned model for handler tests.
    pub struct StubVision {
        pub reply: Result<String, fn() -> AiError>,
    }

    #[async_trait]
    impl VisionModel for StubVision {
        fn provider(&self) -> &'static str {
            "stub"
        }

        async fn describe_image(&self, _prompt: &str, _image: &str, _mime: &str) -> Result<String, AiError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    struct SlowVision;

    #[async_trait]
    impl VisionModel for SlowVision {
        fn provider(&self) -> &'static str {
            "slow"
        }

        async fn describe_image(&self, _prompt: &str, _image: &str, _mime: &str) -> Result<String, AiError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("{}".to_string())
        }
    }

    #[test]
    fn test_classify_errors() {
        assert!(matches!(
            AiError::classify("API key not valid. Please pass a valid API key."),
            AiError::Auth(_)
        ));
        assert!(matches!(
            AiError::classify("Incorrect API key provided: sk-***"),
            AiError::Auth(_)
        ));
        assert!(matches!(
            AiError::classify("You exceeded your current quota, please check your plan"),
            AiError::Quota(_)
        ));
        assert!(matches!(AiError::classify("Rate limit reached for gpt-4o"), AiError::Quota(_)));
        assert!(matches!(AiError::classify("connection reset by peer"), AiError::Upstream(_)));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(AiError::from_status(401, String::new()), AiError::Auth(_)));
        assert!(matches!(AiError::from_status(429, String::new()), AiError::Quota(_)));
        assert!(matches!(AiError::from_status(503, "overloaded".into()), AiError::Upstream(_)));
    }

    #[test]
    fn test_gemini_text_joins_parts() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"foodName\":" }, { "text": "\"Idli\"}" }] }
            }]
        });
        assert_eq!(gemini_text(&response).as_deref(), Some("{\"foodName\":\"Idli\"}"));
        assert_eq!(gemini_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_no_key_means_no_model() {
        let config = AiConfig {
            provider: AiProvider::Gemini,
            api_key: None,
            model: "gemini-1.5-flash".into(),
            timeout: None,
        };
        assert!(build_vision_model(&config).is_none());

        let with_key = AiConfig {
            api_key: Some("key".into()),
            provider: AiProvider::OpenAi,
            ..config
        };
        let model = build_vision_model(&with_key).unwrap();
        assert_eq!(model.provider(), "openai");
    }

    #[tokio::test]
    async fn test_estimate_normalizes_reply() {
        let stub = StubVision {
            reply: Ok("Here you go: {\"foodName\":\"Chole Bhature\",\"calories\":\"650\"}".to_string()),
        };
        let estimate = estimate_nutrition(&stub, "aGVsbG8=", "image/jpeg", None).await.unwrap();
        assert_eq!(estimate.food_name, "Chole Bhature");
        assert_eq!(estimate.calories, 650.0);
    }

    #[tokio::test]
    async fn test_estimate_propagates_errors() {
        let stub = StubVision {
            reply: Err(|| AiError::Quota("quota".into())),
        };
        let result = estimate_nutrition(&stub, "aGVsbG8=", "image/jpeg", None).await;
        assert!(matches!(result, Err(AiError::Quota(_))));
    }

    #[tokio::test]
    async fn test_estimate_times_out() {
        let limit = Some(Duration::from_millis(50));
        let result = estimate_nutrition(&SlowVision, "aGVsbG8=", "image/png", limit).await;
        let err = result.unwrap_err();
        assert!(matches!(err, AiError::Timeout(_)));
        assert_eq!(err.to_string(), "AI request timed out after 50ms");
    }

    #[test]
    fn test_gemini_key_sent_as_header() {
        let gemini = GeminiVision::new("AIza-secret-key".into(), "gemini-1.5-flash".into());
        let request = gemini.request(NUTRITION_PROMPT, "aGVsbG8=", "image/jpeg").build().unwrap();
        assert!(!request.url().as_str().contains("AIza-secret-key"));
        assert!(request.url().query().is_none());
        assert_eq!(
            request.headers().get(GEMINI_KEY_HEADER).and_then(|v| v.to_str().ok()),
            Some("AIza-secret-key")
        );
    }

    #[tokio::test]
    async fn test_transport_error_hides_url() {
        // Nothing listens on port 1, so the connect fails with the URL attached.
        let err = reqwest::Client::new()
            .post("http://127.0.0.1:1/v1beta/models/m:generateContent?key=AIza-secret-key")
            .send()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("AIza-secret-key"));

        let ai_err = AiError::from(err);
        assert!(matches!(ai_err, AiError::Upstream(_)));
        assert!(!ai_err.to_string().contains("AIza-secret-key"));
        let api_err = crate::error::ApiError::from(ai_err);
        assert!(!format!("{api_err:?}").contains("AIza-secret-key"));
    }
}
