use crate::domain::nutrition::NutritionEstimate;
use crate::error::ApiError;
use crate::services::ai::estimate_nutrition;
use crate::state::SharedState;
use crate::web::extract::ApiJson;
use axum::{extract::State, routing::get, Json, Router};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    image: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    success: bool,
    data: NutritionEstimate,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, PartialEq)]
struct InlineImage {
    data: String,
    mime_type: String,
    byte_len: usize,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/api/analyze-food-base64",
            get(usage).post(analyze_food).fallback(super::not_found),
        )
        .with_state(state)
}

pub async fn usage() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Send a POST request with a base64 encoded food image",
        "method": "POST",
        "contentType": "application/json",
        "body": {
            "image": "base64 string or data URL (required)",
            "mimeType": "image/jpeg | image/png | image/webp (optional, default image/jpeg)"
        },
        "response": "NutritionEstimate with foodName, calories, protein, carbs, fat, fiber, portionSize, description, confidence"
    }))
}

pub async fn analyze_food(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let raw_image = payload
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("No image data provided".to_string()))?;
    let image = parse_inline_image(raw_image, payload.mime_type.as_deref())?;

    let model = state.vision.as_ref().ok_or(ApiError::ServiceUnavailable)?;

    let request_id = Uuid::new_v4();
    tracing::info!(
        %request_id,
        provider = model.provider(),
        "Analyzing food image ({} bytes, {})",
        image.byte_len,
        image.mime_type
    );

    let estimate = estimate_nutrition(
        model.as_ref(),
        &image.data,
        &image.mime_type,
        state.config.ai.timeout,
    )
    .await
    .map_err(|e| {
        tracing::error!(%request_id, "Food analysis failed: {}", e);
        ApiError::from(e)
    })?;

    tracing::info!(
        %request_id,
        "Analyzed {} ({} kcal, confidence {:.2})",
        estimate.food_name,
        estimate.calories,
        estimate.confidence
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        data: estimate,
        timestamp: Utc::now(),
    }))
}

/// Accepts plain base64 or a `data:<mime>;base64,` URL. An explicit
/// `mimeType` wins over the one in a data URL.
fn parse_inline_image(image: &str, mime_type: Option<&str>) -> Result<InlineImage, ApiError> {
    let (embedded_mime, payload) = match image.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ApiError::Validation("Malformed data URL".to_string()))?;
            let mut parts = header.split(';');
            let mime = parts.next().filter(|m| !m.is_empty());
            if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(ApiError::Validation("Data URL must be base64 encoded".to_string()));
            }
            (mime, payload)
        }
        None => (None, image),
    };

    let mime_type = mime_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .or(embedded_mime)
        .unwrap_or(DEFAULT_MIME)
        .to_ascii_lowercase();
    if !mime_type.starts_with("image/") {
        return Err(ApiError::Validation(format!("Unsupported image type: {mime_type}")));
    }

    let data: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(&data)
        .map_err(|_| ApiError::Validation("Image is not valid base64".to_string()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("No image data provided".to_string()));
    }

    Ok(InlineImage {
        data,
        mime_type,
        byte_len: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_base64_defaults_to_jpeg() {
        let image = parse_inline_image("aGVsbG8=", None).unwrap();
        assert_eq!(
            image,
            InlineImage {
                data: "aGVsbG8=".into(),
                mime_type: "image/jpeg".into(),
                byte_len: 5
            }
        );
    }

    #[test]
    fn test_data_url_supplies_mime() {
        let image = parse_inline_image("data:image/png;base64,aGVs\nbG8=", None).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "aGVsbG8=");

        let overridden = parse_inline_image("data:image/png;base64,aGVsbG8=", Some("image/webp")).unwrap();
        assert_eq!(overridden.mime_type, "image/webp");
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_inline_image("not base64!!", None).is_err());
        assert!(parse_inline_image("aGVsbG8=", Some("application/pdf")).is_err());
        assert!(parse_inline_image("data:image/png,aGVsbG8=", None).is_err());
        assert!(parse_inline_image("data:image/png;base64", None).is_err());
    }
}
