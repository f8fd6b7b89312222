use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::IgnoredAny, Deserialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::media::{is_supported_image_mime, normalize_image_mime, EncodedImage};
use crate::llm::{GenerativeService, ResponsePart};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Settings for one Gemini endpoint, resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub analysis_model: String,
    pub image_model: String,
    pub temperature: Option<f32>,
    pub safety_settings: String,
}

impl GeminiSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
            analysis_model: config.gemini_analysis_model.clone(),
            image_model: config.gemini_image_model.clone(),
            temperature: config.gemini_temperature,
            safety_settings: config.gemini_safety_settings.clone(),
        }
    }
}

pub struct GeminiClient {
    settings: GeminiSettings,
    client: &'static Client,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            client: get_http_client(),
        }
    }

    pub fn analysis_model(&self) -> &str {
        &self.settings.analysis_model
    }

    pub fn image_model(&self) -> &str {
        &self.settings.image_model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.settings.base_url)
    }

    async fn call_gemini_api(&self, model: &str, payload: Value) -> Result<GeminiResponse> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(&payload);
            debug!(target: "llm.gemini", model = model, payload = %payload_summary);
        }

        let response = match self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={}, status={:?})",
                    err,
                    err.is_timeout(),
                    err.is_connect(),
                    err.status()
                );
                return Err(anyhow!("Gemini request failed: {}", err));
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            return Err(anyhow!("Gemini request failed with status {}: {}", status, detail));
        }

        let value = response.json::<GeminiResponse>().await?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            let response_summary = summarize_gemini_response(&value);
            debug!(target: "llm.gemini", model = model, response = %response_summary);
        }
        Ok(value)
    }

    fn generation_config(&self, response_modalities: Option<&[&str]>) -> Value {
        let mut config = Map::new();
        if let Some(temperature) = self.settings.temperature {
            config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(modalities) = response_modalities {
            config.insert("responseModalities".to_string(), json!(modalities));
        }
        Value::Object(config)
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn analyze_image(&self, prompt: &str, image: &EncodedImage) -> Result<String> {
        let parts = build_gemini_parts(prompt, &[image])?;
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": self.generation_config(None),
            "safetySettings": build_safety_settings(&self.settings.safety_settings),
        });

        let model = self.settings.analysis_model.as_str();
        log_llm_timing("gemini", model, "analyze_image", None, || async {
            let response = self.call_gemini_api(model, payload).await?;
            extract_text_from_response(response)
        })
        .await
    }

    async fn edit_image(
        &self,
        instruction: &str,
        images: &[&EncodedImage],
    ) -> Result<Vec<ResponsePart>> {
        let parts = build_gemini_parts(instruction, images)?;
        let payload = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": self.generation_config(Some(&["IMAGE", "TEXT"])),
            "safetySettings": build_safety_settings(&self.settings.safety_settings),
        });

        let model = self.settings.image_model.as_str();
        let metadata = json!({ "images": images.len() });
        log_llm_timing("gemini", model, "edit_image", Some(metadata), || async {
            let response = self.call_gemini_api(model, payload).await?;
            extract_parts_from_response(response)
        })
        .await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

/// Text first, then every image as inline data, in order.
fn build_gemini_parts(text: &str, images: &[&EncodedImage]) -> Result<Vec<Value>> {
    let mut parts = vec![json!({ "text": text })];
    for image in images {
        let mime_type = normalize_image_mime(image.content_type());
        if !is_supported_image_mime(&mime_type) {
            return Err(anyhow!("Gemini does not accept {} images", mime_type));
        }
        parts.push(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": image.to_base64()
            }
        }));
    }
    Ok(parts)
}

fn blocked_reason(response: &GeminiResponse) -> Option<String> {
    let has_candidates = response
        .candidates
        .as_ref()
        .is_some_and(|candidates| !candidates.is_empty());
    if has_candidates {
        return None;
    }
    response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.clone())
}

fn first_candidate_parts(response: GeminiResponse) -> Result<Vec<GeminiPart>> {
    if let Some(reason) = blocked_reason(&response) {
        return Err(anyhow!("Gemini blocked the request: {}", reason));
    }
    let Some(candidate) = response.candidates.unwrap_or_default().into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" {
            debug!(target: "llm.gemini", finish_reason = reason, "Candidate finished early");
        }
    }
    Ok(candidate
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default())
}

fn extract_text_from_response(response: GeminiResponse) -> Result<String> {
    let text = first_candidate_parts(response)?
        .into_iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } => Some(text),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("");
    Ok(text)
}

fn extract_parts_from_response(response: GeminiResponse) -> Result<Vec<ResponsePart>> {
    Ok(first_candidate_parts(response)?
        .into_iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } => Some(ResponsePart::Text(text)),
            GeminiPart::InlineData { inline_data } => Some(ResponsePart::InlineData {
                mime_type: inline_data.mime_type,
                data: inline_data.data,
            }),
            GeminiPart::Other(_) => None,
        })
        .collect())
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(contents) = payload.get("contents").and_then(|value| value.as_array()) {
        let mut summarized_contents = Vec::new();
        for content in contents {
            let role = content
                .get("role")
                .and_then(|value| value.as_str())
                .unwrap_or("user");
            let parts = content
                .get("parts")
                .and_then(|value| value.as_array())
                .map(|parts| summarize_gemini_parts(parts))
                .unwrap_or_default();
            summarized_contents.push(json!({ "role": role, "parts": parts }));
        }
        summary.insert("contents".to_string(), Value::Array(summarized_contents));
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    if let Some(safety) = payload
        .get("safetySettings")
        .and_then(|value| value.as_array())
    {
        summary.insert("safetySettingsCount".to_string(), json!(safety.len()));
    }

    Value::Object(summary)
}

fn summarize_gemini_response(response: &GeminiResponse) -> Value {
    let mut text_parts = 0usize;
    let mut image_parts = 0usize;
    let mut text_preview = None;

    let candidates = response.candidates.as_deref().unwrap_or(&[]);
    for candidate in candidates {
        let parts = candidate
            .content
            .as_ref()
            .and_then(|content| content.parts.as_deref())
            .unwrap_or(&[]);
        for part in parts {
            match part {
                GeminiPart::Text { text } => {
                    text_parts += 1;
                    if text_preview.is_none() && !text.trim().is_empty() {
                        text_preview = Some(truncate_for_log(text, 200));
                    }
                }
                GeminiPart::InlineData { inline_data } => {
                    if inline_data.mime_type.starts_with("image/") {
                        image_parts += 1;
                    }
                }
                GeminiPart::Other(_) => {}
            }
        }
    }

    json!({
        "candidates": candidates.len(),
        "textParts": text_parts,
        "imageParts": image_parts,
        "textPreview": text_preview,
        "blockReason": response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.clone()),
    })
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> GeminiResponse {
        serde_json::from_str(raw).expect("fixture parses")
    }

    #[test]
    fn analysis_text_joins_first_candidate_text_parts() {
        let response = parse(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"Standing, "},{"text":"left wrist visible."}]},"finishReason":"STOP"},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        );
        let text = extract_text_from_response(response).unwrap();
        assert_eq!(text, "Standing, left wrist visible.");
    }

    #[test]
    fn edit_parts_keep_order_and_skip_unknown_shapes() {
        let response = parse(
            r#"{"candidates":[{"content":{"parts":[
                {"text":"Here you go"},
                {"functionCall":{"name":"noop"}},
                {"inlineData":{"mimeType":"image/png","data":"QUJD"}}
            ]}}]}"#,
        );
        let parts = extract_parts_from_response(response).unwrap();
        assert_eq!(
            parts,
            vec![
                ResponsePart::Text("Here you go".to_string()),
                ResponsePart::InlineData {
                    mime_type: "image/png".to_string(),
                    data: "QUJD".to_string(),
                },
            ]
        );
    }

    #[test]
    fn blocked_prompt_surfaces_reason() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        let err = extract_parts_from_response(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn empty_candidates_yield_no_parts() {
        let response = parse(r#"{"candidates":[]}"#);
        assert!(extract_parts_from_response(response).unwrap().is_empty());
    }

    #[test]
    fn parts_put_text_before_images_in_order() {
        let model = EncodedImage::new(b"M".to_vec(), "image/jpeg").unwrap();
        let item = EncodedImage::new(b"I".to_vec(), "image/png").unwrap();
        let parts = build_gemini_parts("do it", &[&model, &item]).unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "do it");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "TQ==");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
    }

    #[test]
    fn unsupported_image_type_is_refused_before_sending() {
        let gif = EncodedImage::new(b"GIF89a".to_vec(), "image/gif").unwrap();
        assert!(build_gemini_parts("x", &[&gif]).is_err());
    }

    #[test]
    fn error_body_prefers_api_message() {
        let (message, _) =
            summarize_error_body(r#"{"error":{"code":400,"message":"API key not valid"}}"#);
        assert_eq!(message.as_deref(), Some("API key not valid"));
        let (message, summary) = summarize_error_body("   ");
        assert!(message.is_none());
        assert_eq!(summary, "empty response body");
    }

    #[test]
    fn payload_summary_hides_inline_data() {
        let payload = json!({
            "contents": [{ "role": "user", "parts": [
                { "text": "describe" },
                { "inlineData": { "mimeType": "image/png", "data": "QUJDRA==" } }
            ]}],
            "safetySettings": build_safety_settings("standard"),
        });
        let summary = summarize_gemini_payload(&payload);
        assert_eq!(
            summary["contents"][0]["parts"][1]["inlineData"]["dataLen"],
            8
        );
        assert_eq!(summary["safetySettingsCount"], 4);
        assert!(!summary.to_string().contains("QUJDRA=="));
    }
}
