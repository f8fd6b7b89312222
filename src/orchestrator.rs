use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::catalogue::{lookup, Category};
use crate::error::TryOnError;
use crate::llm::{EncodedImage, GenerativeService, ResponsePart};

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub category: Category,
    pub model_image: EncodedImage,
    pub item_image: EncodedImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub image: EncodedImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Analyzing,
    Compositing,
}

/// Runs the analysis call followed by the image-editing call.
///
/// Both calls are mandatory and strictly sequential since the editing
/// instruction embeds the analysis text. There is no retry; callers run one
/// generation at a time per session.
#[derive(Clone)]
pub struct Orchestrator {
    service: Arc<dyn GenerativeService>,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn GenerativeService>) -> Self {
        Self { service }
    }

    /// Runs both stages for `request`, reporting each stage to `on_stage` before it starts.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        mut on_stage: F,
    ) -> Result<GenerationResult, TryOnError>
    where
        F: FnMut(GenerationStage) + Send,
    {
        let profile = lookup(request.category);

        on_stage(GenerationStage::Analyzing);
        info!(
            category = %request.category,
            service = self.service.name(),
            "Analyzing model image"
        );
        let analysis_text = self
            .service
            .analyze_image(profile.analysis_prompt, &request.model_image)
            .await
            .map_err(|err| {
                warn!(category = %request.category, "Analysis call failed: {err:#}");
                TryOnError::ServiceCallFailed(err.to_string())
            })?;
        if analysis_text.trim().is_empty() {
            warn!(
                category = %request.category,
                "Analysis returned no text; compositing without a description"
            );
        } else {
            debug!(category = %request.category, analysis = %analysis_text, "Model analysis");
        }

        on_stage(GenerationStage::Compositing);
        let instruction = profile.generation_prompt(&analysis_text);
        info!(
            category = %request.category,
            instruction_len = instruction.len(),
            "Generating composite image"
        );
        let parts = self
            .service
            .edit_image(&instruction, &[&request.model_image, &request.item_image])
            .await
            .map_err(|err| {
                warn!(category = %request.category, "Edit call failed: {err:#}");
                TryOnError::ServiceCallFailed(err.to_string())
            })?;

        let image = extract_composite(parts)?;
        info!(
            category = %request.category,
            content_type = image.content_type(),
            bytes = image.len(),
            "Composite image ready"
        );
        Ok(GenerationResult { image })
    }
}

/// Picks the first inline image part that decodes cleanly.
pub fn extract_composite(parts: Vec<ResponsePart>) -> Result<EncodedImage, TryOnError> {
    for part in parts {
        match part {
            ResponsePart::Text(text) => {
                if !text.trim().is_empty() {
                    debug!(text = %text, "Edit response text part");
                }
            }
            ResponsePart::InlineData { mime_type, data } => {
                if !mime_type.trim().to_ascii_lowercase().starts_with("image/") {
                    debug!(mime_type = %mime_type, "Skipping non-image inline part");
                    continue;
                }
                match EncodedImage::from_base64(&data, &mime_type) {
                    Ok(image) => return Ok(image),
                    Err(err) => {
                        warn!(mime_type = %mime_type, "Skipping unusable image part: {err}");
                    }
                }
            }
        }
    }
    Err(TryOnError::NoImageProduced)
}
