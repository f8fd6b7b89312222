pub mod gemini;
pub mod media;
#[cfg(test)]
pub(crate) mod stub;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use media::EncodedImage;

/// One content part returned by an image-editing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Text(String),
    /// Base64 payload exactly as carried on the wire.
    InlineData { mime_type: String, data: String },
}

/// The two capabilities the try-on pipeline consumes from a generative model provider.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Multimodal text generation: describe `image` following `prompt`.
    async fn analyze_image(&self, prompt: &str, image: &EncodedImage) -> Result<String>;

    /// Multimodal image editing. Images are sent in order after the instruction.
    async fn edit_image(
        &self,
        instruction: &str,
        images: &[&EncodedImage],
    ) -> Result<Vec<ResponsePart>>;

    fn name(&self) -> &str;
}
