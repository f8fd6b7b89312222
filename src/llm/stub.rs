use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llm::{EncodedImage, GenerativeService, ResponsePart};

/// Scripted stand-in for the generative service.
pub(crate) struct StubService {
    analysis: Result<String, String>,
    edit: Result<Vec<ResponsePart>, String>,
    delay: Option<Duration>,
    pub analyze_calls: AtomicUsize,
    pub edit_calls: AtomicUsize,
    pub analysis_prompts: Mutex<Vec<String>>,
    pub instructions: Mutex<Vec<String>>,
    pub edit_image_types: Mutex<Vec<Vec<String>>>,
}

impl StubService {
    pub fn new(analysis: &str, edit: Vec<ResponsePart>) -> Self {
        Self {
            analysis: Ok(analysis.to_string()),
            edit: Ok(edit),
            delay: None,
            analyze_calls: AtomicUsize::new(0),
            edit_calls: AtomicUsize::new(0),
            analysis_prompts: Mutex::new(Vec::new()),
            instructions: Mutex::new(Vec::new()),
            edit_image_types: Mutex::new(Vec::new()),
        }
    }

    /// Stage 2 returns a single PNG part with `data` as its base64 payload.
    pub fn returning_image(analysis: &str, data: &str) -> Self {
        Self::new(
            analysis,
            vec![ResponsePart::InlineData {
                mime_type: "image/png".to_string(),
                data: data.to_string(),
            }],
        )
    }

    pub fn failing_analysis(message: &str) -> Self {
        let mut stub = Self::returning_image("unused", "QUJD");
        stub.analysis = Err(message.to_string());
        stub
    }

    pub fn failing_edit(analysis: &str, message: &str) -> Self {
        let mut stub = Self::new(analysis, Vec::new());
        stub.edit = Err(message.to_string());
        stub
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn analyze_count(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn edit_count(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl GenerativeService for StubService {
    async fn analyze_image(&self, prompt: &str, _image: &EncodedImage) -> Result<String> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis_prompts.lock().push(prompt.to_string());
        self.pause().await;
        self.analysis.clone().map_err(|message| anyhow!(message))
    }

    async fn edit_image(
        &self,
        instruction: &str,
        images: &[&EncodedImage],
    ) -> Result<Vec<ResponsePart>> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        self.instructions.lock().push(instruction.to_string());
        self.edit_image_types.lock().push(
            images
                .iter()
                .map(|image| image.content_type().to_string())
                .collect(),
        );
        self.pause().await;
        self.edit.clone().map_err(|message| anyhow!(message))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
