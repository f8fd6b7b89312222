/// Failures surfaced by ingestion, the session guards and the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TryOnError {
    #[error("Please upload a valid image file ({0}).")]
    InvalidImageInput(String),
    #[error("{0}")]
    ServiceCallFailed(String),
    #[error("Could not find a generated image in the API response.")]
    NoImageProduced,
    #[error("A generation is already in progress.")]
    Busy,
    #[error("Upload both a model image and an item image first.")]
    NotReady,
}

impl TryOnError {
    /// Text shown to the user in the status line.
    pub fn user_message(&self) -> String {
        match self {
            TryOnError::InvalidImageInput(_) => self.to_string(),
            _ => format!("Error: {self}"),
        }
    }

    /// Errors that end a `generate` call, as opposed to a command rejected up front.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            TryOnError::ServiceCallFailed(_) | TryOnError::NoImageProduced
        )
    }
}
