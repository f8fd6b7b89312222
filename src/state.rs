use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::catalogue::Category;
use crate::error::TryOnError;
use crate::llm::EncodedImage;
use crate::orchestrator::{GenerationRequest, GenerationResult, GenerationStage, Orchestrator};
use crate::utils::timing::{complete_generation_timer, start_generation_timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Model,
    Item,
}

impl ImageSlot {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Item => "item",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not generating, at least one image missing.
    Idle,
    /// Not generating, both images present.
    Ready,
    Busy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusLine {
    #[default]
    Empty,
    Analyzing,
    Compositing,
    Complete,
    Failed(String),
    Rejected(String),
}

impl StatusLine {
    pub fn message(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Analyzing => "Analyzing model image...".to_string(),
            Self::Compositing => "Generating final image...".to_string(),
            Self::Complete => "Generation complete!".to_string(),
            Self::Failed(message) | Self::Rejected(message) => message.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Rejected(_))
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    active_category: Category,
    model_image: Option<EncodedImage>,
    item_image: Option<EncodedImage>,
    busy: bool,
    status: StatusLine,
    result: Option<EncodedImage>,
}

impl SessionState {
    pub fn new(category: Category) -> Self {
        Self {
            active_category: category,
            ..Self::default()
        }
    }

    pub fn active_category(&self) -> Category {
        self.active_category
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&EncodedImage> {
        match slot {
            ImageSlot::Model => self.model_image.as_ref(),
            ImageSlot::Item => self.item_image.as_ref(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn result(&self) -> Option<&EncodedImage> {
        self.result.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.busy {
            SessionPhase::Busy
        } else if self.model_image.is_some() && self.item_image.is_some() {
            SessionPhase::Ready
        } else {
            SessionPhase::Idle
        }
    }

    pub fn can_generate(&self) -> bool {
        self.phase() == SessionPhase::Ready
    }

    pub fn generate_label(&self) -> &'static str {
        if self.busy {
            "Generating..."
        } else {
            "Generate Image"
        }
    }

    /// Replaces or clears one image slot. Ignored while a generation is in flight.
    pub fn set_image(
        &mut self,
        slot: ImageSlot,
        image: Option<EncodedImage>,
    ) -> Result<(), TryOnError> {
        if self.busy {
            return Err(TryOnError::Busy);
        }
        match slot {
            ImageSlot::Model => self.model_image = image,
            ImageSlot::Item => self.item_image = image,
        }
        if self.status.is_error() {
            self.status = StatusLine::Empty;
        }
        Ok(())
    }

    /// An upload that failed ingestion only updates the status line, and not
    /// even that while a generation is in flight.
    pub fn reject_upload(&mut self, err: &TryOnError) -> Result<(), TryOnError> {
        if self.busy {
            return Err(TryOnError::Busy);
        }
        self.status = StatusLine::Rejected(err.user_message());
        Ok(())
    }

    /// Switches category and resets both slots. Ignored while a generation is in flight.
    pub fn select_category(&mut self, category: Category) -> Result<(), TryOnError> {
        if self.busy {
            return Err(TryOnError::Busy);
        }
        self.active_category = category;
        self.model_image = None;
        self.item_image = None;
        self.busy = false;
        self.status = StatusLine::Empty;
        self.result = None;
        Ok(())
    }

    /// Moves `Ready` to `Busy` and hands back the request to run.
    pub fn begin_generation(&mut self) -> Result<GenerationRequest, TryOnError> {
        if self.busy {
            return Err(TryOnError::Busy);
        }
        let (Some(model_image), Some(item_image)) = (&self.model_image, &self.item_image) else {
            return Err(TryOnError::NotReady);
        };
        let request = GenerationRequest {
            category: self.active_category,
            model_image: model_image.clone(),
            item_image: item_image.clone(),
        };
        self.busy = true;
        self.status = StatusLine::Analyzing;
        self.result = None;
        Ok(request)
    }

    pub fn set_stage(&mut self, stage: GenerationStage) {
        if !self.busy {
            return;
        }
        self.status = match stage {
            GenerationStage::Analyzing => StatusLine::Analyzing,
            GenerationStage::Compositing => StatusLine::Compositing,
        };
    }

    /// Settles a generation. Images stay in place so the user can retry.
    pub fn finish_generation(&mut self, outcome: &Result<GenerationResult, TryOnError>) {
        self.busy = false;
        match outcome {
            Ok(result) => {
                self.result = Some(result.image.clone());
                self.status = StatusLine::Complete;
            }
            Err(err) => {
                self.result = None;
                self.status = StatusLine::Failed(err.user_message());
            }
        }
    }
}

/// The command surface driven by the UI or the CLI.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    orchestrator: Orchestrator,
}

impl Session {
    pub fn new(orchestrator: Orchestrator, category: Category) -> Self {
        Session {
            state: Arc::new(Mutex::new(SessionState::new(category))),
            orchestrator,
        }
    }

    pub fn with_state<R>(&self, read: impl FnOnce(&SessionState) -> R) -> R {
        read(&self.state.lock())
    }

    pub fn set_model_image(&self, image: Option<EncodedImage>) -> Result<(), TryOnError> {
        self.replace_image(ImageSlot::Model, image)
    }

    pub fn set_item_image(&self, image: Option<EncodedImage>) -> Result<(), TryOnError> {
        self.replace_image(ImageSlot::Item, image)
    }

    pub fn set_image(
        &self,
        slot: ImageSlot,
        image: Option<EncodedImage>,
    ) -> Result<(), TryOnError> {
        match slot {
            ImageSlot::Model => self.set_model_image(image),
            ImageSlot::Item => self.set_item_image(image),
        }
    }

    fn replace_image(
        &self,
        slot: ImageSlot,
        image: Option<EncodedImage>,
    ) -> Result<(), TryOnError> {
        let applied = self.state.lock().set_image(slot, image);
        if applied.is_err() {
            debug!(slot = slot.as_str(), "Ignoring image change while generating");
        }
        applied
    }

    /// Feeds the outcome of file ingestion into a slot.
    pub fn upload(
        &self,
        slot: ImageSlot,
        candidate: Result<EncodedImage, TryOnError>,
    ) -> Result<(), TryOnError> {
        match candidate {
            Ok(image) => self.set_image(slot, Some(image)),
            Err(err) => {
                if self.state.lock().reject_upload(&err).is_err() {
                    debug!(slot = slot.as_str(), "Ignoring upload while generating");
                    return Err(TryOnError::Busy);
                }
                info!(slot = slot.as_str(), "Rejected upload: {err}");
                Err(err)
            }
        }
    }

    pub fn select_category(&self, category: Category) -> Result<(), TryOnError> {
        let applied = self.state.lock().select_category(category);
        match &applied {
            Ok(()) => info!(category = %category, "Switched category"),
            Err(_) => debug!(category = %category, "Ignoring category switch while generating"),
        }
        applied
    }

    /// Runs one generation from `Ready`. A second call while busy is rejected.
    pub async fn request_generation(&self) -> Result<GenerationResult, TryOnError> {
        let request = match self.state.lock().begin_generation() {
            Ok(request) => request,
            Err(err) => {
                debug!("Generation request rejected: {err}");
                return Err(err);
            }
        };

        let mut timer = start_generation_timer(
            request.category,
            request.model_image.len(),
            request.item_image.len(),
        );
        let progress_state = Arc::clone(&self.state);
        let outcome = self
            .orchestrator
            .generate(&request, move |stage| {
                progress_state.lock().set_stage(stage)
            })
            .await;

        self.state.lock().finish_generation(&outcome);
        match &outcome {
            Ok(_) => complete_generation_timer(&mut timer, "success", None),
            Err(err) => complete_generation_timer(&mut timer, "error", Some(err.to_string())),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    use crate::llm::stub::StubService;
    use crate::llm::ResponsePart;

    fn image(data: &[u8]) -> EncodedImage {
        EncodedImage::new(data.to_vec(), "image/png").unwrap()
    }

    fn session_with(stub: Arc<StubService>) -> Session {
        Session::new(Orchestrator::new(stub), Category::Hats)
    }

    fn slow_stub() -> Arc<StubService> {
        let stub = StubService::returning_image("T", "QUJD");
        Arc::new(stub.with_delay(Duration::from_millis(20)))
    }

    fn ready_session(stub: Arc<StubService>) -> Session {
        let session = session_with(stub);
        session.set_model_image(Some(image(b"M"))).unwrap();
        session.set_item_image(Some(image(b"I"))).unwrap();
        session
    }

    #[test]
    fn uploads_in_either_order_reach_ready() {
        let mut state = SessionState::new(Category::Shoes);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(!state.can_generate());

        state.set_image(ImageSlot::Item, Some(image(b"I"))).unwrap();
        assert_eq!(state.phase(), SessionPhase::Idle);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        assert_eq!(state.phase(), SessionPhase::Ready);
        assert!(state.can_generate());
        assert_eq!(state.generate_label(), "Generate Image");
    }

    #[test]
    fn removing_an_image_drops_out_of_ready() {
        let mut state = SessionState::new(Category::Shoes);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        state.set_image(ImageSlot::Item, Some(image(b"I"))).unwrap();

        state.set_image(ImageSlot::Model, None).unwrap();

        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.image(ImageSlot::Model).is_none());
        assert_eq!(state.image(ImageSlot::Item), Some(&image(b"I")));
    }

    #[test]
    fn switching_category_clears_both_slots() {
        let mut state = SessionState::new(Category::Shoes);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        state.set_image(ImageSlot::Item, Some(image(b"I"))).unwrap();

        state.select_category(Category::Watches).unwrap();

        assert_eq!(state.active_category(), Category::Watches);
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.image(ImageSlot::Model).is_none());
        assert!(state.image(ImageSlot::Item).is_none());
        assert!(!state.is_busy());
    }

    #[test]
    fn begin_requires_both_images() {
        let mut state = SessionState::new(Category::Shoes);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        assert_eq!(state.begin_generation().unwrap_err(), TryOnError::NotReady);
        assert!(!state.is_busy());
    }

    #[test]
    fn busy_state_ignores_edits_and_switches() {
        let mut state = SessionState::new(Category::Shoes);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        state.set_image(ImageSlot::Item, Some(image(b"I"))).unwrap();
        let request = state.begin_generation().unwrap();
        assert_eq!(request.category, Category::Shoes);
        assert_eq!(state.generate_label(), "Generating...");

        assert_eq!(
            state.set_image(ImageSlot::Model, None),
            Err(TryOnError::Busy)
        );
        assert_eq!(state.select_category(Category::Bags), Err(TryOnError::Busy));
        assert_eq!(state.begin_generation().unwrap_err(), TryOnError::Busy);
        assert_eq!(state.active_category(), Category::Shoes);
        assert!(state.image(ImageSlot::Model).is_some());
    }

    #[test]
    fn invalid_upload_leaves_slots_untouched() {
        let session = ready_session(Arc::new(StubService::returning_image("T", "QUJD")));
        let err = session
            .upload(
                ImageSlot::Model,
                Err(TryOnError::InvalidImageInput("text/plain".into())),
            )
            .unwrap_err();

        assert!(matches!(err, TryOnError::InvalidImageInput(_)));
        session.with_state(|state| {
            assert_eq!(state.phase(), SessionPhase::Ready);
            assert_eq!(state.image(ImageSlot::Model), Some(&image(b"M")));
            assert!(matches!(state.status(), StatusLine::Rejected(_)));
        });
    }

    #[test]
    fn accepted_upload_fills_its_slot() {
        let session = session_with(Arc::new(StubService::returning_image("T", "QUJD")));
        session.upload(ImageSlot::Item, Ok(image(b"I"))).unwrap();
        let model = Some(image(b"M"));
        session.set_image(ImageSlot::Model, model).unwrap();

        session.with_state(|state| {
            assert_eq!(state.image(ImageSlot::Item), Some(&image(b"I")));
            assert_eq!(state.phase(), SessionPhase::Ready);
        });
    }

    #[tokio::test]
    async fn successful_generation_keeps_images_and_stores_result() {
        let session = ready_session(Arc::new(StubService::returning_image("T", "QUJD")));

        let result = session.request_generation().await.unwrap();

        assert_eq!(result.image.data(), b"ABC");
        session.with_state(|state| {
            assert_eq!(state.phase(), SessionPhase::Ready);
            assert_eq!(state.status(), &StatusLine::Complete);
            assert_eq!(state.result(), Some(&result.image));
        });
    }

    #[tokio::test]
    async fn missing_image_part_returns_to_idle_with_images() {
        let stub = Arc::new(StubService::new(
            "pose",
            vec![ResponsePart::Text("no image today".into())],
        ));
        let session = ready_session(stub);

        let err = session.request_generation().await.unwrap_err();

        assert_eq!(err, TryOnError::NoImageProduced);
        session.with_state(|state| {
            assert!(!state.is_busy());
            assert!(state.image(ImageSlot::Model).is_some());
            assert!(state.image(ImageSlot::Item).is_some());
            assert!(state.status().message().starts_with("Error: "));
            assert!(state.result().is_none());
        });
    }

    #[tokio::test]
    async fn failed_generation_can_be_retried_without_reupload() {
        let failing = Arc::new(StubService::failing_analysis("network down"));
        let session = ready_session(failing.clone());

        let err = session.request_generation().await.unwrap_err();
        assert_eq!(err, TryOnError::ServiceCallFailed("network down".into()));
        assert_eq!(failing.edit_count(), 0);

        let second = session.request_generation().await.unwrap_err();
        assert!(second.is_generation_failure());
        assert_eq!(failing.analyze_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_triggers_produce_one_call_pair() {
        let stub = slow_stub();
        let session = ready_session(stub.clone());

        let (first, second, third) = tokio::join!(
            session.request_generation(),
            async {
                tokio::task::yield_now().await;
                session.request_generation().await
            },
            async {
                tokio::task::yield_now().await;
                session.request_generation().await
            }
        );

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), TryOnError::Busy);
        assert_eq!(third.unwrap_err(), TryOnError::Busy);
        assert_eq!(stub.analyze_count(), 1);
        assert_eq!(stub.edit_count(), 1);
    }

    #[tokio::test]
    async fn category_switch_during_generation_is_ignored() {
        let session = ready_session(slow_stub());
        let switch_attempt = async {
            tokio::task::yield_now().await;
            let switch = session.select_category(Category::Bags);
            let status = session.with_state(|state| state.status().clone());
            (switch, status)
        };

        let (outcome, (switch, status)) =
            tokio::join!(session.request_generation(), switch_attempt);

        assert!(outcome.is_ok());
        assert_eq!(switch, Err(TryOnError::Busy));
        assert_eq!(status, StatusLine::Analyzing);
        session.with_state(|state| {
            assert_eq!(state.active_category(), Category::Hats);
            assert_eq!(state.phase(), SessionPhase::Ready);
        });
    }

    #[tokio::test]
    async fn invalid_upload_during_generation_keeps_progress_status() {
        let session = ready_session(slow_stub());
        let bad_upload = async {
            tokio::task::yield_now().await;
            let upload = session.upload(
                ImageSlot::Model,
                Err(TryOnError::InvalidImageInput("text/plain".into())),
            );
            let busy = session.with_state(|state| state.is_busy());
            let status = session.with_state(|state| state.status().clone());
            (upload, busy, status)
        };

        let (outcome, (upload, busy, status)) =
            tokio::join!(session.request_generation(), bad_upload);

        assert_eq!(upload, Err(TryOnError::Busy));
        assert!(busy);
        assert_eq!(status, StatusLine::Analyzing);
        assert!(outcome.is_ok());
        session.with_state(|state| {
            assert_eq!(state.status(), &StatusLine::Complete);
            assert_eq!(state.image(ImageSlot::Model), Some(&image(b"M")));
        });
    }

    #[test]
    fn rejected_upload_is_ignored_while_busy() {
        let mut state = SessionState::new(Category::Shoes);
        state.set_image(ImageSlot::Model, Some(image(b"M"))).unwrap();
        state.set_image(ImageSlot::Item, Some(image(b"I"))).unwrap();
        state.begin_generation().unwrap();

        let err = TryOnError::InvalidImageInput("text/plain".into());
        assert_eq!(state.reject_upload(&err), Err(TryOnError::Busy));
        assert_eq!(state.status(), &StatusLine::Analyzing);
    }

    #[tokio::test]
    async fn switching_after_generation_clears_result() {
        let session = ready_session(Arc::new(StubService::returning_image("T", "QUJD")));
        session.request_generation().await.unwrap();

        session.select_category(Category::Glasses).unwrap();

        session.with_state(|state| {
            assert_eq!(state.phase(), SessionPhase::Idle);
            assert!(state.result().is_none());
            assert_eq!(state.status(), &StatusLine::Empty);
        });
    }
}
