use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::encoding::{encode_pair, EncodingError};
use crate::filters::{FilterKind, FilterState, Preset};
use crate::gemini::{GeminiError, Synthesizer};
use crate::models::{Asset, AspectRatio, GenerationRequest, GenerationResult, Style, STOCK_MODELS};
use crate::preview::PreviewRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingInput {
    Model,
    Product,
    Prompt,
}

impl MissingInput {
    pub fn label(&self) -> &'static str {
        match self {
            MissingInput::Model => "a model image",
            MissingInput::Product => "a product image",
            MissingInput::Prompt => "a prompt",
        }
    }
}

fn missing_message(missing: &[MissingInput]) -> String {
    let labels: Vec<_> = missing.iter().map(MissingInput::label).collect();
    let list = match labels.as_slice() {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    };
    format!("Please provide {list}")
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", missing_message(.0))]
    Missing(Vec<MissingInput>),
    #[error("there is no stock model #{0}")]
    UnknownStockModel(usize),
    #[error("a generation is already in progress")]
    Busy,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not prepare images: {0}")]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Synthesis(#[from] GeminiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Succeeded,
    Failed,
}

/// What the user sees after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Described(String),
    /// The attempt ended without an error value, e.g. the task panicked.
    Unknown,
}

impl Failure {
    pub fn message(&self) -> String {
        match self {
            Failure::Described(text) => format!("Generation failed: {text}"),
            Failure::Unknown => "Generation failed due to an unknown error.".to_string(),
        }
    }
}

impl From<&GenerateError> for Failure {
    fn from(err: &GenerateError) -> Self {
        Failure::Described(err.to_string())
    }
}

#[derive(Debug, Clone)]
struct SlotAsset {
    asset: Asset,
    /// Blob reference for local uploads, the URL itself for remote ones.
    preview: String,
}

/// A validated attempt, detached from the studio so it can run on its own
/// task while the studio keeps rendering.
#[derive(Debug, Clone)]
pub struct PendingGeneration {
    model: Asset,
    product: Asset,
    prompt: String,
    style: Style,
    aspect_ratio: AspectRatio,
}

impl PendingGeneration {
    pub async fn run(self, client: &Client, synthesizer: &dyn Synthesizer) -> Result<GenerationResult, GenerateError> {
        let (model, product) = encode_pair(client, &self.model, &self.product).await?;
        let request = GenerationRequest::new(model, product, self.prompt, self.style, self.aspect_ratio);
        Ok(synthesizer.synthesize(&request).await?)
    }
}

/// The whole client session: inputs, generation state, result and filters.
#[derive(Debug, Default)]
pub struct Studio {
    model: Option<SlotAsset>,
    product: Option<SlotAsset>,
    prompt: String,
    style: Style,
    aspect_ratio: AspectRatio,
    phase: Phase,
    result: Option<GenerationResult>,
    failure: Option<Failure>,
    filters: FilterState,
    previews: PreviewRegistry,
    demo: bool,
}

impl Studio {
    pub fn new() -> Self {
        Self::default()
    }

    // --- inputs ---

    pub fn set_model_upload(&mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>, name: impl Into<String>) {
        let asset = Asset::local(bytes, content_type, name);
        let previous = self.model.take();
        self.model = Some(self.occupy(previous, asset));
    }

    pub fn set_model_url(&mut self, url: impl Into<String>) {
        let asset = Asset::remote(url);
        let previous = self.model.take();
        self.model = Some(self.occupy(previous, asset));
    }

    pub fn select_stock_model(&mut self, index: usize) -> Result<(), ValidationError> {
        let stock = STOCK_MODELS.get(index).ok_or(ValidationError::UnknownStockModel(index))?;
        info!("🖼️ Selected stock model #{}: {}", index, stock.label);
        self.set_model_url(stock.url);
        Ok(())
    }

    pub fn set_product_upload(&mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>, name: impl Into<String>) {
        let asset = Asset::local(bytes, content_type, name);
        let previous = self.product.take();
        self.product = Some(self.occupy(previous, asset));
    }

    /// Puts a local [`Asset`] (e.g. from [`Asset::from_path`]) or a URL into the model slot.
    pub fn set_model(&mut self, asset: Asset) {
        match asset {
            Asset::Local { bytes, content_type, name } => self.set_model_upload(bytes, content_type, name),
            Asset::Remote { url } => self.set_model_url(url),
        }
    }

    /// Products are uploads only; a remote asset is ignored and reported as false.
    pub fn set_product(&mut self, asset: Asset) -> bool {
        match asset {
            Asset::Local { bytes, content_type, name } => {
                self.set_product_upload(bytes, content_type, name);
                true
            }
            Asset::Remote { url } => {
                warn!("⚠️ Product images must be uploaded, ignoring {}", url);
                false
            }
        }
    }

    fn occupy(&mut self, previous: Option<SlotAsset>, asset: Asset) -> SlotAsset {
        if let Some(old) = previous {
            self.previews.revoke(&old.preview);
        }
        let preview = match &asset {
            Asset::Local { bytes, .. } => self.previews.register(bytes.clone()),
            Asset::Remote { url } => url.clone(),
        };
        SlotAsset { asset, preview }
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Marks results as offline placeholders rather than real generations.
    pub fn set_demo(&mut self, demo: bool) {
        self.demo = demo;
    }

    // --- filters ---

    pub fn set_filter(&mut self, kind: FilterKind, value: u16) {
        self.filters.set(kind, value);
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.filters.apply_preset(preset);
    }

    pub fn reset_filters(&mut self) {
        self.filters.reset();
    }

    // --- validation ---

    pub fn missing_inputs(&self) -> Vec<MissingInput> {
        let mut missing = Vec::new();
        if self.model.is_none() {
            missing.push(MissingInput::Model);
        }
        if self.product.is_none() {
            missing.push(MissingInput::Product);
        }
        if self.prompt.trim().is_empty() {
            missing.push(MissingInput::Prompt);
        }
        missing
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_inputs();
        if !missing.is_empty() {
            return Err(ValidationError::Missing(missing));
        }
        if self.phase == Phase::Generating {
            return Err(ValidationError::Busy);
        }
        Ok(())
    }

    pub fn can_generate(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validation_message(&self) -> Option<String> {
        self.validate().err().map(|e| e.to_string())
    }

    // --- generation ---

    /// Enters `Generating`: clears the previous result and error and resets
    /// the filters. Nothing is touched if validation fails.
    pub fn begin_generation(&mut self) -> Result<PendingGeneration, ValidationError> {
        self.validate()?;
        let (Some(model), Some(product)) = (&self.model, &self.product) else {
            return Err(ValidationError::Missing(self.missing_inputs()));
        };
        let pending = PendingGeneration {
            model: model.asset.clone(),
            product: product.asset.clone(),
            prompt: self.prompt.trim().to_string(),
            style: self.style,
            aspect_ratio: self.aspect_ratio,
        };
        self.phase = Phase::Generating;
        self.result = None;
        self.failure = None;
        self.filters.reset();
        info!("🚀 Generation started ({} / {})", self.style, self.aspect_ratio);
        Ok(pending)
    }

    /// Settles the in-flight attempt. Returns false (and changes nothing)
    /// when no attempt was in flight.
    pub fn finish_generation(&mut self, outcome: Result<GenerationResult, Failure>) -> bool {
        if self.phase != Phase::Generating {
            warn!("⚠️ Ignoring generation outcome with no attempt in flight");
            return false;
        }
        match outcome {
            Ok(result) => {
                info!("✅ Generation succeeded ({})", result.image.content_type);
                self.result = Some(result);
                self.filters.reset();
                self.phase = Phase::Succeeded;
            }
            Err(failure) => {
                self.failure = Some(failure);
                self.phase = Phase::Failed;
            }
        }
        true
    }

    /// Validate, encode, call, settle. Validation errors leave the studio
    /// untouched; every other error is also recorded as the visible failure.
    pub async fn generate(&mut self, client: &Client, synthesizer: &dyn Synthesizer) -> Result<(), GenerateError> {
        let pending = self.begin_generation()?;
        match pending.run(client, synthesizer).await {
            Ok(result) => {
                self.finish_generation(Ok(result));
                Ok(())
            }
            Err(err) => {
                error!("❌ Generation failed: {}", err);
                self.finish_generation(Err(Failure::from(&err)));
                Err(err)
            }
        }
    }

    // --- read access for rendering ---

    pub fn phase(&self) -> Phase { self.phase }
    pub fn prompt(&self) -> &str { &self.prompt }
    pub fn style(&self) -> Style { self.style }
    pub fn aspect_ratio(&self) -> AspectRatio { self.aspect_ratio }
    pub fn result(&self) -> Option<&GenerationResult> { self.result.as_ref() }
    pub fn failure(&self) -> Option<&Failure> { self.failure.as_ref() }
    pub fn filters(&self) -> &FilterState { &self.filters }
    pub fn model_preview(&self) -> Option<&str> { self.model.as_ref().map(|s| s.preview.as_str()) }
    pub fn product_preview(&self) -> Option<&str> { self.product.as_ref().map(|s| s.preview.as_str()) }
    pub fn model_label(&self) -> Option<&str> { self.model.as_ref().map(|s| s.asset.label()) }
    pub fn product_label(&self) -> Option<&str> { self.product.as_ref().map(|s| s.asset.label()) }
    pub fn live_previews(&self) -> usize { self.previews.live_count() }
    pub fn is_demo(&self) -> bool { self.demo }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedAsset;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    /// Answers with a fixed outcome and remembers every request it saw.
    struct Scripted {
        answer: Option<EncodedAsset>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn returning(answer: Option<EncodedAsset>) -> Self {
            Self { answer, seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Synthesizer for Scripted {
        async fn synthesize(&self, request: &GenerationRequest) -> Result<GenerationResult, GeminiError> {
            self.seen.lock().push(request.clone());
            match &self.answer {
                Some(image) => Ok(GenerationResult::new(image.clone())),
                None => Err(GeminiError::NoImageReturned { reason: None }),
            }
        }
    }

    fn ready_studio() -> Studio {
        let mut studio = Studio::new();
        studio.set_model_upload(PNG_MAGIC.to_vec(), "image/png", "model.png");
        studio.set_product_upload(PNG_MAGIC.to_vec(), "image/png", "bag.png");
        studio.set_prompt("studio shot on white");
        studio
    }

    fn image() -> EncodedAsset {
        EncodedAsset { content_type: "image/png".into(), data: "iVBORw0KGgo=".into() }
    }

    #[test]
    fn empty_studio_names_every_missing_piece() {
        let studio = Studio::new();
        assert!(!studio.can_generate());
        assert_eq!(
            studio.validation_message().as_deref(),
            Some("Please provide a model image, a product image and a prompt")
        );
    }

    #[test]
    fn whitespace_prompt_counts_as_missing() {
        let mut studio = ready_studio();
        studio.set_prompt("   ");
        assert_eq!(studio.missing_inputs(), vec![MissingInput::Prompt]);
        assert_eq!(studio.validation_message().as_deref(), Some("Please provide a prompt"));
    }

    #[test]
    fn complete_inputs_enable_generation() {
        let studio = ready_studio();
        assert!(studio.can_generate());
        assert_eq!(studio.validation_message(), None);
    }

    #[test]
    fn stock_selection_fills_model_slot() {
        let mut studio = Studio::new();
        studio.select_stock_model(0).unwrap();
        assert_eq!(studio.model_preview(), Some(STOCK_MODELS[0].url));
        assert_eq!(studio.select_stock_model(999), Err(ValidationError::UnknownStockModel(999)));
    }

    #[test]
    fn superseded_upload_releases_its_preview() {
        let mut studio = Studio::new();
        studio.set_model_upload(PNG_MAGIC.to_vec(), "image/png", "a.png");
        let first = studio.model_preview().unwrap().to_string();
        studio.set_model_upload(PNG_MAGIC.to_vec(), "image/png", "b.png");
        assert_ne!(studio.model_preview().unwrap(), first);
        assert_eq!(studio.live_previews(), 1);

        studio.select_stock_model(1).unwrap();
        assert_eq!(studio.live_previews(), 0);
    }

    #[test]
    fn remote_product_is_rejected() {
        let mut studio = Studio::new();
        assert!(!studio.set_product(Asset::remote("https://example.com/p.png")));
        assert_eq!(studio.product_preview(), None);
    }

    #[test]
    fn begin_clears_previous_state_and_blocks_reentry() {
        let mut studio = ready_studio();
        studio.begin_generation().unwrap();
        studio.finish_generation(Err(Failure::Unknown));
        studio.set_filter(FilterKind::Contrast, 150);

        studio.begin_generation().unwrap();
        assert_eq!(studio.phase(), Phase::Generating);
        assert_eq!(studio.failure(), None);
        assert!(studio.filters().is_neutral());
        assert_eq!(studio.begin_generation().unwrap_err(), ValidationError::Busy);
    }

    #[test]
    fn stale_outcome_is_ignored() {
        let mut studio = ready_studio();
        assert!(!studio.finish_generation(Ok(GenerationResult::new(image()))));
        assert_eq!(studio.phase(), Phase::Idle);
        assert!(studio.result().is_none());
    }

    #[tokio::test]
    async fn successful_generation_shows_result_with_neutral_filters() {
        let mut studio = ready_studio();
        studio.set_style(Style::Studio);
        studio.set_aspect_ratio(AspectRatio::Square);
        let synth = Scripted::returning(Some(image()));

        studio.generate(&Client::new(), &synth).await.unwrap();

        assert_eq!(studio.phase(), Phase::Succeeded);
        assert_eq!(studio.result().unwrap().data_uri(), "data:image/png;base64,iVBORw0KGgo=");
        assert!(studio.filters().is_neutral());
        let seen = synth.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].brief(), "studio shot on white");
        assert_eq!(seen[0].style(), Style::Studio);
        assert_eq!(seen[0].aspect_ratio(), AspectRatio::Square);
    }

    #[tokio::test]
    async fn missing_image_becomes_visible_failure() {
        let mut studio = ready_studio();
        let synth = Scripted::returning(None);

        let err = studio.generate(&Client::new(), &synth).await.unwrap_err();

        assert!(matches!(err, GenerateError::Synthesis(GeminiError::NoImageReturned { .. })));
        assert_eq!(studio.phase(), Phase::Failed);
        assert!(studio.result().is_none());
        assert_eq!(studio.failure().unwrap().message(), "Generation failed: no image was generated");
    }

    #[tokio::test]
    async fn validation_failure_makes_no_call() {
        let mut studio = Studio::new();
        studio.set_prompt("studio shot on white");
        let synth = Scripted::returning(Some(image()));

        let err = studio.generate(&Client::new(), &synth).await.unwrap_err();

        assert!(matches!(err, GenerateError::Validation(ValidationError::Missing(_))));
        assert!(synth.seen.lock().is_empty());
        assert_eq!(studio.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn encoding_failure_is_described() {
        let mut studio = ready_studio();
        studio.set_product_upload(Vec::new(), "image/png", "empty.png");
        let synth = Scripted::returning(Some(image()));

        studio.generate(&Client::new(), &synth).await.unwrap_err();

        assert!(synth.seen.lock().is_empty());
        assert_eq!(
            studio.failure().unwrap().message(),
            "Generation failed: could not prepare images: empty.png is empty"
        );
    }

    #[test]
    fn unknown_failure_message() {
        assert_eq!(Failure::Unknown.message(), "Generation failed due to an unknown error.");
    }

    #[test]
    fn typed_errors_are_always_described() {
        let errors = [
            GenerateError::Validation(ValidationError::Busy),
            GenerateError::Encoding(EncodingError::Empty("bag.png".into())),
            GenerateError::Synthesis(GeminiError::NoImageReturned { reason: None }),
        ];
        for err in &errors {
            assert_eq!(Failure::from(err), Failure::Described(err.to_string()));
        }
    }

    #[test]
    fn dropping_the_studio_releases_upload_bytes() {
        let upload = Bytes::from(PNG_MAGIC.to_vec());
        let kept = upload.clone();
        let mut studio = Studio::new();
        studio.set_product_upload(upload, "image/png", "bag.png");
        assert_eq!(studio.live_previews(), 1);
        assert!(!kept.is_unique());

        drop(studio);
        assert!(kept.is_unique());
    }
}
