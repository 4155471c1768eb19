use crate::codec::{Codec, EncodedImage};
use crate::composite::{composite, extract_alpha, CompositeMode};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mime::IMAGE_X_ALPHA8;
use crate::resource::{DefaultTransport, ResourceLoader, Transport};
use crate::segmentation::{
    InferenceAdapter, InferenceSession, OnnxAdapter, INPUT_NAME, INPUT_RESOLUTION, OUTPUT_NAME,
};
use crate::source::{self, ImageSource};
use crate::tensor::{mask_from_output, resize, to_planar_normalized, to_uint8, ImageTensor, Normalization};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type SessionSlot = Arc<OnceCell<Arc<dyn InferenceSession>>>;

/// Pipeline orchestrator and owner of the session cache.
///
/// Sessions are memoised per distinct configuration: at most one model load
/// and session creation runs per config, and concurrent callers with the same
/// config wait on the same initialisation. A failed initialisation leaves the
/// slot empty so a later call can try again. Dropping the runtime or calling
/// [`dispose`](Self::dispose) releases every cached session.
pub struct Runtime {
    adapter: Arc<dyn InferenceAdapter>,
    codec: Codec,
    transport: Arc<dyn Transport>,
    loader: ResourceLoader,
    normalization: Normalization,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl Runtime {
    pub fn new(adapter: Arc<dyn InferenceAdapter>) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(DefaultTransport::default());
        Self {
            adapter,
            codec: Codec::default(),
            loader: ResourceLoader::new(transport.clone()),
            transport,
            normalization: Normalization::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Runtime backed by ONNX Runtime with default settings.
    pub fn onnx() -> Self {
        Self::new(Arc::new(OnnxAdapter::default()))
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.loader = ResourceLoader::new(transport.clone());
        self.transport = transport;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    /// Drop every cached session.
    pub fn dispose(&self) {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!("Disposing {} cached sessions", sessions.len());
        sessions.clear();
    }

    /// Number of configurations with an initialised session.
    pub fn cached_sessions(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Load the model and create the session for `config` ahead of time.
    pub async fn preload(&self, config: &Config) -> Result<()> {
        self.session(config).await.map(|_| ())
    }

    /// Keep the foreground: alpha becomes the predicted mask.
    pub async fn remove_background(
        &self,
        image: impl Into<ImageSource>,
        config: &Config,
    ) -> Result<EncodedImage> {
        self.segment(image.into(), config, CompositeMode::RemoveBackground)
            .await
    }

    /// Keep the background: alpha becomes the inverted mask.
    pub async fn remove_foreground(
        &self,
        image: impl Into<ImageSource>,
        config: &Config,
    ) -> Result<EncodedImage> {
        self.segment(image.into(), config, CompositeMode::RemoveForeground)
            .await
    }

    /// Produce the mask itself as an image.
    pub async fn segment_foreground(
        &self,
        image: impl Into<ImageSource>,
        config: &Config,
    ) -> Result<EncodedImage> {
        self.segment(image.into(), config, CompositeMode::SegmentOnly)
            .await
    }

    /// Alias of [`segment_foreground`](Self::segment_foreground).
    pub async fn alpha_mask(
        &self,
        image: impl Into<ImageSource>,
        config: &Config,
    ) -> Result<EncodedImage> {
        self.segment_foreground(image, config).await
    }

    /// Apply a previously computed mask to an image. No inference is run.
    pub async fn apply_segmentation_mask(
        &self,
        image: impl Into<ImageSource>,
        mask: impl Into<ImageSource>,
        config: &Config,
    ) -> Result<EncodedImage> {
        let image = self.resolve(image.into()).await?.into_rgba();
        let mask = source::resolve(mask.into(), self.transport.as_ref(), &self.codec).await?;
        let out = composite(image, &mask, CompositeMode::ApplyExternalMask)?;
        self.encode(&out, config)
    }

    /// Predict a single-channel `u8` mask at the image's own resolution.
    pub async fn infer_mask(&self, image: &ImageTensor<u8>, config: &Config) -> Result<ImageTensor<u8>> {
        let session = self.session(config).await?;
        self.run_inference(session.as_ref(), image)
    }

    async fn segment(
        &self,
        source: ImageSource,
        config: &Config,
        mode: CompositeMode,
    ) -> Result<EncodedImage> {
        let session = self.session(config).await?;

        config.report("compute:decode", 0, 4);
        let image = self.resolve(source).await?.into_rgba();

        config.report("compute:inference", 1, 4);
        let mask = self.run_inference(session.as_ref(), &image)?;

        config.report("compute:mask", 2, 4);
        let out = composite(image, &mask, mode)?;

        config.report("compute:encode", 3, 4);
        let encoded = self.encode(&out, config)?;
        config.report("compute:encode", 4, 4);

        Ok(encoded)
    }

    async fn resolve(&self, source: ImageSource) -> Result<ImageTensor<u8>> {
        source::resolve(source, self.transport.as_ref(), &self.codec).await
    }

    /// Encode with the configured output format. A raw alpha target receives
    /// the alpha plane of the composited image.
    fn encode(&self, image: &ImageTensor<u8>, config: &Config) -> Result<EncodedImage> {
        let output = config.output();
        if output.format.mime_type() == IMAGE_X_ALPHA8 && image.channels() == 4 {
            let alpha = extract_alpha(image)?;
            return self.codec.encode(&alpha, output.quality, &output.format);
        }
        self.codec.encode(image, output.quality, &output.format)
    }

    fn run_inference(
        &self,
        session: &dyn InferenceSession,
        image: &ImageTensor<u8>,
    ) -> Result<ImageTensor<u8>> {
        let _span = tracing::debug_span!("segment").entered();
        let (src_height, src_width, _) = image.shape();

        let resized = resize(image, INPUT_RESOLUTION, INPUT_RESOLUTION, false)?;
        let input = to_planar_normalized(&resized, &self.normalization)?;

        let outputs = session
            .run(vec![(INPUT_NAME.to_string(), input.into_dyn())], &[OUTPUT_NAME])
            .map_err(|e| Error::Inference(format!("{e:#}")))?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference(format!("model returned no '{OUTPUT_NAME}'")))?;

        let _post = tracing::debug_span!("postprocess").entered();
        let mask = to_uint8(mask_from_output(output)?);
        if mask.width() == src_width && mask.height() == src_height {
            return Ok(mask);
        }
        resize(&mask, src_width, src_height, false)
    }

    async fn session(&self, config: &Config) -> Result<Arc<dyn InferenceSession>> {
        let key = config.cache_key()?;
        let slot = {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.entry(key).or_default().clone()
        };
        let session = slot.get_or_try_init(|| self.init_session(config)).await?;
        Ok(Arc::clone(session))
    }

    async fn init_session(&self, config: &Config) -> Result<Arc<dyn InferenceSession>> {
        let key = config.model().resource_key();
        tracing::info!("Loading model {} from {}", key, config.public_path());

        let catalog = self.loader.load_catalog(config).await?;
        let phase = format!("fetch:{key}");
        let model = self
            .loader
            .load_with_progress(key, &catalog, config, &|_, current, total| {
                config.report(&phase, current, total)
            })
            .await?;

        let session = self
            .adapter
            .create_session(&model, config.device())
            .map_err(|e| {
                tracing::error!("Failed to create session: {:#}", e);
                Error::SessionCreation(format!("{e:#}"))
            })?;
        tracing::info!("Model {} ready", key);
        Ok(session)
    }
}
