//! Calibrated open-set image classifier.
//!
//! [`ImageClassifier`] wires the pipeline together: image normalization,
//! test-time augmentation, model inference, probability normalization,
//! ensemble averaging, calibration and the rejection rule.
//!
//! The model can be installed after construction (for example from a
//! background thread); until then every request fails with
//! [`ClassifierError::ModelNotReady`]. Calibration is held as an `Arc`
//! snapshot: each request reads it once, and
//! [`replace_calibration`](ImageClassifier::replace_calibration) swaps the whole
//! value, so a request never sees a half-updated configuration.

use crate::core::config::{
    AugmentationConfig, CalibrationConfig, ConfigValidator, ConfigValidatorExt, EnsembleOrder,
    ImageClassifierConfig, OrtSessionConfig, ResizeFilter,
};
use crate::core::errors::{ClassifierError, ClassifierResult};
use crate::core::inference::{
    ClassifierModel, GraphModel, GraphModelOptions, TensorHandle, TensorLedger,
};
use crate::domain::{ClassCatalog, ClassificationResult, ClassifierStatus, ClassifyOptions};
use crate::processors::{
    Augmentation, AugmentationEnsembler, Calibrator, DecisionPolicy, ImageNormalizer,
    NormalizationBranch, ProbabilityNormalizer, ensemble_mean,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use std::thread::JoinHandle;

/// Everything derived from one validated [`CalibrationConfig`].
#[derive(Debug)]
struct CalibrationState {
    config: CalibrationConfig,
    normalizer: ProbabilityNormalizer,
    calibrator: Calibrator,
    policy: DecisionPolicy,
}

impl CalibrationState {
    fn build(config: CalibrationConfig, catalog: &ClassCatalog) -> ClassifierResult<Self> {
        config.validate_against(catalog)?;
        Ok(Self {
            normalizer: ProbabilityNormalizer::new(config.softmax_temperature),
            calibrator: Calibrator::new(&config, catalog),
            policy: DecisionPolicy::new(&config, catalog),
            config,
        })
    }
}

/// Image classifier with calibrated open-set rejection.
#[derive(Debug)]
pub struct ImageClassifier {
    config: ImageClassifierConfig,
    catalog: ClassCatalog,
    calibration: RwLock<Arc<CalibrationState>>,
    model: OnceLock<ClassifierModel>,
    normalizer: ImageNormalizer,
    ensembler: AugmentationEnsembler,
    ledger: Arc<TensorLedger>,
}

impl ImageClassifier {
    /// Creates a classifier.
    ///
    /// # Arguments
    ///
    /// * `config` - Classifier configuration, validated here
    /// * `catalog` - Ordered class labels, last one being the unknown sentinel
    /// * `calibration` - Calibration and thresholds, validated against `catalog`
    /// * `model` - The model, if already loaded
    pub fn new(
        config: ImageClassifierConfig,
        catalog: ClassCatalog,
        calibration: CalibrationConfig,
        model: Option<ClassifierModel>,
    ) -> ClassifierResult<Self> {
        let config = config.validate_and_wrap()?;
        let state = CalibrationState::build(calibration, &catalog)?;
        let normalizer = ImageNormalizer::from_config(&config);
        let ensembler = AugmentationEnsembler::new(
            config.augmentation.clone(),
            normalizer.max_value(),
            config.parallel_variants,
        );

        let classifier = Self {
            config,
            catalog,
            calibration: RwLock::new(Arc::new(state)),
            model: OnceLock::new(),
            normalizer,
            ensembler,
            ledger: TensorLedger::new(),
        };
        if let Some(model) = model {
            classifier.install_model(model)?;
        }
        Ok(classifier)
    }

    /// Returns a builder.
    pub fn builder() -> ImageClassifierBuilder {
        ImageClassifierBuilder::new()
    }

    /// Installs the model. A model can be installed only once.
    pub fn install_model(&self, model: impl Into<ClassifierModel>) -> ClassifierResult<()> {
        let model = model.into();
        let kind = model.kind();
        let name = model.model_name().to_string();
        self.model.set(model).map_err(|rejected| {
            ClassifierError::config_error(format!(
                "a model is already installed; refusing '{}'",
                rejected.model_name()
            ))
        })?;
        tracing::info!(model = %name, %kind, labels = self.catalog.len(), "model ready");
        Ok(())
    }

    /// Session options derived from the classifier configuration.
    pub fn graph_model_options(&self) -> GraphModelOptions {
        GraphModelOptions {
            model_name: Some(self.config.model_name.clone()),
            input_name: self.config.input_name.clone(),
            output_name: self.config.output_name.clone(),
            session_pool_size: self.config.session_pool_size,
            input_size: Some(self.config.input_size),
            ort_session: self.config.ort_session.clone(),
        }
    }

    /// Loads an ONNX model from `path` and installs it.
    ///
    /// A missing path is a [`ClassifierError::Config`] error raised before any
    /// session is created.
    pub fn load_onnx_model(&self, path: impl AsRef<Path>) -> ClassifierResult<()> {
        let path = path.as_ref();
        self.config.validate_model_path(path)?;
        let model = GraphModel::load(path, &self.graph_model_options())?;
        self.install_model(model)
    }

    /// Loads an ONNX model on a background thread.
    ///
    /// Requests made before the load completes fail with
    /// [`ClassifierError::ModelNotReady`]. The returned handle yields the load outcome.
    pub fn spawn_onnx_model_load(
        self: &Arc<Self>,
        path: impl Into<PathBuf>,
    ) -> JoinHandle<ClassifierResult<()>> {
        let classifier = Arc::clone(self);
        let path = path.into();
        std::thread::spawn(move || {
            let outcome = classifier.load_onnx_model(&path);
            if let Err(e) = &outcome {
                tracing::error!("background model load from {} failed: {}", path.display(), e);
            }
            outcome
        })
    }

    /// True once a model is installed.
    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Readiness and active settings.
    pub fn status(&self) -> ClassifierStatus {
        let state = self.calibration_snapshot();
        let model = self.model.get();
        ClassifierStatus {
            model_ready: model.is_some(),
            model_kind: model.map(ClassifierModel::kind),
            model_name: model
                .map(|m| m.model_name().to_string())
                .unwrap_or_else(|| self.config.model_name.clone()),
            label_count: self.catalog.len(),
            input_size: self.config.input_size,
            tta_enabled: self.config.augmentation.enabled,
            confidence_threshold: state.config.confidence_threshold,
            margin_threshold: state.config.margin_threshold,
            entropy_threshold: state.config.entropy_threshold,
            sharpen_gamma: state.config.sharpen_gamma,
            softmax_temperature: state.normalizer.temperature(),
        }
    }

    /// Validates `config` and replaces the active calibration as a whole.
    ///
    /// In-flight requests finish with the calibration they started with.
    pub fn replace_calibration(&self, config: CalibrationConfig) -> ClassifierResult<()> {
        let state = Arc::new(CalibrationState::build(config, &self.catalog)?);
        match self.calibration.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
        tracing::info!("calibration replaced");
        Ok(())
    }

    /// A copy of the active calibration.
    pub fn calibration(&self) -> CalibrationConfig {
        self.calibration_snapshot().config.clone()
    }

    /// The class catalog.
    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// The classifier configuration.
    pub fn config(&self) -> &ImageClassifierConfig {
        &self.config
    }

    /// Ledger counting the tensors allocated by this classifier.
    pub fn tensor_ledger(&self) -> &Arc<TensorLedger> {
        &self.ledger
    }

    /// Classifies an encoded image.
    ///
    /// # Errors
    ///
    /// * [`ClassifierError::ModelNotReady`] before a model is installed (checked first)
    /// * [`ClassifierError::ImageDecode`] for undecodable bytes
    /// * [`ClassifierError::ConfigMismatch`] when the model output width differs from the catalog
    /// * [`ClassifierError::InferenceExecution`] when the model invocation fails
    ///
    /// A rejected prediction is not an error: it is an `Ok` result with
    /// `applied_unknown` set.
    pub fn classify(
        &self,
        image_bytes: &[u8],
        options: ClassifyOptions,
    ) -> ClassifierResult<ClassificationResult> {
        let model = self
            .model
            .get()
            .ok_or_else(|| ClassifierError::model_not_ready(&self.config.model_name))?;
        let state = self.calibration_snapshot();

        let input = self.normalizer.normalize(image_bytes, &self.ledger)?;
        let width = self.catalog.len();
        let calibrate_each = state.config.ensemble_order == EnsembleOrder::CalibrateThenAverage;

        let variants = self.ensembler.run(
            &input,
            |variant: Augmentation, tensor: &TensorHandle| {
                let raw = model.infer(tensor, width)?;
                let (probs, branch) = state.normalizer.normalize(&raw);
                tracing::trace!(?variant, ?branch, "variant evaluated");
                let probs = if calibrate_each {
                    state.calibrator.calibrate(&probs)
                } else {
                    probs
                };
                Ok((probs, branch))
            },
        )?;
        drop(input);

        let (vectors, branches): (Vec<Vec<f64>>, Vec<NormalizationBranch>) =
            variants.into_iter().unzip();
        let mean = ensemble_mean(&vectors)?;
        let probs = if calibrate_each {
            mean
        } else {
            state.calibrator.calibrate(&mean)
        };

        let mut result = state.policy.decide(&probs, &self.catalog)?;
        if options.debug {
            if let Some(diagnostics) = result.diagnostics.as_mut() {
                diagnostics.variant_branches = branches;
                tracing::debug!(
                    probabilities = ?diagnostics.probabilities,
                    best = diagnostics.best_probability,
                    second = diagnostics.second_probability,
                    entropy = diagnostics.entropy,
                    threshold = diagnostics.threshold,
                    branches = ?diagnostics.variant_branches,
                    "classified as {} (score {})",
                    result.label,
                    result.score
                );
            }
        } else {
            result.diagnostics = None;
        }
        Ok(result)
    }

    /// Reads `path` and classifies its contents.
    pub fn classify_file(
        &self,
        path: impl AsRef<Path>,
        options: ClassifyOptions,
    ) -> ClassifierResult<ClassificationResult> {
        let bytes = crate::utils::read_image_bytes(path)?;
        self.classify(&bytes, options)
    }

    fn calibration_snapshot(&self) -> Arc<CalibrationState> {
        match self.calibration.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

/// Builder for [`ImageClassifier`].
#[derive(Debug, Default)]
pub struct ImageClassifierBuilder {
    config: ImageClassifierConfig,
    calibration: CalibrationConfig,
    catalog: Option<ClassCatalog>,
    model: Option<ClassifierModel>,
    env_overrides: bool,
}

impl ImageClassifierBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole classifier configuration.
    pub fn config(mut self, config: ImageClassifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the model name.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_name = name.into();
        self
    }

    /// Sets the model input side length.
    pub fn input_size(mut self, size: u32) -> Self {
        self.config.input_size = size;
        self
    }

    /// Declares whether the model rescales pixel values itself.
    pub fn model_includes_rescaling(mut self, includes: bool) -> Self {
        self.config.model_includes_rescaling = includes;
        self
    }

    /// Sets the resize filter.
    pub fn resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.config.resize_filter = filter;
        self
    }

    /// Sets the augmentation configuration.
    pub fn augmentation(mut self, augmentation: AugmentationConfig) -> Self {
        self.config.augmentation = augmentation;
        self
    }

    /// Evaluates the identity variant only.
    pub fn disable_augmentation(mut self) -> Self {
        self.config.augmentation.enabled = false;
        self
    }

    /// Evaluates augmentation variants concurrently or sequentially.
    pub fn parallel_variants(mut self, parallel: bool) -> Self {
        self.config.parallel_variants = parallel;
        self
    }

    /// Sets the ONNX Runtime session pool size.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.config.session_pool_size = size;
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.config.ort_session = Some(config);
        self
    }

    /// Overrides the graph input name.
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.config.input_name = Some(name.into());
        self
    }

    /// Overrides the graph output name.
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = Some(name.into());
        self
    }

    /// Sets the class catalog.
    pub fn catalog(mut self, catalog: ClassCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the calibration configuration.
    pub fn calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// Applies environment overrides to both configurations at build time.
    pub fn with_env_overrides(mut self) -> Self {
        self.env_overrides = true;
        self
    }

    /// Installs `model` at build time.
    pub fn model(mut self, model: impl Into<ClassifierModel>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the classifier.
    pub fn build(self) -> ClassifierResult<ImageClassifier> {
        let catalog = self
            .catalog
            .ok_or_else(|| ClassifierError::config_error("a class catalog is required"))?;
        let (config, calibration) = if self.env_overrides {
            (
                self.config.with_env_overrides()?,
                self.calibration.with_env_overrides()?,
            )
        } else {
            (self.config, self.calibration)
        };
        calibration.validate()?;
        ImageClassifier::new(config, catalog, calibration, self.model)
    }
}
