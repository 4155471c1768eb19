use crate::error::{Error, Result};
use crate::mime::{
    MimeDescriptor, IMAGE_JPEG, IMAGE_JPG, IMAGE_PNG, IMAGE_WEBP, IMAGE_X_ALPHA8, IMAGE_X_RGBA8,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Progress sink receiving `(phase_key, current, total)`.
///
/// Phase keys are colon-delimited tags such as `fetch:/models/medium` or
/// `compute:inference`.
pub type ProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

pub const DEFAULT_OUTPUT_QUALITY: f32 = 0.8;

const OUTPUT_FORMATS: [&str; 6] = [
    IMAGE_PNG,
    IMAGE_JPEG,
    IMAGE_JPG,
    IMAGE_WEBP,
    IMAGE_X_ALPHA8,
    IMAGE_X_RGBA8,
];

/// Execution device for inference. `Gpu` falls back to CPU when no GPU
/// provider is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

/// Segmentation model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ModelSize {
    /// Catalog key of the model weights.
    pub fn resource_key(self) -> &'static str {
        match self {
            ModelSize::Small => "/models/small",
            ModelSize::Medium => "/models/medium",
            ModelSize::Large => "/models/large",
        }
    }
}

/// Unvalidated configuration as supplied by a caller or a JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigOptions {
    pub public_path: Option<String>,
    pub debug: Option<bool>,
    pub device: Option<Device>,
    pub model: Option<ModelSize>,
    pub output: Option<OutputOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputOptions {
    pub format: Option<String>,
    pub quality: Option<f32>,
}

impl ConfigOptions {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::config(e.to_string()))
    }

    /// Apply defaults and validate. No I/O beyond resolving the working
    /// directory for the default `publicPath`.
    pub fn validate(self) -> Result<Config> {
        let public_path = match self.public_path {
            Some(path) => parse_public_path(&path)?,
            None => default_public_path()?,
        };

        let output = self.output.unwrap_or_default();
        let format = match output.format {
            Some(format) => MimeDescriptor::parse(&format)?,
            None => MimeDescriptor::new(IMAGE_PNG)?,
        };
        if !OUTPUT_FORMATS.contains(&format.mime_type()) {
            return Err(Error::config(format!(
                "output.format '{format}' must be one of {}",
                OUTPUT_FORMATS.join(", ")
            )));
        }

        let quality = output.quality.unwrap_or(DEFAULT_OUTPUT_QUALITY);
        if !(0.0..=1.0).contains(&quality) {
            return Err(Error::config(format!(
                "output.quality {quality} must be within [0, 1]"
            )));
        }

        let config = Config {
            public_path,
            debug: self.debug.unwrap_or(false),
            device: self.device.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            output: OutputConfig { format, quality },
            progress: None,
        };

        if config.debug {
            tracing::debug!("Config: {:?}", config);
        }
        Ok(config)
    }
}

fn parse_public_path(path: &str) -> Result<Url> {
    let mut url = Url::parse(path)
        .map_err(|e| Error::config(format!("publicPath '{path}' must be a valid URI: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::config(format!(
            "publicPath '{path}' cannot be used as a base URI"
        )));
    }
    if !url.path().ends_with('/') {
        let dir = format!("{}/", url.path());
        url.set_path(&dir);
    }
    Ok(url)
}

fn default_public_path() -> Result<Url> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::config(format!("cannot resolve default publicPath: {e}")))?;
    Url::from_directory_path(cwd.join("dist"))
        .map_err(|_| Error::config("cannot resolve default publicPath"))
}

/// Output encoding settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputConfig {
    pub format: MimeDescriptor,
    pub quality: f32,
}

/// Validated, immutable pipeline configuration.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    public_path: Url,
    debug: bool,
    device: Device,
    model: ModelSize,
    output: OutputConfig,
    #[serde(skip)]
    progress: Option<ProgressFn>,
}

impl Config {
    /// Attach a progress sink.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn public_path(&self) -> &Url {
        &self.public_path
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn model(&self) -> ModelSize {
        self.model
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Report progress to the attached sink. Without one, debug mode traces
    /// progress instead.
    pub fn report(&self, key: &str, current: u64, total: u64) {
        if let Some(progress) = &self.progress {
            progress(key, current, total);
        } else if self.debug {
            tracing::debug!("Progress {}: {} of {}", key, current, total);
        }
    }

    /// Canonical serialisation used to memoise sessions. The progress sink is
    /// not part of it.
    pub fn cache_key(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("public_path", &self.public_path.as_str())
            .field("debug", &self.debug)
            .field("device", &self.device)
            .field("model", &self.model)
            .field("output", &self.output)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn options(public_path: &str) -> ConfigOptions {
        ConfigOptions {
            public_path: Some(public_path.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_apply() {
        let config = options("https://cdn.example.com/dist/").validate().unwrap();
        assert_eq!(config.model(), ModelSize::Medium);
        assert_eq!(config.device(), Device::Cpu);
        assert_eq!(config.output().format.mime_type(), IMAGE_PNG);
        assert_eq!(config.output().quality, DEFAULT_OUTPUT_QUALITY);
        assert!(!config.debug());
    }

    #[test]
    fn default_public_path_is_a_directory_url() {
        let config = ConfigOptions::default().validate().unwrap();
        assert_eq!(config.public_path().scheme(), "file");
        assert!(config.public_path().path().ends_with("/dist/"));
    }

    #[test]
    fn public_path_gets_trailing_slash() {
        let config = options("https://cdn.example.com/dist").validate().unwrap();
        assert_eq!(config.public_path().as_str(), "https://cdn.example.com/dist/");
    }

    #[test]
    fn rejects_non_uri_public_path() {
        assert!(matches!(
            options("not a uri").validate(),
            Err(Error::ConfigValidation(_))
        ));
        assert!(matches!(
            options("mailto:someone@example.com").validate(),
            Err(Error::ConfigValidation(_))
        ));
    }

    #[test]
    fn rejects_bad_output_settings() {
        let mut opts = options("https://cdn.example.com/");
        opts.output = Some(OutputOptions {
            format: Some("image/gif".into()),
            quality: None,
        });
        assert!(matches!(opts.validate(), Err(Error::ConfigValidation(_))));

        let mut opts = options("https://cdn.example.com/");
        opts.output = Some(OutputOptions {
            format: None,
            quality: Some(1.5),
        });
        assert!(matches!(opts.validate(), Err(Error::ConfigValidation(_))));

        let mut opts = options("https://cdn.example.com/");
        opts.output = Some(OutputOptions {
            format: Some("image/x-alpha8;width".into()),
            quality: None,
        });
        assert!(matches!(opts.validate(), Err(Error::ConfigValidation(_))));
    }

    #[test]
    fn parses_json_options() {
        let json = br#"{
            "publicPath": "https://cdn.example.com/assets/",
            "debug": true,
            "device": "gpu",
            "model": "small",
            "output": { "format": "image/webp", "quality": 0.5 }
        }"#;
        let config = ConfigOptions::from_json(json).unwrap().validate().unwrap();
        assert_eq!(config.device(), Device::Gpu);
        assert_eq!(config.model().resource_key(), "/models/small");
        assert_eq!(config.output().format.mime_type(), IMAGE_WEBP);
        assert!(config.debug());

        assert!(matches!(
            ConfigOptions::from_json(br#"{ "model": "huge" }"#),
            Err(Error::ConfigValidation(_))
        ));
        assert!(matches!(
            ConfigOptions::from_json(br#"{ "unknown": 1 }"#),
            Err(Error::ConfigValidation(_))
        ));
    }

    #[test]
    fn cache_key_ignores_progress_but_not_settings() {
        let base = options("https://cdn.example.com/").validate().unwrap();
        let with_progress = base.clone().with_progress(Arc::new(|_: &str, _: u64, _: u64| {}));
        assert_eq!(base.cache_key().unwrap(), with_progress.cache_key().unwrap());

        let mut small = options("https://cdn.example.com/");
        small.model = Some(ModelSize::Small);
        let small = small.validate().unwrap();
        assert_ne!(base.cache_key().unwrap(), small.cache_key().unwrap());
    }

    #[test]
    fn report_forwards_to_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let config = options("https://cdn.example.com/")
            .validate()
            .unwrap()
            .with_progress(Arc::new(move |key: &str, current: u64, total: u64| {
                sink.lock().unwrap().push((key.to_string(), current, total));
            }));
        config.report("compute:inference", 1, 4);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("compute:inference".to_string(), 1, 4)]
        );
    }
}
