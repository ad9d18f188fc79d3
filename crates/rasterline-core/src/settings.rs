//! JSON export configuration.
//!
//! An [`ExportConfig`] is the serializable form of one export: the
//! processing settings shared by every item plus the batch options. Every
//! field has a default, so `{}` is a valid document that re-encodes sources
//! as JPEG next to an `_edited` suffix.
//!
//! ```ignore
//! let config = ExportConfig::load(Path::new("export.json"))?;
//! let job = config.into_job()?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::{BatchJob, BatchOptions, ConflictPolicy, NamingScheme, OutputNaming};
use crate::decode::{decode_file, DecodeError};
use crate::effects::EffectSnapshot;
use crate::encode::EncodeSettings;
use crate::overlay::{
    OverlayPlacement, OverlaySizing, OverlaySpec, TextOverlay, TextStyle, MAX_OUTLINE_WIDTH,
    MAX_SIZE_PX,
};
use crate::pipeline::ProcessingSettings;
use crate::resize::{ResizeMode, ResizeSpec, MAX_DIMENSION};
use crate::transform::{CropSpec, GeometricTransform};

/// Errors produced while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load overlay image: {0}")]
    OverlayImage(#[from] DecodeError),
}

/// Where overlay pixels come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlaySource {
    /// An image file, decoded when the configuration is turned into
    /// settings.
    Image { path: PathBuf },
    /// Templated text.
    Text {
        template: String,
        #[serde(default)]
        style: TextStyle,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub source: OverlaySource,
    #[serde(default)]
    pub placement: OverlayPlacement,
}

/// One export, as read from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub crop: Option<CropSpec>,
    pub transform: GeometricTransform,
    pub resize: ResizeSpec,
    pub overlay: Option<OverlayConfig>,
    pub encode: EncodeSettings,
    pub output_dir: PathBuf,
    pub naming: NamingScheme,
    pub conflict: ConflictPolicy,
    pub allow_overwrite_source: bool,
    /// Worker threads; absent means one per core.
    pub threads: Option<usize>,
    pub fail_fast: bool,
    /// Reject crops leaving fewer pixels than this on either side.
    pub min_crop_dimension: Option<u32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            crop: None,
            transform: GeometricTransform::default(),
            resize: ResizeSpec::default(),
            overlay: None,
            encode: EncodeSettings::default(),
            output_dir: PathBuf::from("."),
            naming: NamingScheme::default(),
            conflict: ConflictPolicy::default(),
            allow_overwrite_source: false,
            threads: None,
            fail_fast: false,
            min_crop_dimension: None,
        }
    }
}

impl ExportConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ExportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON file. Relative overlay image and output paths are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        tracing::debug!(path = %path.display(), "export configuration loaded");
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        if let Some(OverlayConfig {
            source: OverlaySource::Image { path },
            ..
        }) = &mut self.overlay
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(1..=100).contains(&self.encode.quality) {
            return invalid(format!("quality must be 1-100, got {}", self.encode.quality));
        }
        if self.threads == Some(0) {
            return invalid("threads must be >= 1 when set".into());
        }
        if self.min_crop_dimension == Some(0) {
            return invalid("min_crop_dimension must be >= 1 when set".into());
        }
        if self.output_dir.as_os_str().is_empty() {
            return invalid("output_dir must not be empty".into());
        }

        let dimension_ok = |v: u32| (1..=MAX_DIMENSION).contains(&v);
        match self.resize.mode {
            ResizeMode::Exact { width, height }
                if !dimension_ok(width) || !dimension_ok(height) =>
            {
                return invalid(format!(
                    "exact resize needs dimensions 1-{MAX_DIMENSION}, got {width}x{height}"
                ));
            }
            ResizeMode::MaxWidth { width: v } | ResizeMode::MaxHeight { height: v }
                if !dimension_ok(v) =>
            {
                return invalid(format!("max resize dimension must be 1-{MAX_DIMENSION}, got {v}"));
            }
            ResizeMode::Percentage { percent } if !(percent.is_finite() && percent > 0.0) => {
                return invalid(format!("resize percentage must be positive, got {percent}"));
            }
            _ => {}
        }

        if let Some(overlay) = &self.overlay {
            let placement = &overlay.placement;
            if !(0.0..=1.0).contains(&placement.opacity) {
                return invalid(format!("overlay opacity must be 0-1, got {}", placement.opacity));
            }
            match placement.sizing {
                OverlaySizing::RelativeToWidth { fraction }
                | OverlaySizing::RelativeToHeight { fraction }
                    if !(fraction.is_finite() && fraction > 0.0) =>
                {
                    return invalid(format!(
                        "overlay size fraction must be positive, got {fraction}"
                    ));
                }
                OverlaySizing::FixedWidth { width: 0 } => {
                    return invalid("overlay width must be positive".into());
                }
                _ => {}
            }
            match &overlay.source {
                OverlaySource::Text { style, .. }
                    if !(1..=MAX_SIZE_PX).contains(&style.size_px) =>
                {
                    return invalid(format!(
                        "overlay text size must be 1-{MAX_SIZE_PX}, got {}",
                        style.size_px
                    ));
                }
                OverlaySource::Text { style, .. }
                    if style.outline.is_some_and(|o| o.width > MAX_OUTLINE_WIDTH) =>
                {
                    return invalid(format!(
                        "overlay outline width must be at most {MAX_OUTLINE_WIDTH}"
                    ));
                }
                OverlaySource::Image { path } if path.as_os_str().is_empty() => {
                    return invalid("overlay image path must not be empty".into());
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Processing settings for the pipeline, decoding the overlay image if
    /// there is one.
    pub fn into_settings(self) -> Result<ProcessingSettings, ConfigError> {
        let overlay = match self.overlay {
            None => None,
            Some(config) => Some(match config.source {
                OverlaySource::Image { path } => {
                    OverlaySpec::image(decode_file(&path)?, config.placement)
                }
                OverlaySource::Text { template, style } => {
                    OverlaySpec::text(TextOverlay::new(template, style), config.placement)
                }
            }),
        };
        Ok(ProcessingSettings {
            crop: self.crop,
            transform: self.transform,
            resize: self.resize,
            overlay,
            min_crop_dimension: self.min_crop_dimension,
        })
    }

    pub fn naming(&self) -> OutputNaming {
        OutputNaming::new(&self.output_dir, self.naming.clone(), self.encode.format)
    }

    /// A batch job with no region effects. Attach an effect snapshot with
    /// the job's `effects` field before running.
    pub fn into_job(self) -> Result<BatchJob, ConfigError> {
        let naming = self.naming();
        let conflict = self.conflict;
        let allow_overwrite_source = self.allow_overwrite_source;
        let quality = self.encode.quality;
        let options = BatchOptions {
            threads: self.threads,
            fail_fast: self.fail_fast,
        };
        Ok(BatchJob {
            settings: self.into_settings()?,
            effects: EffectSnapshot::default(),
            naming,
            conflict,
            allow_overwrite_source,
            quality,
            options,
        })
    }
}
