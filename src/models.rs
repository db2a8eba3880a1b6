//! Data models and structures
//!
//! Defines the raw form inputs, the normalized generation request handed to
//! the fal client, the results it produces, and runtime configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Seed value older form submissions used to mean "no seed".
pub const LEGACY_UNSET_SEED: i64 = -1;

/// Default strength of the reference image slider.
pub const DEFAULT_REFERENCE_STRENGTH: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[serde(rename = "21:9")]
    UltraWide,
    #[serde(rename = "16:9")]
    Wide,
    #[default]
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "9:16")]
    Tall,
    #[serde(rename = "9:21")]
    UltraTall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 7] = [
        AspectRatio::UltraWide,
        AspectRatio::Wide,
        AspectRatio::Landscape,
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Tall,
        AspectRatio::UltraTall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::UltraWide => "21:9",
            AspectRatio::Wide => "16:9",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Tall => "9:16",
            AspectRatio::UltraTall => "9:21",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| Error::Validation(format!("unsupported aspect ratio '{}'", trimmed)))
    }
}

/// Parse the free-text seed field.
///
/// Blank input and the legacy `-1` sentinel both mean "unset"; the remote
/// service picks a random seed in that case.
pub fn parse_seed(input: Option<&str>) -> Result<Option<i64>> {
    let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let seed = raw
        .parse::<i64>()
        .map_err(|_| Error::Validation(format!("seed must be an integer, got '{}'", raw)))?;

    if seed == LEGACY_UNSET_SEED {
        Ok(None)
    } else {
        Ok(Some(seed))
    }
}

/// Validate a reference strength slider value.
pub fn parse_strength(value: f64) -> Result<f64> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::Validation(format!(
            "reference strength must be between 0 and 1, got {}",
            value
        )))
    }
}

/// Inputs exactly as they arrive from the form or the CLI.
#[derive(Debug, Clone)]
pub struct GenerateInputs {
    pub prompt: String,
    pub aspect_ratio: String,
    pub reference_image: Option<Vec<u8>>,
    pub reference_strength: f64,
    pub raw: bool,
    pub seed: Option<String>,
}

impl GenerateInputs {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default().to_string(),
            reference_image: None,
            reference_strength: DEFAULT_REFERENCE_STRENGTH,
            raw: false,
            seed: None,
        }
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_reference(mut self, image: Vec<u8>, strength: f64) -> Self {
        self.reference_image = Some(image);
        self.reference_strength = strength;
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }
}

/// A reference image that has already been uploaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReference {
    pub url: String,
    pub strength: f64,
}

/// Normalized request handed to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub reference: Option<ImageReference>,
    pub raw: bool,
    pub seed: Option<i64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio,
            reference: None,
            raw: false,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultImage {
    pub remote_url: String,
    pub local_path: Option<String>,
}

impl ResultImage {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            remote_url: url.into(),
            local_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub images: Vec<ResultImage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Upload to fal's asset storage and reference it by URL.
    Fal,
    /// Embed the image as a base64 data URL in the request itself.
    Inline,
}

impl FromStr for UploadMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fal" => Ok(UploadMode::Fal),
            "inline" => Ok(UploadMode::Inline),
            other => Err(Error::Config(format!(
                "FAL_STUDIO_UPLOAD_MODE must be 'fal' or 'inline', got '{}'",
                other
            ))),
        }
    }
}

// Configuration
pub const DEFAULT_API_BASE: &str = "https://fal.run";
pub const DEFAULT_STORAGE_BASE: &str = "https://rest.alpha.fal.ai";
pub const DEFAULT_TEXT_MODEL: &str = "fal-ai/flux-pro/v1.1-ultra";
pub const DEFAULT_IMAGE_MODEL: &str = "fal-ai/flux-pro/v1.1-ultra/redux";

#[derive(Debug, Clone)]
pub struct Config {
    pub fal_key: Option<String>,
    pub api_base: String,
    pub storage_base: String,
    pub text_model: String,
    pub image_model: String,
    pub output_dir: PathBuf,
    pub prompt_file: Option<PathBuf>,
    pub last_copy_dir: Option<PathBuf>,
    pub upload_mode: UploadMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let upload_mode = match non_empty("FAL_STUDIO_UPLOAD_MODE") {
            Some(mode) => mode.parse()?,
            None => UploadMode::Fal,
        };

        // An explicitly empty value disables the convenience copy.
        let last_copy_dir = match var("FAL_STUDIO_LAST_COPY_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir.trim())),
            None => Some(PathBuf::from(".")),
        };

        Ok(Self {
            fal_key: non_empty("FAL_KEY"),
            api_base: non_empty("FAL_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            storage_base: non_empty("FAL_STORAGE_BASE")
                .unwrap_or_else(|| DEFAULT_STORAGE_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            text_model: non_empty("FAL_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: non_empty("FAL_IMAGE_MODEL")
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            output_dir: non_empty("FAL_STUDIO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            prompt_file: non_empty("FAL_STUDIO_PROMPT_FILE").map(PathBuf::from),
            last_copy_dir,
            upload_mode,
        })
    }

    /// The API key, required by every command that talks to fal.
    pub fn require_fal_key(&self) -> Result<&str> {
        self.fal_key
            .as_deref()
            .ok_or_else(|| Error::Config("FAL_KEY not set".to_string()))
    }

    pub fn log_file(&self) -> PathBuf {
        self.output_dir.join("prompts.log")
    }
}
