use askama::Template;
use askama_web::WebTemplate;

use crate::models::{AspectRatio, GenerateInputs, DEFAULT_REFERENCE_STRENGTH};

/// Values echoed back into the form after a submission.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FormValues {
    pub(crate) prompt: String,
    pub(crate) aspect_ratio: String,
    pub(crate) strength: f64,
    pub(crate) raw: bool,
    pub(crate) seed: String,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: AspectRatio::default().as_str().to_string(),
            strength: DEFAULT_REFERENCE_STRENGTH,
            raw: false,
            seed: String::new(),
        }
    }
}

impl From<&GenerateInputs> for FormValues {
    fn from(inputs: &GenerateInputs) -> Self {
        Self {
            prompt: inputs.prompt.clone(),
            aspect_ratio: inputs.aspect_ratio.clone(),
            strength: inputs.reference_strength,
            raw: inputs.raw,
            seed: inputs.seed.clone().unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RatioOption {
    pub(crate) value: &'static str,
    pub(crate) checked: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) form: FormValues,
    pub(crate) ratios: Vec<RatioOption>,
    pub(crate) error: Option<String>,
    /// First image of the most recent generation, as a public URL.
    pub(crate) latest: Option<String>,
    /// Public image URLs, newest first.
    pub(crate) gallery: Vec<String>,
}

impl IndexTemplate {
    pub(crate) fn new(
        form: FormValues,
        error: Option<String>,
        latest: Option<String>,
        gallery: Vec<String>,
    ) -> Self {
        let ratios = AspectRatio::ALL
            .into_iter()
            .map(|ratio| RatioOption {
                value: ratio.as_str(),
                checked: ratio.as_str() == form.aspect_ratio,
            })
            .collect();
        Self {
            form,
            ratios,
            error,
            latest,
            gallery,
        }
    }
}
