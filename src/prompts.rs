//! Catalog of candidate prompts for the "random prompt" action.

use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    prompts: Vec<String>,
}

impl PromptCatalog {
    /// Load one prompt per non-empty line.
    ///
    /// A missing or unreadable file yields an empty catalog.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match fs::read_to_string(path) {
            Ok(text) => {
                let catalog = Self::parse(&text);
                tracing::info!(
                    "Loaded {} prompts from {}",
                    catalog.len(),
                    path.display()
                );
                catalog
            }
            Err(e) => {
                tracing::warn!("Could not read prompt file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        Self {
            prompts: text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_prompts(prompts: Vec<String>) -> Self {
        Self { prompts }
    }

    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// `None` means "leave the current prompt alone".
    pub fn pick_random(&self) -> Option<&str> {
        self.prompts
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }
}
