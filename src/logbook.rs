//! JSON-lines request log kept next to the archived images.

use crate::models::GenerationRequest;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum LogEntry {
    Request {
        request_id: Uuid,
        timestamp: DateTime<Utc>,
        model: String,
        prompt: String,
        aspect_ratio: String,
        raw: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        seed: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reference_strength: Option<f64>,
    },
    Completed {
        request_id: Uuid,
        timestamp: DateTime<Utc>,
        paths: Vec<String>,
    },
    Failed {
        request_id: Uuid,
        timestamp: DateTime<Utc>,
        kind: String,
        message: String,
    },
}

impl LogEntry {
    pub fn request(request_id: Uuid, model: &str, request: &GenerationRequest) -> Self {
        LogEntry::Request {
            request_id,
            timestamp: Utc::now(),
            model: model.to_string(),
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio.to_string(),
            raw: request.raw,
            seed: request.seed,
            reference_strength: request.reference.as_ref().map(|r| r.strength),
        }
    }

    pub fn completed(request_id: Uuid, paths: &[String]) -> Self {
        LogEntry::Completed {
            request_id,
            timestamp: Utc::now(),
            paths: paths.to_vec(),
        }
    }

    pub fn failed(request_id: Uuid, error: &Error) -> Self {
        LogEntry::Failed {
            request_id,
            timestamp: Utc::now(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

pub struct RequestLog {
    path: Option<PathBuf>,
}

impl RequestLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A log that drops every entry.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry. Failures are reported but never propagated.
    pub fn record(&self, entry: &LogEntry) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = Self::append(path, entry) {
            tracing::warn!("Failed to append to request log {}: {}", path.display(), e);
        }
    }

    fn append(path: &Path, entry: &LogEntry) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
