//! Month-partitioned archive of downloaded images
//!
//! Results land in `<root>/<MM-YYYY>/<file name from the URL>`. The directory
//! tree is the only index: history is rebuilt by listing it.

use crate::{Error, Result};
use chrono::{Local, NaiveDate};
use reqwest::{Client, Url};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// URL prefix under which the web layer serves the output root.
pub const PUBLIC_PREFIX: &str = "/output";

pub struct ImageStore {
    http: Client,
    root: PathBuf,
    last_copy_dir: Option<PathBuf>,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::new_with_client(root, Client::new())
    }

    pub fn new_with_client(root: impl Into<PathBuf>, http: Client) -> Self {
        Self {
            http,
            root: root.into(),
            last_copy_dir: None,
        }
    }

    /// Also copy every persisted image to `<dir>/last<slot>.jpg`.
    pub fn with_last_copy_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.last_copy_dir = dir;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_key(date: NaiveDate) -> String {
        date.format("%m-%Y").to_string()
    }

    pub fn ensure_partition(&self, key: &str) -> Result<PathBuf> {
        let dir = self.root.join(key);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn current_partition(&self) -> Result<PathBuf> {
        self.ensure_partition(&Self::partition_key(Local::now().date_naive()))
    }

    /// Derive the archive file name from the last URL path segment.
    ///
    /// Query and fragment are ignored and the segment is percent-decoded.
    /// Names without a supported image extension get `.jpg` appended so they
    /// show up in listings.
    pub fn filename_for_url(url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::Persistence(format!("invalid image URL '{}': {}", url, e)))?;

        let raw_segment = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or_else(|| {
                Error::Persistence(format!("cannot derive a file name from '{}'", url))
            })?;

        let segment = urlencoding::decode(raw_segment).map_err(|e| {
            Error::Persistence(format!("undecodable file name in '{}': {}", url, e))
        })?;
        if segment.contains(['/', '\\']) || segment == "." || segment == ".." {
            return Err(Error::Persistence(format!(
                "unsafe file name '{}' in '{}'",
                segment, url
            )));
        }

        if has_supported_extension(Path::new(segment.as_ref())) {
            Ok(segment.to_string())
        } else {
            Ok(format!("{}.jpg", segment))
        }
    }

    /// Download `remote_url` into `partition` and return the normalized path.
    ///
    /// An existing file with the same name is overwritten.
    pub async fn persist(&self, remote_url: &str, partition: &Path, slot: usize) -> Result<String> {
        let filename = Self::filename_for_url(remote_url)?;
        let bytes = self.download(remote_url).await?;

        let file_path = partition.join(&filename);
        tokio::fs::write(&file_path, &bytes).await.map_err(|e| {
            Error::Persistence(format!("failed to write {}: {}", file_path.display(), e))
        })?;
        tracing::info!("Saved image to {}", file_path.display());

        if let Some(dir) = &self.last_copy_dir {
            let last_path = dir.join(format!("last{}.jpg", slot));
            tokio::fs::write(&last_path, &bytes).await.map_err(|e| {
                Error::Persistence(format!("failed to write {}: {}", last_path.display(), e))
            })?;
            tracing::debug!("Updated {}", last_path.display());
        }

        Ok(normalize_path(&file_path))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await.map_err(|e| {
            tracing::error!("Failed to download {}: {}", url, e);
            Error::Network(format!("{}: {}", url, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Image download returned status {} for {}", status, url);
            return Err(Error::Network(format!("{} returned status {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", url, e)))?;
        Ok(bytes.to_vec())
    }

    /// Images in one partition, newest first.
    ///
    /// Equal modification times fall back to file name order. A partition
    /// that has not been created yet is simply empty.
    pub fn list_existing(&self, partition: &Path) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        collect_images(partition, &mut entries)?;
        Ok(sort_newest_first(entries))
    }

    /// Images across every partition under the root, newest first.
    pub fn list_all(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                collect_images(&path, &mut entries)?;
            }
        }
        Ok(sort_newest_first(entries))
    }

    /// URL path the web layer serves `local_path` under, if it lives in the root.
    pub fn public_path(&self, local_path: &str) -> Option<String> {
        let root = normalize_path(&self.root);
        let relative = local_path
            .strip_prefix(root.trim_end_matches('/'))?
            .strip_prefix('/')?;
        if relative.is_empty() {
            return None;
        }
        Some(format!("{}/{}", PUBLIC_PREFIX, relative))
    }
}

/// Render a path with forward slashes regardless of platform.
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn collect_images(dir: &Path, out: &mut Vec<(SystemTime, String)>) -> Result<()> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_supported_extension(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(UNIX_EPOCH);
        out.push((modified, normalize_path(&path)));
    }
    Ok(())
}

fn sort_newest_first(mut entries: Vec<(SystemTime, String)>) -> Vec<String> {
    entries.sort_by(|(a_time, a_name), (b_time, b_name)| {
        b_time.cmp(a_time).then_with(|| a_name.cmp(b_name))
    });
    entries.into_iter().map(|(_, name)| name).collect()
}
