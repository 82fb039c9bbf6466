//! Avatar cache: best-effort download of commenter profile images.
//!
//! Runs after extraction, before the batch is finalized. Every failure mode
//! (dead URL, timeout, disk error) leaves `local_path` as `None` on the
//! affected records — avatars are decoration, not data.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::browser::random_user_agent;
use crate::core::types::Comment;

/// Parallel downloads in flight at once.
const FETCH_CONCURRENCY: usize = 8;

pub struct AvatarCache {
    dir: PathBuf,
    client: reqwest::Client,
}

impl AvatarCache {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating avatar cache dir {}", dir.display()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(random_user_agent())
            .build()
            .context("building avatar http client")?;
        Ok(Self { dir, client })
    }

    /// Stable cache key: the same author+url pair always lands on the same
    /// file, so repeat harvests reuse earlier downloads.
    pub fn cache_key(author: &str, url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(author.as_bytes());
        hasher.update([0u8]);
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn file_for(&self, author: &str, url: &str) -> PathBuf {
        let ext = extension_of(url).unwrap_or("jpg");
        self.dir
            .join(format!("{}.{}", Self::cache_key(author, url), ext))
    }

    /// Fill `local_path` on every record whose avatar URL can be fetched.
    /// Distinct records sharing an author+url pair share one download.
    pub async fn resolve(&self, comments: &mut [Comment]) {
        let mut wanted: HashMap<(String, String), PathBuf> = HashMap::new();
        for c in comments.iter() {
            if let Some(url) = &c.avatar.url {
                wanted
                    .entry((c.author.clone(), url.clone()))
                    .or_insert_with(|| self.file_for(&c.author, url));
            }
        }
        if wanted.is_empty() {
            return;
        }
        debug!(unique = wanted.len(), "resolving avatars");

        let results: HashMap<(String, String), Option<PathBuf>> = stream::iter(wanted)
            .map(|((author, url), path)| async move {
                let got = self.fetch_one(&url, &path).await;
                ((author, url), got.then_some(path))
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut resolved = 0usize;
        for c in comments.iter_mut() {
            if let Some(url) = c.avatar.url.clone() {
                if let Some(Some(path)) = results.get(&(c.author.clone(), url)) {
                    c.avatar.local_path = Some(path.clone());
                    resolved += 1;
                }
            }
        }
        info!(resolved, "avatar cache updated");
    }

    /// Returns whether `path` now holds the image. Cache hits skip the fetch.
    async fn fetch_one(&self, url: &str, path: &Path) -> bool {
        if path.exists() {
            return true;
        }
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("avatar fetch failed for {}: {}", url, e);
                return false;
            }
        };
        if !resp.status().is_success() {
            warn!("avatar fetch for {} returned {}", url, resp.status());
            return false;
        }
        let bytes = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!("avatar body read failed for {}: {}", url, e);
                return false;
            }
        };
        if let Err(e) = tokio::fs::write(path, &bytes).await {
            warn!("avatar write failed at {}: {}", path.display(), e);
            return false;
        }
        true
    }
}

/// Image extension from the URL path, when it looks like one.
fn extension_of(url: &str) -> Option<&'static str> {
    let path = url::Url::parse(url).ok()?.path().to_ascii_lowercase();
    for ext in ["jpeg", "jpg", "png", "webp", "gif"] {
        if path.ends_with(&format!(".{ext}")) {
            return Some(match ext {
                "jpeg" => "jpeg",
                "jpg" => "jpg",
                "png" => "png",
                "webp" => "webp",
                _ => "gif",
            });
        }
    }
    None
}
