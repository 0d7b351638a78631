// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;
use crate::http::HttpTransport;
use crate::progress::{ProgressEvent, SharedProgressReporter};

/// Maps remote audio URLs to local files and performs one-shot downloads.
///
/// No resume, no eviction, no integrity check: a URL is either fully cached
/// or absent. Interrupted downloads leave a `.partial` file which
/// [`AudioCache::purge_partials`] removes on the next start.
#[derive(Debug, Clone)]
pub struct AudioCache {
    root: PathBuf,
}

impl AudioCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic local path for a remote audio URL.
    ///
    /// Strips the URL scheme, flattens the path with `-` and sanitizes the
    /// result. The same URL always maps to the same filename.
    pub fn local_path(&self, url: &str) -> PathBuf {
        let stripped = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let flat = stripped.replace('/', "-");
        self.root.join(sanitize_filename::sanitize(flat))
    }

    pub fn is_cached(&self, url: &str) -> bool {
        self.local_path(url).is_file()
    }

    /// Remove stale `.partial` files left behind by interrupted downloads.
    /// Returns how many were deleted. Missing cache directory is not an
    /// error; it simply holds nothing.
    pub fn purge_partials(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return 0;
        };

        let mut cleaned = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "partial")
                && std::fs::remove_file(&path).is_ok()
            {
                cleaned += 1;
            }
        }
        cleaned
    }

    /// Ensure the audio at `url` is present locally, downloading it if
    /// necessary. Returns the local path.
    ///
    /// The download is a single whole-file GET streamed to a `.partial`
    /// sibling, renamed into place on success. A non-success HTTP status is
    /// a hard failure and no file is left behind.
    pub async fn ensure_cached<T: HttpTransport + ?Sized>(
        &self,
        transport: &T,
        url: &str,
        show_title: &str,
        reporter: &SharedProgressReporter,
    ) -> Result<PathBuf, DownloadError> {
        let target = self.local_path(url);
        if target.is_file() {
            return Ok(target);
        }

        std::fs::create_dir_all(&self.root).map_err(|e| DownloadError::FileCreateFailed {
            path: self.root.clone(),
            source: e,
        })?;

        let response =
            transport
                .get_streaming(url)
                .await
                .map_err(|e| DownloadError::HttpFailed {
                    url: url.to_string(),
                    source: e,
                })?;

        if response.status >= 400 {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        reporter.report(ProgressEvent::DownloadStarting {
            show_title: show_title.to_string(),
            url: url.to_string(),
            content_length: response.content_length,
        });

        let partial = partial_path(&target);
        let result = self
            .stream_to_file(response, url, show_title, &partial, reporter)
            .await;

        match result {
            Ok(bytes_downloaded) => {
                std::fs::rename(&partial, &target).map_err(|e| {
                    DownloadError::FileWriteFailed {
                        path: target.clone(),
                        source: e,
                    }
                })?;
                reporter.report(ProgressEvent::DownloadCompleted {
                    show_title: show_title.to_string(),
                    bytes_downloaded,
                });
                Ok(target)
            }
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                reporter.report(ProgressEvent::DownloadFailed {
                    show_title: show_title.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn stream_to_file(
        &self,
        response: crate::http::HttpStream,
        url: &str,
        show_title: &str,
        partial: &Path,
        reporter: &SharedProgressReporter,
    ) -> Result<u64, DownloadError> {
        let mut file = File::create(partial)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: partial.to_path_buf(),
                source: e,
            })?;

        let mut bytes_downloaded: u64 = 0;
        let mut stream = response.body;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::StreamFailed {
                url: url.to_string(),
                source: e,
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::FileWriteFailed {
                    path: partial.to_path_buf(),
                    source: e,
                })?;

            bytes_downloaded += chunk.len() as u64;

            reporter.report(ProgressEvent::DownloadProgress {
                show_title: show_title.to_string(),
                bytes_downloaded,
                total_bytes: response.content_length,
            });
        }

        file.flush()
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: partial.to_path_buf(),
                source: e,
            })?;

        Ok(bytes_downloaded)
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}
