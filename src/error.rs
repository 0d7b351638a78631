use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the show catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog request failed for {url}: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Catalog returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to decode catalog response from {url}: {source}")]
    DecodeFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Show {0} does not exist in the catalog")]
    UnknownShow(u32),
}

/// Errors that can occur while caching episode audio
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors signalled by the playlist store.
///
/// Persistence I/O is deliberately absent here: load/save failures are
/// swallowed and the in-memory store stays authoritative for the session.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("A playlist named '{0}' already exists")]
    DuplicateName(String),

    #[error("No playlist with id {0}")]
    UnknownPlaylist(uuid::Uuid),
}

/// Errors inside the playback controller. These never escape to callers of
/// the controller; they are translated into user-facing status text at the
/// transition boundary.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Failed to open audio file {path}: {source}")]
    FileOpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio backend failed: {0}")]
    Backend(String),

    #[error(transparent)]
    Download(#[from] DownloadError),
}
