use std::sync::Arc;

use crate::player::MediaState;

/// Events emitted by the core for UIs to observe.
///
/// Change notification happens at defined transition points only, never on
/// incidental field writes; consumers subscribe through a reporter instead
/// of polling controller state.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// An audio download is starting
    DownloadStarting {
        show_title: String,
        url: String,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Audio download progress update
    DownloadProgress {
        show_title: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// An audio download completed and was placed in the cache
    DownloadCompleted {
        show_title: String,
        bytes_downloaded: u64,
    },

    /// An audio download failed
    DownloadFailed { show_title: String, error: String },

    /// Playlist prefetch progress ("downloading n of m")
    PrefetchProgress { index: usize, total: usize },

    /// The playback state machine transitioned
    PlaybackStateChanged { state: MediaState },

    /// Periodic playback progress tick (only emitted while playing)
    PlaybackProgress {
        /// 0..=100
        percentage: f64,
        /// "mm:ss / mm:ss"
        position: String,
    },

    /// Playlist sequencing advanced to the next show
    PlaylistAdvanced { index: usize, count: usize },

    /// The last show of the playlist finished; the UI should leave the
    /// player view
    PlaylistFinished,

    /// User-facing status text ("Downloading...", error notices, ...)
    StatusMessage { text: String },
}

/// Trait for observing core events.
///
/// Implementations can drive progress bars, log, or collect statistics.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
