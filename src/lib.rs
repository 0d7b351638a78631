pub mod browse;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod http;
pub mod player;
pub mod playlist;
pub mod progress;
pub mod show;

// Re-export main types for convenience
pub use browse::{DEFAULT_PAGE_SIZE, ShowBrowser};
pub use cache::AudioCache;
pub use catalog::{AssumeOnline, CatalogClient, ConnectivityProbe, HttpCatalog};
pub use error::{CatalogError, DownloadError, PlayerError, PlaylistError};
pub use http::{HttpTransport, ReqwestTransport};
pub use player::{AudioBackend, AudioPlayer, MediaState, PlaybackController};
pub use playlist::{PlayList, PlaylistStore};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use show::{Show, ShowDetails};
