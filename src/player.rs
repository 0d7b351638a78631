// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cache::AudioCache;
use crate::catalog::{AssumeOnline, CatalogClient, ConnectivityProbe};
use crate::error::PlayerError;
use crate::http::HttpTransport;
use crate::playlist::PlayList;
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::show::Show;

/// Seconds skipped by a seek-forward or seek-backward
const SEEK_STEP: f64 = 10.0;

/// Progress tick interval while playing
const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle state of the single audio session.
///
/// Downloading is not a state of its own; it is a sub-phase of the
/// transition into `Playing`, surfaced as status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaState {
    Stopped,
    Playing,
    Paused,
}

/// Handle to one live player instance inside the media engine.
///
/// `stop` must be idempotent; `seek` takes an absolute position in seconds.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn stop(&self);
    fn seek(&self, seconds: f64);
    /// Current position in seconds
    fn position(&self) -> f64;
    /// Total duration in seconds; may be 0 before the engine knows it
    fn duration(&self) -> f64;
    /// Resolves when playback reaches the end of the file
    async fn wait_until_ended(&self);
}

/// The media engine. An external collaborator: the crate ships only this
/// seam, not an engine.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn open(&self, file: std::fs::File) -> Result<Arc<dyn AudioPlayer>, PlayerError>;
}

/// Resources owned by one live playback session. All of them are torn down
/// together by `cleanup`, never piecemeal.
struct Session {
    player: Arc<dyn AudioPlayer>,
    ticker: JoinHandle<()>,
    watcher: JoinHandle<()>,
    /// Open while Playing; closed during Paused so progress ticks only run
    /// while actually playing
    ticking: Arc<AtomicBool>,
}

/// The playback/playlist state machine.
///
/// Owns the zero-or-one live audio session and the playlist-sequencing
/// fields, and coordinates the audio cache, the catalog and the media
/// engine. Failures never escape as errors; they become status text and
/// the state falls back to `Stopped`.
///
/// All methods take `&mut self`; callers serialize access (a session lock
/// or a single owning task). Playback-completion events arrive on the
/// channel returned by [`PlaybackController::new`] and must be answered by
/// calling [`PlaybackController::handle_playback_ended`], which keeps
/// cleanup-then-decide atomic with respect to every other transition.
pub struct PlaybackController {
    catalog: Arc<dyn CatalogClient>,
    transport: Arc<dyn HttpTransport>,
    cache: AudioCache,
    backend: Arc<dyn AudioBackend>,
    connectivity: Arc<dyn ConnectivityProbe>,
    reporter: SharedProgressReporter,

    state: MediaState,
    status: String,
    current_show: Option<Show>,
    session: Option<Session>,

    /// True while sequencing through a playlist
    playing_playlist: bool,
    /// 1-based position of the current show; 0 is the sentinel for
    /// "no playlist session / finished"
    playlist_index: usize,
    playlist_count: usize,
    queue: Vec<Show>,

    ended_tx: mpsc::Sender<()>,
}

impl PlaybackController {
    /// Create a controller plus the receiver for playback-completion
    /// events. The driver owns the receiver and must call
    /// `handle_playback_ended` for every event it yields.
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        transport: Arc<dyn HttpTransport>,
        cache: AudioCache,
        backend: Arc<dyn AudioBackend>,
        reporter: SharedProgressReporter,
    ) -> (Self, mpsc::Receiver<()>) {
        let (ended_tx, ended_rx) = mpsc::channel(8);
        let controller = Self {
            catalog,
            transport,
            cache,
            backend,
            connectivity: Arc::new(AssumeOnline),
            reporter,
            state: MediaState::Stopped,
            status: String::new(),
            current_show: None,
            session: None,
            playing_playlist: false,
            playlist_index: 0,
            playlist_count: 0,
            queue: Vec::new(),
            ended_tx,
        };
        (controller, ended_rx)
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityProbe>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    /// Last user-facing status text ("Downloading...", "Playing", errors)
    pub fn status_message(&self) -> &str {
        &self.status
    }

    pub fn current_show(&self) -> Option<&Show> {
        self.current_show.as_ref()
    }

    pub fn is_playing_playlist(&self) -> bool {
        self.playing_playlist
    }

    /// (1-based current position, total) while sequencing; position 0 means
    /// no playlist session
    pub fn playlist_position(&self) -> (usize, usize) {
        (self.playlist_index, self.playlist_count)
    }

    /// Whether a show's audio is already in the local cache
    pub fn is_downloaded(&self, show: &Show) -> bool {
        show.mp3_url
            .as_deref()
            .is_some_and(|url| self.cache.is_cached(url))
    }

    /// Load a show (with details) as the current show. Tears down any
    /// running session first. Returns false when the catalog fetch failed;
    /// the failure itself is reported as status text.
    pub async fn load_show(&mut self, show_number: u32) -> bool {
        self.cleanup();
        match self.catalog.get_show_with_details(show_number).await {
            Ok(show) => {
                self.current_show = Some(show);
                true
            }
            Err(_) => {
                self.set_status("An error occurred. Please try again later.");
                false
            }
        }
    }

    /// Play the current show.
    ///
    /// From `Paused` this resumes the existing player in place. Otherwise a
    /// fresh session is built: prior session torn down, audio downloaded to
    /// the cache if absent (the transition blocks until the whole file is
    /// on disk), file opened, player created, progress ticker and
    /// completion watcher started.
    pub async fn play(&mut self) {
        if self.state == MediaState::Paused
            && let Some(session) = &self.session
        {
            session.player.play();
            session.ticking.store(true, Ordering::Release);
            self.set_state(MediaState::Playing);
            return;
        }

        let Some(show) = self.current_show.clone() else {
            self.set_status("No episode is loaded");
            return;
        };
        let Some(url) = show.mp3_url.clone().filter(|u| !u.is_empty()) else {
            self.set_status("This episode has no audio file");
            return;
        };

        self.cleanup();

        if !self.connectivity.is_online() && !self.cache.is_cached(&url) {
            self.set_status("You are offline");
            return;
        }

        self.set_status("Downloading...");
        match self.start_session(&show, &url).await {
            Ok(()) => self.set_state(MediaState::Playing),
            Err(_) => {
                self.cleanup();
                self.set_status("An error occurred. Please try again later.");
            }
        }
    }

    async fn start_session(&mut self, show: &Show, url: &str) -> Result<(), PlayerError> {
        let path = self
            .cache
            .ensure_cached(self.transport.as_ref(), url, &show.title, &self.reporter)
            .await?;

        let file = std::fs::File::open(&path).map_err(|e| PlayerError::FileOpenFailed {
            path: path.clone(),
            source: e,
        })?;

        let player = self.backend.open(file).await?;

        let watcher = {
            let player = player.clone();
            let ended_tx = self.ended_tx.clone();
            tokio::spawn(async move {
                player.wait_until_ended().await;
                let _ = ended_tx.send(()).await;
            })
        };

        let ticking = Arc::new(AtomicBool::new(true));
        let ticker = {
            let player = player.clone();
            let reporter = self.reporter.clone();
            let ticking = ticking.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(TICK_INTERVAL);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    if !ticking.load(Ordering::Acquire) {
                        continue;
                    }
                    let duration = player.duration();
                    if duration <= 0.0 {
                        continue;
                    }
                    let position = player.position();
                    reporter.report(ProgressEvent::PlaybackProgress {
                        percentage: (position * 100.0) / duration,
                        position: format_position(position, duration),
                    });
                }
            })
        };

        player.play();
        self.session = Some(Session {
            player,
            ticker,
            watcher,
            ticking,
        });
        Ok(())
    }

    /// Pause. Only valid from `Playing`.
    pub fn pause(&mut self) {
        if self.state != MediaState::Playing {
            return;
        }
        if let Some(session) = &self.session {
            session.player.pause();
            session.ticking.store(false, Ordering::Release);
            self.set_state(MediaState::Paused);
        }
    }

    /// Stop. Only valid from `Playing`. Clears playlist sequencing and
    /// tears the session down.
    pub fn stop(&mut self) {
        if self.state != MediaState::Playing {
            return;
        }
        self.playing_playlist = false;
        if let Some(session) = &self.session {
            session.player.stop();
        }
        self.cleanup();
    }

    /// Skip forward ten seconds; seeking past the end stops instead
    pub fn seek_forward(&mut self) {
        if self.state != MediaState::Playing {
            return;
        }
        let Some(session) = &self.session else { return };
        let target = session.player.position() + SEEK_STEP;
        if target < session.player.duration() {
            session.player.seek(target);
        } else {
            self.stop();
        }
    }

    /// Skip back ten seconds, clamped to the beginning
    pub fn seek_backward(&mut self) {
        if self.state != MediaState::Playing {
            return;
        }
        if let Some(session) = &self.session {
            let target = (session.player.position() - SEEK_STEP).max(0.0);
            session.player.seek(target);
        }
    }

    /// Jump to three seconds before the end, letting playback (and playlist
    /// sequencing) complete almost immediately
    pub fn skip_to_end(&mut self) {
        if self.state != MediaState::Playing {
            return;
        }
        if let Some(session) = &self.session {
            let target = (session.player.duration() - 3.0).max(0.0);
            session.player.seek(target);
        }
    }

    /// Start sequencing through a playlist from its first show.
    /// An empty playlist is a no-op.
    pub async fn play_playlist(&mut self, playlist: &PlayList) {
        if playlist.shows.is_empty() {
            return;
        }
        self.playing_playlist = true;
        self.queue = playlist.shows.clone();
        self.playlist_count = self.queue.len();

        let first = self.queue[0].show_number;
        if self.load_show(first).await {
            self.playlist_index = 1;
            self.reporter.report(ProgressEvent::PlaylistAdvanced {
                index: 1,
                count: self.playlist_count,
            });
            self.play().await;
        } else {
            self.playing_playlist = false;
            self.playlist_index = 0;
        }
    }

    /// React to the media engine reporting end-of-file.
    ///
    /// Cleanup always runs first, so no resources of the finished session
    /// can overlap the next one. While sequencing a playlist this advances
    /// to the next show and plays it; after the playlist's last show the
    /// index resets to the 0 sentinel and `PlaylistFinished` tells the UI
    /// to leave the player view.
    pub async fn handle_playback_ended(&mut self) {
        self.cleanup();

        if !self.playing_playlist {
            return;
        }

        let current_number = self.current_show.as_ref().map(|s| s.show_number);
        let last_number = self.queue.last().map(|s| s.show_number);
        if current_number == last_number {
            self.playlist_index = 0;
            self.playing_playlist = false;
            self.reporter.report(ProgressEvent::PlaylistFinished);
            return;
        }

        // playlist_index is the 1-based position of the show that just
        // finished, which makes it the 0-based offset of the next one
        let Some(next) = self.queue.get(self.playlist_index).cloned() else {
            self.playlist_index = 0;
            self.playing_playlist = false;
            self.reporter.report(ProgressEvent::PlaylistFinished);
            return;
        };

        if self.load_show(next.show_number).await {
            // load_show tore the old session down; sequencing survives it
            self.playing_playlist = true;
            self.playlist_index += 1;
            self.reporter.report(ProgressEvent::PlaylistAdvanced {
                index: self.playlist_index,
                count: self.playlist_count,
            });
            self.play().await;
        } else {
            self.playing_playlist = false;
            self.playlist_index = 0;
        }
    }

    /// Prefetch every not-yet-cached show of a playlist into the audio
    /// cache, reporting n-of-m progress. Individual failures are reported
    /// and skipped. Returns the number of shows newly downloaded.
    pub async fn download_playlist(&mut self, playlist: &PlayList) -> usize {
        if !self.connectivity.is_online() {
            self.set_status("You are offline");
            return 0;
        }

        let pending: Vec<Show> = playlist
            .shows
            .iter()
            .filter(|s| s.has_audio() && !self.is_downloaded(s))
            .cloned()
            .collect();

        let total = pending.len();
        let mut downloaded = 0;
        for (i, show) in pending.iter().enumerate() {
            self.reporter.report(ProgressEvent::PrefetchProgress {
                index: i + 1,
                total,
            });
            // fetch details too, so the episode is browsable offline
            let show = match self.catalog.get_show_with_details(show.show_number).await {
                Ok(detailed) => detailed,
                Err(_) => show.clone(),
            };
            let Some(url) = show.mp3_url.as_deref() else {
                continue;
            };
            if self
                .cache
                .ensure_cached(self.transport.as_ref(), url, &show.title, &self.reporter)
                .await
                .is_ok()
            {
                downloaded += 1;
            }
        }
        downloaded
    }

    /// Tear down the live session: stop the progress ticker and the
    /// completion watcher, stop and release the player. Idempotent and safe
    /// to call with no session; always leaves the state `Stopped`.
    pub fn cleanup(&mut self) {
        if let Some(session) = self.session.take() {
            session.ticker.abort();
            session.watcher.abort();
            session.player.stop();
        }
        self.set_state(MediaState::Stopped);
    }

    fn set_state(&mut self, state: MediaState) {
        self.state = state;
        self.reporter
            .report(ProgressEvent::PlaybackStateChanged { state });
        match state {
            MediaState::Playing => self.set_status("Playing"),
            MediaState::Paused => self.set_status("Paused"),
            MediaState::Stopped => {
                self.status.clear();
                self.reporter.report(ProgressEvent::PlaybackProgress {
                    percentage: 0.0,
                    position: String::new(),
                });
            }
        }
    }

    fn set_status(&mut self, text: &str) {
        self.status = text.to_string();
        self.reporter.report(ProgressEvent::StatusMessage {
            text: text.to_string(),
        });
    }
}

/// "mm:ss / mm:ss" from positions in seconds
fn format_position(current: f64, total: f64) -> String {
    format!("{} / {}", format_seconds(current), format_seconds(total))
}

fn format_seconds(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
