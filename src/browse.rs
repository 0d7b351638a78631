use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::error::CatalogError;
use crate::playlist::PlayList;
use crate::show::Show;

/// Default number of shows fetched per "load more" request
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Saved browsing state, swapped out while the playlist-only view is active
#[derive(Debug, Clone)]
struct BrowseSnapshot {
    shows: Vec<Show>,
    last_show_number: u32,
    filter: String,
    no_more_in_set: bool,
}

/// Paginated, deduplicated view over the show catalog.
///
/// Two modes share one cursor model: unfiltered paging walks the complete
/// show-number list downwards from the newest show, filtered paging defers
/// to the catalog's search endpoint with an offset. Switching the filter
/// resets everything and starts from scratch.
pub struct ShowBrowser {
    catalog: Arc<dyn CatalogClient>,
    page_size: usize,
    filter: String,
    shows: Vec<Show>,
    /// Complete ordered list of show numbers, fetched once per session
    show_numbers: Vec<u32>,
    /// Exclusive upper bound of the next unfiltered batch
    last_show_number: u32,
    no_more_in_set: bool,
    snapshot: Option<BrowseSnapshot>,
}

impl ShowBrowser {
    pub fn new(catalog: Arc<dyn CatalogClient>) -> Self {
        Self::with_page_size(catalog, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(catalog: Arc<dyn CatalogClient>, page_size: usize) -> Self {
        Self {
            catalog,
            page_size,
            filter: String::new(),
            shows: Vec::new(),
            show_numbers: Vec::new(),
            last_show_number: 0,
            no_more_in_set: false,
            snapshot: None,
        }
    }

    /// All shows accumulated so far, in delivery order
    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn no_more_in_set(&self) -> bool {
        self.no_more_in_set
    }

    pub fn is_playlist_only(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Change the episode filter. Returns false (and does nothing) when the
    /// value is unchanged; otherwise drops all paging state, including the
    /// playlist-only view, so the next `next_batch` starts from scratch.
    pub fn set_filter(&mut self, text: &str) -> bool {
        if self.filter == text {
            return false;
        }
        self.snapshot = None;
        self.filter = text.to_string();
        self.shows.clear();
        self.show_numbers.clear();
        self.last_show_number = 0;
        self.no_more_in_set = false;
        true
    }

    /// Clear everything, filter included
    pub fn reset(&mut self) {
        self.snapshot = None;
        self.filter.clear();
        self.shows.clear();
        self.show_numbers.clear();
        self.last_show_number = 0;
        self.no_more_in_set = false;
    }

    /// Fetch and append the next batch of up to `page_size` shows.
    /// Returns the newly appended shows; an empty batch means the set is
    /// exhausted. A no-op while the playlist-only view is active.
    pub async fn next_batch(&mut self) -> Result<Vec<Show>, CatalogError> {
        if self.snapshot.is_some() {
            return Ok(Vec::new());
        }
        if self.filter.is_empty() {
            self.next_unfiltered_batch().await
        } else {
            self.next_filtered_batch().await
        }
    }

    async fn next_unfiltered_batch(&mut self) -> Result<Vec<Show>, CatalogError> {
        if self.show_numbers.is_empty() {
            self.show_numbers = self.catalog.get_show_numbers().await?;
            if self.show_numbers.is_empty() {
                self.no_more_in_set = true;
                return Ok(Vec::new());
            }
            // cursor starts just past the newest show
            let max = self.show_numbers.iter().copied().max().unwrap_or(0);
            self.last_show_number = max + 1;
        }

        let floor = self.last_show_number.saturating_sub(self.page_size as u32);
        let indexes: Vec<u32> = self
            .show_numbers
            .iter()
            .copied()
            .filter(|n| *n < self.last_show_number && *n >= floor)
            .collect();

        let batch = self.catalog.get_by_show_numbers(&indexes).await?;

        if batch.len() < self.page_size {
            self.no_more_in_set = true;
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        // the cursor only ever moves down: next window excludes everything
        // delivered so far
        if let Some(min) = batch.iter().map(|s| s.show_number).min() {
            self.last_show_number = min;
        }
        self.shows.extend(batch.iter().cloned());
        Ok(batch)
    }

    async fn next_filtered_batch(&mut self) -> Result<Vec<Show>, CatalogError> {
        let batch = self
            .catalog
            .get_filtered_shows(&self.filter, self.shows.len(), self.page_size)
            .await?;

        if batch.is_empty() {
            self.no_more_in_set = true;
            return Ok(Vec::new());
        }

        self.shows.extend(batch.iter().cloned());

        let total = self.catalog.get_count(&self.filter).await?;
        self.no_more_in_set = self.shows.len() >= total;

        Ok(batch)
    }

    /// Swap the browsing view for the playlist's shows, saving the current
    /// state as a struct copy. Idempotent when already showing a playlist.
    pub fn show_playlist_only(&mut self, playlist: &PlayList) {
        if self.snapshot.is_none() {
            self.snapshot = Some(BrowseSnapshot {
                shows: std::mem::take(&mut self.shows),
                last_show_number: self.last_show_number,
                filter: std::mem::take(&mut self.filter),
                no_more_in_set: self.no_more_in_set,
            });
        }
        self.shows = playlist.shows.clone();
        self.last_show_number = 0;
        // a playlist is a fixed set; there is nothing to page in
        self.no_more_in_set = true;
    }

    /// Restore the browsing state saved by `show_playlist_only`.
    /// A no-op when no snapshot is held.
    pub fn show_all(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.shows = snapshot.shows;
            self.last_show_number = snapshot.last_show_number;
            self.filter = snapshot.filter;
            self.no_more_in_set = snapshot.no_more_in_set;
        }
    }
}
