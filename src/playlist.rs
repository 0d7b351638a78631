use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlaylistError;
use crate::show::Show;

/// A user-named ordered collection of show references.
///
/// `Clone` supports cancel-safe editing: clone a draft, mutate it freely,
/// then commit-by-replacement through [`PlaylistStore::commit`] — or drop
/// it to cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayList {
    pub id: Uuid,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub shows: Vec<Show>,
}

impl PlayList {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            date_created: Utc::now(),
            shows: Vec::new(),
        }
    }

    pub fn contains_show(&self, show_id: &str) -> bool {
        self.shows.iter().any(|s| s.id == show_id)
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// In-memory ordered collection of playlists with a selection, persisted as
/// one JSON document.
///
/// Persistence failures are non-fatal by design: the document is best-effort
/// and the in-memory state stays authoritative for the session.
pub struct PlaylistStore {
    playlists: Vec<PlayList>,
    selected: Option<Uuid>,
    path: PathBuf,
}

impl PlaylistStore {
    /// Create a store backed by `path`, loading the persisted document if
    /// one exists. An unreadable or corrupt document yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let playlists = Self::load(&path);
        Self {
            playlists,
            selected: None,
            path,
        }
    }

    fn load(path: &Path) -> Vec<PlayList> {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        serde_json::from_str(&json).unwrap_or_default()
    }

    /// Write the whole document. Failures are swallowed.
    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&self.playlists) {
            let _ = std::fs::write(&self.path, json);
        }
    }

    pub fn playlists(&self) -> &[PlayList] {
        &self.playlists
    }

    pub fn get(&self, id: Uuid) -> Option<&PlayList> {
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<&PlayList> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: Uuid) -> Result<(), PlaylistError> {
        if self.get(id).is_none() {
            return Err(PlaylistError::UnknownPlaylist(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Find a playlist by name, case-insensitive and trimmed
    pub fn find_by_name(&self, name: &str) -> Option<&PlayList> {
        self.playlists.iter().find(|p| names_match(&p.name, name))
    }

    /// Create a playlist, persist, and select it
    pub fn create(&mut self, name: &str) -> Result<Uuid, PlaylistError> {
        if self.find_by_name(name).is_some() {
            return Err(PlaylistError::DuplicateName(name.trim().to_string()));
        }
        let playlist = PlayList::new(name);
        let id = playlist.id;
        self.playlists.push(playlist);
        self.selected = Some(id);
        self.persist();
        Ok(id)
    }

    /// Rename a playlist. Renaming to its own current name (case-insensitive)
    /// is a no-op that does not persist; a collision with another playlist's
    /// name fails and leaves the store unchanged.
    pub fn rename(&mut self, id: Uuid, new_name: &str) -> Result<(), PlaylistError> {
        let index = self
            .playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or(PlaylistError::UnknownPlaylist(id))?;

        if names_match(&self.playlists[index].name, new_name) {
            return Ok(());
        }
        if self
            .playlists
            .iter()
            .any(|p| p.id != id && names_match(&p.name, new_name))
        {
            return Err(PlaylistError::DuplicateName(new_name.trim().to_string()));
        }

        self.playlists[index].name = new_name.trim().to_string();
        self.persist();
        Ok(())
    }

    /// Replace a playlist wholesale with an edited draft (index-stable).
    /// Validates name uniqueness the same way `rename` does.
    pub fn commit(&mut self, draft: PlayList) -> Result<(), PlaylistError> {
        let index = self
            .playlists
            .iter()
            .position(|p| p.id == draft.id)
            .ok_or(PlaylistError::UnknownPlaylist(draft.id))?;

        if self
            .playlists
            .iter()
            .any(|p| p.id != draft.id && names_match(&p.name, &draft.name))
        {
            return Err(PlaylistError::DuplicateName(draft.name.trim().to_string()));
        }

        self.playlists[index] = draft;
        self.persist();
        Ok(())
    }

    /// Delete a playlist and clear the selection. When exactly one playlist
    /// remains afterwards it becomes the selection.
    pub fn delete(&mut self, id: Uuid) -> Result<(), PlaylistError> {
        let index = self
            .playlists
            .iter()
            .position(|p| p.id == id)
            .ok_or(PlaylistError::UnknownPlaylist(id))?;

        self.playlists.remove(index);
        self.selected = None;
        if self.playlists.len() == 1 {
            self.selected = Some(self.playlists[0].id);
        }
        self.persist();
        Ok(())
    }

    /// Append a show to a playlist unconditionally
    pub fn add_show(&mut self, id: Uuid, show: Show) -> Result<(), PlaylistError> {
        let playlist = self.get_mut(id)?;
        playlist.shows.push(show);
        self.persist();
        Ok(())
    }

    /// Append every show not already present, matching by show id
    pub fn add_all(&mut self, id: Uuid, shows: &[Show]) -> Result<(), PlaylistError> {
        let playlist = self.get_mut(id)?;
        for show in shows {
            if !playlist.shows.iter().any(|s| s.id == show.id) {
                playlist.shows.push(show.clone());
            }
        }
        self.persist();
        Ok(())
    }

    /// Remove a show, matching by show identifier rather than position.
    /// Absent shows are a no-op and do not persist.
    pub fn remove_show(&mut self, id: Uuid, show_id: &str) -> Result<(), PlaylistError> {
        let playlist = self.get_mut(id)?;
        let before = playlist.shows.len();
        playlist.shows.retain(|s| s.id != show_id);
        if playlist.shows.len() != before {
            self.persist();
        }
        Ok(())
    }

    /// Remove every show in `shows` from the playlist
    pub fn remove_all(&mut self, id: Uuid, shows: &[Show]) -> Result<(), PlaylistError> {
        let playlist = self.get_mut(id)?;
        playlist
            .shows
            .retain(|s| !shows.iter().any(|r| r.id == s.id));
        self.persist();
        Ok(())
    }

    /// Move a show one position towards the front. Clamped: moving the
    /// first show up is a no-op.
    pub fn move_show_up(&mut self, id: Uuid, show_id: &str) -> Result<(), PlaylistError> {
        self.move_show(id, show_id, -1)
    }

    /// Move a show one position towards the back. Clamped: moving the last
    /// show down is a no-op.
    pub fn move_show_down(&mut self, id: Uuid, show_id: &str) -> Result<(), PlaylistError> {
        self.move_show(id, show_id, 1)
    }

    fn move_show(&mut self, id: Uuid, show_id: &str, delta: isize) -> Result<(), PlaylistError> {
        let playlist = self.get_mut(id)?;
        let Some(index) = playlist.shows.iter().position(|s| s.id == show_id) else {
            return Ok(());
        };
        let target = index as isize + delta;
        if target < 0 || target as usize >= playlist.shows.len() {
            return Ok(());
        }
        let show = playlist.shows.remove(index);
        playlist.shows.insert(target as usize, show);
        self.persist();
        Ok(())
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut PlayList, PlaylistError> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(PlaylistError::UnknownPlaylist(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_show(number: u32) -> Show {
        Show {
            id: format!("00000000-0000-0000-0000-{:012}", number),
            show_number: number,
            title: format!("Show {}", number),
            description: None,
            date_published: None,
            mp3_url: None,
            details: None,
        }
    }

    fn store() -> (tempfile::TempDir, PlaylistStore) {
        let dir = tempdir().unwrap();
        let store = PlaylistStore::open(dir.path().join("playlists.json"));
        (dir, store)
    }

    #[test]
    fn create_selects_and_persists() {
        let (dir, mut store) = store();
        let id = store.create("Favorites").unwrap();

        assert_eq!(store.selected().unwrap().id, id);
        assert!(dir.path().join("playlists.json").exists());

        // a fresh store sees the persisted document
        let reopened = PlaylistStore::open(dir.path().join("playlists.json"));
        assert_eq!(reopened.playlists().len(), 1);
        assert_eq!(reopened.playlists()[0].name, "Favorites");
    }

    #[test]
    fn create_rejects_case_insensitive_trimmed_duplicates() {
        let (_dir, mut store) = store();
        store.create("Favorites").unwrap();

        let err = store.create(" favorites ").unwrap_err();
        assert_eq!(err, PlaylistError::DuplicateName("favorites".to_string()));
        assert_eq!(store.playlists().len(), 1);
    }

    #[test]
    fn rename_to_own_name_is_a_no_op() {
        let (dir, mut store) = store();
        let id = store.create("Roadtrip").unwrap();
        std::fs::remove_file(dir.path().join("playlists.json")).unwrap();

        store.rename(id, "ROADTRIP").unwrap();

        assert_eq!(store.playlists()[0].name, "Roadtrip");
        // no persistence was triggered
        assert!(!dir.path().join("playlists.json").exists());
    }

    #[test]
    fn rename_rejects_collision_with_other_playlist() {
        let (_dir, mut store) = store();
        store.create("One").unwrap();
        let id = store.create("Two").unwrap();

        let err = store.rename(id, " one ").unwrap_err();
        assert_eq!(err, PlaylistError::DuplicateName("one".to_string()));
        assert_eq!(store.playlists()[1].name, "Two");
    }

    #[test]
    fn rename_is_index_stable() {
        let (_dir, mut store) = store();
        let a = store.create("A").unwrap();
        store.create("B").unwrap();

        store.rename(a, "Z").unwrap();
        assert_eq!(store.playlists()[0].name, "Z");
        assert_eq!(store.playlists()[0].id, a);
    }

    #[test]
    fn delete_clears_selection_and_auto_selects_last_remaining() {
        let (_dir, mut store) = store();
        let a = store.create("A").unwrap();
        let b = store.create("B").unwrap();

        store.delete(b).unwrap();
        // exactly one left: it gets selected
        assert_eq!(store.selected().unwrap().id, a);

        store.delete(a).unwrap();
        assert!(store.selected().is_none());
        assert!(store.playlists().is_empty());
    }

    #[test]
    fn reorder_clamps_at_both_ends() {
        let (_dir, mut store) = store();
        let id = store.create("Order").unwrap();
        for n in 1..=3 {
            store.add_show(id, make_show(n)).unwrap();
        }
        let first = make_show(1).id;
        let last = make_show(3).id;

        store.move_show_up(id, &first).unwrap();
        store.move_show_down(id, &last).unwrap();
        let numbers: Vec<u32> = store.get(id).unwrap().shows.iter().map(|s| s.show_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        store.move_show_up(id, &last).unwrap();
        let numbers: Vec<u32> = store.get(id).unwrap().shows.iter().map(|s| s.show_number).collect();
        assert_eq!(numbers, vec![1, 3, 2]);
    }

    #[test]
    fn remove_show_matches_by_identifier() {
        let (_dir, mut store) = store();
        let id = store.create("Mix").unwrap();
        store.add_show(id, make_show(10)).unwrap();
        store.add_show(id, make_show(11)).unwrap();

        // a different clone of the same show still matches
        let other_copy = make_show(10);
        store.remove_show(id, &other_copy.id).unwrap();

        let playlist = store.get(id).unwrap();
        assert_eq!(playlist.shows.len(), 1);
        assert_eq!(playlist.shows[0].show_number, 11);
    }

    #[test]
    fn add_all_dedupes_by_show_id() {
        let (_dir, mut store) = store();
        let id = store.create("Bulk").unwrap();
        store.add_show(id, make_show(1)).unwrap();

        store.add_all(id, &[make_show(1), make_show(2)]).unwrap();
        assert_eq!(store.get(id).unwrap().shows.len(), 2);
    }

    #[test]
    fn commit_replaces_draft_and_validates_name() {
        let (_dir, mut store) = store();
        store.create("Taken").unwrap();
        let id = store.create("Edit me").unwrap();

        let mut draft = store.get(id).unwrap().clone();
        draft.name = "Taken".to_string();
        assert!(matches!(
            store.commit(draft),
            Err(PlaylistError::DuplicateName(_))
        ));
        // original untouched
        assert_eq!(store.get(id).unwrap().name, "Edit me");

        let mut draft = store.get(id).unwrap().clone();
        draft.name = "Edited".to_string();
        draft.shows.push(make_show(5));
        store.commit(draft).unwrap();
        assert_eq!(store.get(id).unwrap().name, "Edited");
        assert_eq!(store.get(id).unwrap().shows.len(), 1);
    }

    #[test]
    fn corrupt_document_yields_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("playlists.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = PlaylistStore::open(&path);
        assert!(store.playlists().is_empty());
    }

    #[test]
    fn persistence_failure_is_swallowed() {
        // path whose parent cannot be created
        let mut store = PlaylistStore::open("/dev/null/nope/playlists.json");
        let id = store.create("Still works").unwrap();
        assert_eq!(store.selected().unwrap().id, id);
    }
}
