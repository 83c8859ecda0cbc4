//! In-memory, newest-first view of clipboard history backing the UI list.
//!
//! All mutations are synchronous and total-order-preserving with respect to
//! the caller's invocation order; the store is single-writer-at-a-time per
//! process, so no concurrent-mutation reconciliation exists here.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::clipboard::ClipboardEntry;

/// Partial update merged into an entry on move-to-top / update.
#[derive(Debug, Default, Clone)]
pub struct EntryPatch {
    pub updated_at: Option<DateTime<Utc>>,
    pub favorite: Option<bool>,
    pub content: Option<String>,
}

impl EntryPatch {
    pub fn touched_at(updated_at: DateTime<Utc>) -> Self {
        Self {
            updated_at: Some(updated_at),
            ..Default::default()
        }
    }

    fn apply(&self, entry: &mut ClipboardEntry) {
        if let Some(updated_at) = self.updated_at {
            entry.updated_at = updated_at;
        }
        if let Some(favorite) = self.favorite {
            entry.favorite = favorite;
        }
        if let Some(content) = &self.content {
            entry.content = content.clone();
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<ClipboardEntry>,
    selected: BTreeSet<i64>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a new entry. If the id is somehow already present (a re-sent
    /// confirmation), the old occurrence is removed first so ids stay unique.
    pub fn insert_top(&mut self, entry: ClipboardEntry) {
        self.entries.retain(|e| e.id != entry.id);
        self.entries.insert(0, entry);
    }

    /// Splice an existing entry out and re-prepend it with the patch merged
    /// in. An unknown id is a benign no-op: the entry may simply not be in
    /// the currently loaded page.
    pub fn move_to_top(&mut self, id: i64, patch: &EntryPatch) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let mut entry = self.entries.remove(pos);
        patch.apply(&mut entry);
        self.entries.insert(0, entry);
        true
    }

    /// In-place merge without reordering (favorite toggles and the like).
    pub fn update(&mut self, id: i64, patch: &EntryPatch) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                patch.apply(entry);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.selected.remove(&id);
        self.entries.len() != before
    }

    /// Bulk removal; also clears the ids from the pending multi-select set.
    pub fn remove_many(&mut self, ids: &[i64]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !ids.contains(&e.id));
        for id in ids {
            self.selected.remove(id);
        }
        before - self.entries.len()
    }

    pub fn select(&mut self, id: i64) {
        if self.entries.iter().any(|e| e.id == id) {
            self.selected.insert(id);
        }
    }

    pub fn deselect(&mut self, id: i64) {
        self.selected.remove(&id);
    }

    pub fn selected(&self) -> impl Iterator<Item = i64> + '_ {
        self.selected.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&ClipboardEntry> {
        self.entries.iter().find(|e| e.id == id)
    }
}
